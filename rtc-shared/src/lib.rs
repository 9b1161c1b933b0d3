#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod error;
pub mod handle;
pub mod marshal;

pub use handle::{HandleCell, RawHandle};
