//! # RTC Interop - Safe bindings over a native RTC engine
//!
//! This crate wraps the audio-device, data-channel and media-track objects of
//! a native real-time communication engine. It does no media processing or
//! networking of its own: every operation is forwarded to the engine, and the
//! crate's job is to make crossing that boundary safe.
//!
//! - **Handles**: every native object is held in a [`HandleCell`](shared::HandleCell).
//!   Calls check liveness under a shared lock; release is exclusive, idempotent,
//!   and waits for in-flight calls. Dropping a wrapper releases it.
//! - **Marshaling**: fixed-capacity name buffers are decoded once per call and
//!   truncation is detected; byte slices are borrowed for exactly one native call.
//! - **Callbacks**: observers are kept alive in a registry keyed by a token. The
//!   token is the only thing the engine sees, so a late or stray callback can
//!   never reach a freed observer. Audio sinks attached to a track are held
//!   the same way and fed through their own function table.
//!
//! The engine surface is expressed as the [`engine::AudioDeviceApi`],
//! [`engine::DataChannelApi`] and [`engine::MediaStreamTrackApi`] traits. With
//! the `native` feature enabled, [`engine::NativeEngine`] implements them by
//! calling the engine's C shim.
//!
//! ## Data channel observer
//!
//! ```no_run
//! use rtc_interop::data_channel::{DataChannel, DataChannelMessage, DataChannelObserver};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl DataChannelObserver for Printer {
//!     fn on_state_change(&self) {
//!         println!("state changed");
//!     }
//!
//!     fn on_message(&self, message: DataChannelMessage) {
//!         println!("{} bytes (string: {})", message.data.len(), message.is_string);
//!     }
//! }
//!
//! # fn example(dc: DataChannel) -> rtc_interop::shared::error::Result<()> {
//! let token = dc.register_observer(Arc::new(Printer))?;
//! println!("registered as {token:?}, state {}", dc.ready_state()?);
//!
//! dc.send_text("hello")?;
//! dc.send_range(b"..payload..", 2, 7)?;
//!
//! dc.unregister_observer()?;
//! dc.release();
//! # Ok(())
//! # }
//! ```
//!
//! ## Audio devices
//!
//! ```no_run
//! use rtc_interop::audio_device::{AudioDeviceModule, WorkerThread};
//! use rtc_interop::configuration::InteropConfiguration;
//! use rtc_interop::engine::AudioDeviceApi;
//! use std::sync::Arc;
//!
//! # fn example(api: Arc<dyn AudioDeviceApi>, thread: WorkerThread)
//! #     -> rtc_interop::shared::error::Result<()> {
//! let adm = AudioDeviceModule::create_default(api, thread, &InteropConfiguration::default())?;
//!
//! for index in 0..adm.playout_devices()? {
//!     println!("{}", adm.playout_device_name(index)?);
//! }
//!
//! adm.set_playout_device(0)?;
//! adm.init_playout()?;
//! adm.start_playout()?;
//! adm.set_speaker_volume(0.5)?;
//! # Ok(())
//! # }
//! ```

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

#[macro_use]
extern crate lazy_static;

pub use shared;

pub mod audio_device;
pub mod bridge;
pub mod configuration;
pub mod data_channel;
pub mod engine;
pub mod media_stream;
