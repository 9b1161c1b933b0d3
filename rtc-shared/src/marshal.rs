//! Conversions between native text/byte buffers and Rust types.


use crate::error::{Error, Result};
use std::ffi::{c_char, CStr, CString};

/// CharBuffer is a zero-filled, fixed-capacity buffer handed to a native call
/// that writes a nul-terminated string into it.
#[derive(Debug, Clone)]
pub struct CharBuffer {
    buf: Vec<c_char>,
}

impl CharBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn as_mut_slice(&mut self) -> &mut [c_char] {
        &mut self.buf
    }

    pub fn as_mut_ptr(&mut self) -> *mut c_char {
        self.buf.as_mut_ptr()
    }

    /// into_string converts the buffer contents up to the first nul.
    ///
    /// A buffer without a nul inside its capacity was truncated by the writer
    /// and is reported as [`Error::ErrStringNotTerminated`]. Invalid UTF-8 is
    /// replaced rather than rejected.
    pub fn into_string(self) -> Result<String> {
        c_chars_to_string(&self.buf)
    }
}

/// c_chars_to_string decodes a nul-terminated native string stored in `buf`.
pub fn c_chars_to_string(buf: &[c_char]) -> Result<String> {
    let bytes: Vec<u8> = buf.iter().map(|&c| c as u8).collect();
    let cstr = CStr::from_bytes_until_nul(&bytes).map_err(|_| Error::ErrStringNotTerminated {
        capacity: buf.len(),
    })?;
    Ok(cstr.to_string_lossy().into_owned())
}

/// to_c_string converts `s` for a native call expecting a nul-terminated
/// string. Strings with interior nul bytes cannot cross the boundary intact.
pub fn to_c_string(s: &str) -> Result<CString> {
    Ok(CString::new(s)?)
}

/// c_string_to_string takes ownership of a string copied out of the native
/// engine.
pub fn c_string_to_string(s: CString) -> String {
    match s.into_string() {
        Ok(s) => s,
        Err(err) => err.into_cstring().to_string_lossy().into_owned(),
    }
}

/// checked_range returns `data[offset..offset + length]`, or an error when
/// the range does not fit inside `data`.
pub fn checked_range(data: &[u8], offset: usize, length: usize) -> Result<&[u8]> {
    offset
        .checked_add(length)
        .and_then(|end| data.get(offset..end))
        .ok_or(Error::ErrSendOutOfBounds {
            offset,
            length,
            size: data.len(),
        })
}
