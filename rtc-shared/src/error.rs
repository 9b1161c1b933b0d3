#![allow(dead_code)]

use std::ffi::NulError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    //Handle errors
    #[error("{0}: native handle already released")]
    ErrHandleReleased(&'static str),

    //Native engine errors
    #[error("native call returned status {0}")]
    ErrNativeStatus(i32),
    #[error("native engine returned no string")]
    ErrNativeStringMissing,
    #[error("native string buffer of {capacity} code units is not nul-terminated")]
    ErrStringNotTerminated { capacity: usize },

    //Audio device errors
    #[error("failed to create audio device module")]
    ErrCreateAudioDeviceModule,
    #[error("device name buffer of {capacity} code units is not nul-terminated")]
    ErrDeviceNameTruncated { capacity: usize },

    //Data channel errors
    #[error("data channel: send failed")]
    ErrDataChannelSendFailed,
    #[error("data channel: range {offset}+{length} exceeds buffer of {size} bytes")]
    ErrSendOutOfBounds {
        offset: usize,
        length: usize,
        size: usize,
    },

    //Observer errors
    #[error("observer: already registered")]
    ErrObserverAlreadyRegistered,
    #[error("observer: unregistration in progress")]
    ErrObserverUnregistering,
    #[error("observer: not registered")]
    ErrObserverNotRegistered,
    #[error("observer: native registration failed")]
    ErrObserverRegistrationFailed,

    //Audio sink errors
    #[error("audio sink: track rejected the sink")]
    ErrAudioSinkRejected,
    #[error("audio sink: not attached to this track")]
    ErrAudioSinkNotAttached,
    #[error("audio sink: capacity must be greater than zero")]
    ErrAudioSinkZeroCapacity,
    #[error("audio sink: cannot advance {requested} bytes, {available} available")]
    ErrAudioSinkAdvance { requested: usize, available: usize },

    //Third Party Error
    #[error("nul byte in string: {0}")]
    Nul(#[from] NulError),
    #[error("mutex poison: {0}")]
    PoisonError(String),

    #[error("{0}")]
    Other(String),
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Error::PoisonError(e.to_string())
    }
}

/// status_to_result maps a native status code onto Ok for zero/non-negative
/// values and ErrNativeStatus otherwise.
pub fn status_to_result(status: i32) -> Result<i32> {
    if status < 0 {
        Err(Error::ErrNativeStatus(status))
    } else {
        Ok(status)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_to_result() {
        assert_eq!(status_to_result(0), Ok(0));
        assert_eq!(status_to_result(3), Ok(3));
        assert_eq!(status_to_result(-1), Err(Error::ErrNativeStatus(-1)));
    }
}
