//! Callback bridge from the native engine to Rust observers.
//!
//! The engine receives [`DATA_CHANNEL_OBSERVER_FUNCTIONS`] plus a context
//! pointer that is really an [`ObserverToken`]. Each entry point resolves the
//! token through the [`ObserverRegistry`] and forwards the call. Tokens that no
//! longer resolve are dropped with a warning. Panics from observer code are
//! contained here and never unwind into native frames.
//!
//! Removing a registration does not wait for dispatches already running on
//! it. The last of them to return delivers `on_observer_destroyed`, so that
//! callback is always the final one an observer sees.


pub mod registry;

pub use registry::{
    audio_sink_registry, observer_registry, AudioSinkRegistry, ObserverRegistry, ObserverToken,
};

use registry::Registration;

use crate::data_channel::message::DataChannelMessage;
use crate::data_channel::observer::DataChannelObserver;
use crate::media_stream::{AudioData, AudioFormat};
use bytes::Bytes;
use std::ffi::{c_int, c_void};
use std::panic::{self, AssertUnwindSafe};

/// Function table installed on a native data channel. Layout matches the
/// engine's `WebrtcDataChannelObserverFunctions`.
#[repr(C)]
pub struct DataChannelObserverFunctions {
    pub on_destruction: unsafe extern "C" fn(context: *mut c_void),
    pub on_state_change: unsafe extern "C" fn(context: *mut c_void),
    pub on_message:
        unsafe extern "C" fn(context: *mut c_void, binary: bool, data: *const u8, len: c_int),
    pub on_buffered_amount_change: unsafe extern "C" fn(context: *mut c_void, sent_data_size: u64),
}

pub static DATA_CHANNEL_OBSERVER_FUNCTIONS: DataChannelObserverFunctions =
    DataChannelObserverFunctions {
        on_destruction: observer_destroyed,
        on_state_change: state_change,
        on_message: message,
        on_buffered_amount_change: buffered_amount_change,
    };

/// Function table for a native audio sink that forwards to Rust. The engine
/// calls `on_data` with every chunk of the track's decoded audio, with the
/// arguments of its own `AudioTrackSinkInterface::OnData`.
#[repr(C)]
pub struct AudioTrackSinkFunctions {
    pub on_data: unsafe extern "C" fn(
        context: *mut c_void,
        audio_data: *const c_void,
        bits_per_sample: c_int,
        sample_rate: c_int,
        number_of_channels: usize,
        number_of_frames: usize,
    ),
}

pub static AUDIO_TRACK_SINK_FUNCTIONS: AudioTrackSinkFunctions = AudioTrackSinkFunctions {
    on_data: audio_data,
};

fn guard(callback: &'static str, f: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        log::error!("{callback}: observer panicked, panic stopped at the native boundary");
    }
}

fn dispatch(
    context: *mut c_void,
    callback: &'static str,
    f: impl FnOnce(&dyn DataChannelObserver),
) {
    guard(callback, || {
        let Some(token) = ObserverToken::from_context(context) else {
            log::warn!("{callback}: null observer context");
            return;
        };
        let Some(registration) = observer_registry().acquire(token) else {
            log::warn!("{callback}: no observer registered for {token:?}");
            return;
        };
        log::trace!("{callback}: dispatching to {token:?}");
        guard(callback, || f(registration.observer.as_ref()));
        if registration.exit() {
            log::debug!("{callback}: {token:?} destroyed after its last dispatch");
            deliver_destroyed(&registration);
        }
    });
}

fn deliver_destroyed(registration: &Registration) {
    guard("on_observer_destroyed", || {
        registration.observer.on_observer_destroyed()
    });
}

/// retire finishes a registration just removed from the registry. The slot
/// is freed at once. `on_observer_destroyed` is delivered here, or by the
/// last dispatch still running on it.
pub(crate) fn retire(token: ObserverToken, registration: &Registration) {
    if let Some(slot) = registration.slot.upgrade() {
        slot.complete_unregister(token);
    }
    if registration.retire() {
        log::debug!("{token:?} destroyed");
        deliver_destroyed(registration);
    } else {
        log::debug!("{token:?} removed, destruction waits for running callbacks");
    }
}

extern "C" fn observer_destroyed(context: *mut c_void) {
    guard("on_destruction", || {
        let Some(token) = ObserverToken::from_context(context) else {
            log::warn!("on_destruction: null observer context");
            return;
        };
        match observer_registry().remove(token) {
            Some(registration) => retire(token, &registration),
            None => log::warn!("on_destruction: no observer registered for {token:?}"),
        }
    });
}

extern "C" fn state_change(context: *mut c_void) {
    dispatch(context, "on_state_change", |observer| {
        observer.on_state_change()
    });
}

/// # Safety
///
/// `data` must be null or valid for reads of `len` bytes for the duration of
/// the call.
unsafe extern "C" fn message(context: *mut c_void, binary: bool, data: *const u8, len: c_int) {
    dispatch(context, "on_message", |observer| {
        let data = if data.is_null() || len <= 0 {
            Bytes::new()
        } else {
            // the engine reclaims the buffer once this call returns
            Bytes::copy_from_slice(unsafe { std::slice::from_raw_parts(data, len as usize) })
        };
        observer.on_message(DataChannelMessage {
            is_string: !binary,
            data,
        });
    });
}

extern "C" fn buffered_amount_change(context: *mut c_void, sent_data_size: u64) {
    dispatch(context, "on_buffered_amount_change", |observer| {
        observer.on_buffered_amount_change(sent_data_size)
    });
}

/// # Safety
///
/// `audio_data` must be null or valid for reads of the number of bytes its
/// header describes, for the duration of the call.
unsafe extern "C" fn audio_data(
    context: *mut c_void,
    audio_data: *const c_void,
    bits_per_sample: c_int,
    sample_rate: c_int,
    number_of_channels: usize,
    number_of_frames: usize,
) {
    guard("on_data", || {
        let Some(token) = ObserverToken::from_context(context) else {
            log::warn!("on_data: null sink context");
            return;
        };
        let Some(sink) = audio_sink_registry().resolve(token) else {
            log::warn!("on_data: no audio sink attached for {token:?}");
            return;
        };

        let header = AudioData {
            samples: &[],
            format: AudioFormat {
                bits_per_sample,
                sample_rate,
                number_of_channels,
            },
            number_of_frames,
        };
        // a header that does not describe a readable buffer reaches the sink
        // with no samples, for it to reject
        let samples: &[u8] = match header.byte_len() {
            Some(len) if !audio_data.is_null() && len <= isize::MAX as usize => unsafe {
                std::slice::from_raw_parts(audio_data as *const u8, len)
            },
            _ => &[],
        };
        sink.on_data(&AudioData { samples, ..header });
    });
}
