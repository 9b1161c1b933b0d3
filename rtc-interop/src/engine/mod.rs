//! The native engine surface.
//!
//! Each trait mirrors one group of the engine's C entry points one-to-one.
//! Methods take raw handles and return the engine's own status values
//! unchanged; liveness checks, string conversion and error mapping happen in
//! the wrappers built on top of them.

#[cfg(test)]
pub(crate) mod mock;
#[cfg(feature = "native")]
mod native;

#[cfg(feature = "native")]
pub use native::NativeEngine;

use crate::bridge::{AudioTrackSinkFunctions, DataChannelObserverFunctions};
use shared::RawHandle;
use std::ffi::{c_char, c_void, CStr, CString};

/// Audio device module entry points.
///
/// Playout/recording control takes the worker thread the engine marshals
/// those calls onto. Those calls return nothing: failures are either absorbed
/// by the engine or reported later through its own notifications.
pub trait AudioDeviceApi: Send + Sync {
    /// Creates the platform default module bound to `thread`; `None` if the
    /// engine could not create one.
    fn create_default(&self, thread: RawHandle) -> Option<RawHandle>;

    /// Drops the binding's reference to the module.
    fn release(&self, adm: RawHandle);

    /// Number of playout devices, or a negative error.
    fn playout_devices(&self, adm: RawHandle) -> i16;

    /// Number of recording devices, or a negative error.
    fn recording_devices(&self, adm: RawHandle) -> i16;

    fn set_playout_device(&self, adm: RawHandle, index: u16) -> i32;

    fn set_recording_device(&self, adm: RawHandle, index: u16) -> i32;

    /// Fills `name` and `guid` with nul-terminated strings. Both slices are
    /// at least [`ADM_MAX_DEVICE_NAME_SIZE`](crate::audio_device::ADM_MAX_DEVICE_NAME_SIZE)
    /// and [`ADM_MAX_GUID_SIZE`](crate::audio_device::ADM_MAX_GUID_SIZE) long.
    fn playout_device_name(
        &self,
        adm: RawHandle,
        index: u16,
        name: &mut [c_char],
        guid: &mut [c_char],
    ) -> i32;

    /// Recording counterpart of [`AudioDeviceApi::playout_device_name`].
    fn recording_device_name(
        &self,
        adm: RawHandle,
        index: u16,
        name: &mut [c_char],
        guid: &mut [c_char],
    ) -> i32;

    fn init_playout(&self, adm: RawHandle, thread: RawHandle);
    fn start_playout(&self, adm: RawHandle, thread: RawHandle);
    fn stop_playout(&self, adm: RawHandle, thread: RawHandle);
    fn init_recording(&self, adm: RawHandle, thread: RawHandle);
    fn start_recording(&self, adm: RawHandle, thread: RawHandle);
    fn stop_recording(&self, adm: RawHandle, thread: RawHandle);

    fn set_speaker_volume(&self, adm: RawHandle, volume: f32);
}

/// Data channel entry points.
pub trait DataChannelApi: Send + Sync {
    /// Decrements the engine's reference count on the channel.
    fn release(&self, channel: RawHandle);

    /// Current label, copied out of the engine.
    fn label(&self, channel: RawHandle) -> Option<CString>;

    /// Engine-defined state code.
    fn status(&self, channel: RawHandle) -> i32;

    fn send_text(&self, channel: RawHandle, text: &CStr) -> bool;

    /// `data` is only valid for the duration of the call.
    fn send_data(&self, channel: RawHandle, data: &[u8]) -> bool;

    /// Installs `functions` as the channel's observer. The engine hands
    /// `context` back unchanged on every callback and calls
    /// `on_destruction` once it will make no further calls with it.
    /// Returns the engine's observer object, `None` on failure.
    fn register_observer(
        &self,
        channel: RawHandle,
        context: *mut c_void,
        functions: &'static DataChannelObserverFunctions,
    ) -> Option<RawHandle>;

    fn unregister_observer(&self, channel: RawHandle);
}

/// Media stream track entry points.
pub trait MediaStreamTrackApi: Send + Sync {
    fn release(&self, track: RawHandle);

    fn id(&self, track: RawHandle) -> Option<CString>;

    /// Kind string ("audio" or "video").
    fn kind(&self, track: RawHandle) -> Option<CString>;

    /// Wraps `context` and `functions` in a native audio sink and attaches it
    /// to the track. Returns the native sink, `None` if the track carries no
    /// audio.
    fn add_audio_sink(
        &self,
        track: RawHandle,
        context: *mut c_void,
        functions: &'static AudioTrackSinkFunctions,
    ) -> Option<RawHandle>;

    /// Detaches and deletes a sink returned by
    /// [`MediaStreamTrackApi::add_audio_sink`].
    fn remove_audio_sink(&self, track: RawHandle, sink: RawHandle);
}
