//! Bindings to the engine's C shim.

use super::{AudioDeviceApi, DataChannelApi, MediaStreamTrackApi};
use crate::audio_device::{ADM_MAX_DEVICE_NAME_SIZE, ADM_MAX_GUID_SIZE};
use crate::bridge::{AudioTrackSinkFunctions, DataChannelObserverFunctions};
use shared::RawHandle;
use std::ffi::{c_char, c_int, c_void, CStr, CString};

/// Incomplete type for the engine's std::string wrapper.
#[repr(C)]
struct RtcString {
    _private: [u8; 0],
}

#[link(name = "webrtc")]
unsafe extern "C" {
    fn rtcStringData(s: *const RtcString) -> *const c_char;
    fn rtcStringSize(s: *const RtcString) -> usize;
    fn rtcDeleteString(s: *mut RtcString);

    fn webrtcCreateDefaultAudioDeviceModule(thread: *mut c_void) -> *mut c_void;
    fn webrtcAudioDeviceModuleRelease(adm: *mut c_void);
    fn webrtcAudioDeviceModulePlayoutDevices(adm: *mut c_void) -> i16;
    fn webrtcAudioDeviceModuleRecordingDevices(adm: *mut c_void) -> i16;
    fn webrtcAudioDeviceModuleInitPlayout(adm: *mut c_void, thread: *mut c_void);
    fn webrtcAudioDeviceModuleStartPlayout(adm: *mut c_void, thread: *mut c_void);
    fn webrtcAudioDeviceModuleStopPlayout(adm: *mut c_void, thread: *mut c_void);
    fn webrtcAudioDeviceModuleInitRecording(adm: *mut c_void, thread: *mut c_void);
    fn webrtcAudioDeviceModuleStartRecording(adm: *mut c_void, thread: *mut c_void);
    fn webrtcAudioDeviceModuleStopRecording(adm: *mut c_void, thread: *mut c_void);
    fn webrtcAudioDeviceModuleSetPlayoutDevice(adm: *mut c_void, index: u16) -> i32;
    fn webrtcAudioDeviceModuleSetRecordingDevice(adm: *mut c_void, index: u16) -> i32;
    fn webrtcAudioDeviceModulePlayoutDeviceName(
        adm: *mut c_void,
        index: u16,
        name: *mut c_char,
        guid: *mut c_char,
    ) -> i32;
    fn webrtcAudioDeviceModuleRecordingDeviceName(
        adm: *mut c_void,
        index: u16,
        name: *mut c_char,
        guid: *mut c_char,
    ) -> i32;
    fn webrtcAudioDeviceModuleSetSpeakerVolume(adm: *mut c_void, volume: f32);

    fn webrtcDataChannelInterfaceRelease(channel: *const c_void);
    fn webrtcDataChannelLabel(channel: *const c_void) -> *mut RtcString;
    fn webrtcDataChannelStatus(channel: *const c_void) -> c_int;
    fn webrtcDataChannelSendText(channel: *mut c_void, text: *const c_char) -> bool;
    fn webrtcDataChannelSendData(channel: *mut c_void, data: *const c_char, len: usize) -> bool;
    fn webrtcDataChannelRegisterObserverFunctions(
        channel: *mut c_void,
        context: *mut c_void,
        functions: *const DataChannelObserverFunctions,
    ) -> *mut c_void;
    fn webrtcDataChannelUnRegisterObserver(channel: *mut c_void);

    fn webrtcMediaStreamTrackInterfaceRelease(track: *const c_void);
    fn webrtcMediaStreamTrackInterfaceId(track: *const c_void) -> *mut RtcString;
    fn webrtcMediaStreamTrackInterfaceKind(track: *const c_void) -> *const c_char;
    fn webrtcAudioTrackInterfaceAddSinkFunctions(
        track: *mut c_void,
        context: *mut c_void,
        functions: *const AudioTrackSinkFunctions,
    ) -> *mut c_void;
    fn webrtcAudioTrackInterfaceRemoveSinkFunctions(track: *mut c_void, sink: *mut c_void);
}

/// Moves an engine-allocated string into a `CString` and frees the original.
unsafe fn move_rtc_string(s: *mut RtcString) -> Option<CString> {
    if s.is_null() {
        return None;
    }
    let bytes = unsafe {
        let data = rtcStringData(s);
        let size = rtcStringSize(s);
        let bytes = if data.is_null() || size == 0 {
            Vec::new()
        } else {
            std::slice::from_raw_parts(data as *const u8, size).to_vec()
        };
        rtcDeleteString(s);
        bytes
    };

    // std::string may carry interior nuls; keep what precedes the first one
    let bytes = match bytes.iter().position(|&b| b == 0) {
        Some(nul) => bytes[..nul].to_vec(),
        None => bytes,
    };
    CString::new(bytes).ok()
}

/// NativeEngine forwards every call to the linked C shim.
#[derive(Debug, Default, Copy, Clone)]
pub struct NativeEngine;

impl AudioDeviceApi for NativeEngine {
    fn create_default(&self, thread: RawHandle) -> Option<RawHandle> {
        unsafe { RawHandle::from_raw(webrtcCreateDefaultAudioDeviceModule(thread.as_ptr())) }
    }

    fn release(&self, adm: RawHandle) {
        unsafe { webrtcAudioDeviceModuleRelease(adm.as_ptr()) }
    }

    fn playout_devices(&self, adm: RawHandle) -> i16 {
        unsafe { webrtcAudioDeviceModulePlayoutDevices(adm.as_ptr()) }
    }

    fn recording_devices(&self, adm: RawHandle) -> i16 {
        unsafe { webrtcAudioDeviceModuleRecordingDevices(adm.as_ptr()) }
    }

    fn set_playout_device(&self, adm: RawHandle, index: u16) -> i32 {
        unsafe { webrtcAudioDeviceModuleSetPlayoutDevice(adm.as_ptr(), index) }
    }

    fn set_recording_device(&self, adm: RawHandle, index: u16) -> i32 {
        unsafe { webrtcAudioDeviceModuleSetRecordingDevice(adm.as_ptr(), index) }
    }

    fn playout_device_name(
        &self,
        adm: RawHandle,
        index: u16,
        name: &mut [c_char],
        guid: &mut [c_char],
    ) -> i32 {
        if name.len() < ADM_MAX_DEVICE_NAME_SIZE || guid.len() < ADM_MAX_GUID_SIZE {
            log::error!("playout device name buffers smaller than the engine maximum");
            return -1;
        }
        unsafe {
            webrtcAudioDeviceModulePlayoutDeviceName(
                adm.as_ptr(),
                index,
                name.as_mut_ptr(),
                guid.as_mut_ptr(),
            )
        }
    }

    fn recording_device_name(
        &self,
        adm: RawHandle,
        index: u16,
        name: &mut [c_char],
        guid: &mut [c_char],
    ) -> i32 {
        if name.len() < ADM_MAX_DEVICE_NAME_SIZE || guid.len() < ADM_MAX_GUID_SIZE {
            log::error!("recording device name buffers smaller than the engine maximum");
            return -1;
        }
        unsafe {
            webrtcAudioDeviceModuleRecordingDeviceName(
                adm.as_ptr(),
                index,
                name.as_mut_ptr(),
                guid.as_mut_ptr(),
            )
        }
    }

    fn init_playout(&self, adm: RawHandle, thread: RawHandle) {
        unsafe { webrtcAudioDeviceModuleInitPlayout(adm.as_ptr(), thread.as_ptr()) }
    }

    fn start_playout(&self, adm: RawHandle, thread: RawHandle) {
        unsafe { webrtcAudioDeviceModuleStartPlayout(adm.as_ptr(), thread.as_ptr()) }
    }

    fn stop_playout(&self, adm: RawHandle, thread: RawHandle) {
        unsafe { webrtcAudioDeviceModuleStopPlayout(adm.as_ptr(), thread.as_ptr()) }
    }

    fn init_recording(&self, adm: RawHandle, thread: RawHandle) {
        unsafe { webrtcAudioDeviceModuleInitRecording(adm.as_ptr(), thread.as_ptr()) }
    }

    fn start_recording(&self, adm: RawHandle, thread: RawHandle) {
        unsafe { webrtcAudioDeviceModuleStartRecording(adm.as_ptr(), thread.as_ptr()) }
    }

    fn stop_recording(&self, adm: RawHandle, thread: RawHandle) {
        unsafe { webrtcAudioDeviceModuleStopRecording(adm.as_ptr(), thread.as_ptr()) }
    }

    fn set_speaker_volume(&self, adm: RawHandle, volume: f32) {
        unsafe { webrtcAudioDeviceModuleSetSpeakerVolume(adm.as_ptr(), volume) }
    }
}

impl DataChannelApi for NativeEngine {
    fn release(&self, channel: RawHandle) {
        unsafe { webrtcDataChannelInterfaceRelease(channel.as_ptr()) }
    }

    fn label(&self, channel: RawHandle) -> Option<CString> {
        unsafe { move_rtc_string(webrtcDataChannelLabel(channel.as_ptr())) }
    }

    fn status(&self, channel: RawHandle) -> i32 {
        unsafe { webrtcDataChannelStatus(channel.as_ptr()) }
    }

    fn send_text(&self, channel: RawHandle, text: &CStr) -> bool {
        unsafe { webrtcDataChannelSendText(channel.as_ptr(), text.as_ptr()) }
    }

    fn send_data(&self, channel: RawHandle, data: &[u8]) -> bool {
        unsafe {
            webrtcDataChannelSendData(channel.as_ptr(), data.as_ptr() as *const c_char, data.len())
        }
    }

    fn register_observer(
        &self,
        channel: RawHandle,
        context: *mut c_void,
        functions: &'static DataChannelObserverFunctions,
    ) -> Option<RawHandle> {
        unsafe {
            RawHandle::from_raw(webrtcDataChannelRegisterObserverFunctions(
                channel.as_ptr(),
                context,
                functions,
            ))
        }
    }

    fn unregister_observer(&self, channel: RawHandle) {
        unsafe { webrtcDataChannelUnRegisterObserver(channel.as_ptr()) }
    }
}

impl MediaStreamTrackApi for NativeEngine {
    fn release(&self, track: RawHandle) {
        unsafe { webrtcMediaStreamTrackInterfaceRelease(track.as_ptr()) }
    }

    fn id(&self, track: RawHandle) -> Option<CString> {
        unsafe { move_rtc_string(webrtcMediaStreamTrackInterfaceId(track.as_ptr())) }
    }

    fn kind(&self, track: RawHandle) -> Option<CString> {
        unsafe {
            let kind = webrtcMediaStreamTrackInterfaceKind(track.as_ptr());
            if kind.is_null() {
                None
            } else {
                Some(CStr::from_ptr(kind).to_owned())
            }
        }
    }

    fn add_audio_sink(
        &self,
        track: RawHandle,
        context: *mut c_void,
        functions: &'static AudioTrackSinkFunctions,
    ) -> Option<RawHandle> {
        unsafe {
            RawHandle::from_raw(webrtcAudioTrackInterfaceAddSinkFunctions(
                track.as_ptr(),
                context,
                functions,
            ))
        }
    }

    fn remove_audio_sink(&self, track: RawHandle, sink: RawHandle) {
        unsafe { webrtcAudioTrackInterfaceRemoveSinkFunctions(track.as_ptr(), sink.as_ptr()) }
    }
}
