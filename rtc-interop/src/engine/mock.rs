//! In-process engine used by the unit tests.
//!
//! Objects are identified by small integer addresses. Registered observers
//! are stored exactly as a native engine would store them, context pointer
//! plus function table, and events are delivered by calling through that
//! table.

use super::{AudioDeviceApi, DataChannelApi, MediaStreamTrackApi};
use crate::bridge::{AudioTrackSinkFunctions, DataChannelObserverFunctions};
use crate::media_stream::AudioFormat;
use shared::RawHandle;
use std::collections::HashMap;
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AdmCall {
    InitPlayout(usize),
    StartPlayout(usize),
    StopPlayout(usize),
    InitRecording(usize),
    StartRecording(usize),
    StopRecording(usize),
    SetSpeakerVolume(f32),
}

#[derive(Default)]
struct MockAdm {
    thread: usize,
    selected_playout: Option<u16>,
    selected_recording: Option<u16>,
    calls: Vec<AdmCall>,
}

#[derive(Default)]
struct MockChannel {
    label: String,
    status: i32,
    send_result: bool,
    sent: Vec<Vec<u8>>,
    texts: Vec<String>,
    observer: Option<(usize, &'static DataChannelObserverFunctions)>,
    refuse_observer: bool,
    destroy_on_unregister: bool,
}

struct MockTrack {
    id: String,
    kind: &'static CStr,
    // native sink address, context, function table
    sinks: Vec<(usize, usize, &'static AudioTrackSinkFunctions)>,
}

#[derive(Default)]
struct MockState {
    next_addr: usize,
    playout_devices: Vec<(String, String)>,
    recording_devices: Vec<(String, String)>,
    device_count_error: Option<i16>,
    fail_create: bool,
    adms: HashMap<usize, MockAdm>,
    channels: HashMap<usize, MockChannel>,
    tracks: HashMap<usize, MockTrack>,
    releases: HashMap<usize, usize>,
    invalid_calls: usize,
}

impl MockState {
    fn alloc(&mut self) -> RawHandle {
        self.next_addr += 0x10;
        unsafe { RawHandle::from_addr(self.next_addr) }.unwrap()
    }

    fn adm(&mut self, adm: RawHandle) -> Option<&mut MockAdm> {
        let found = self.adms.get_mut(&adm.addr());
        if found.is_none() {
            self.invalid_calls += 1;
        }
        found
    }

    fn channel(&mut self, channel: RawHandle) -> Option<&mut MockChannel> {
        let found = self.channels.get_mut(&channel.addr());
        if found.is_none() {
            self.invalid_calls += 1;
        }
        found
    }

    fn track(&mut self, track: RawHandle) -> Option<&MockTrack> {
        let found = self.tracks.get(&track.addr());
        if found.is_none() {
            self.invalid_calls += 1;
        }
        found
    }
}

#[derive(Default)]
pub(crate) struct MockEngine {
    state: Mutex<MockState>,
}

fn write_c_string(buf: &mut [c_char], s: &str) {
    buf.iter_mut().for_each(|c| *c = 0);
    // longer strings fill the whole buffer without a terminator
    for (dst, &src) in buf.iter_mut().zip(s.as_bytes()) {
        *dst = src as c_char;
    }
}

impl MockEngine {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn thread(&self) -> RawHandle {
        self.lock().alloc()
    }

    pub(crate) fn set_playout_devices(&self, devices: &[(&str, &str)]) {
        self.lock().playout_devices = devices
            .iter()
            .map(|(name, guid)| (name.to_string(), guid.to_string()))
            .collect();
    }

    pub(crate) fn set_recording_devices(&self, devices: &[(&str, &str)]) {
        self.lock().recording_devices = devices
            .iter()
            .map(|(name, guid)| (name.to_string(), guid.to_string()))
            .collect();
    }

    pub(crate) fn set_device_count_error(&self, code: Option<i16>) {
        self.lock().device_count_error = code;
    }

    pub(crate) fn set_fail_create(&self, fail: bool) {
        self.lock().fail_create = fail;
    }

    pub(crate) fn adm_thread(&self, adm: RawHandle) -> Option<usize> {
        self.lock().adms.get(&adm.addr()).map(|adm| adm.thread)
    }

    pub(crate) fn selected_playout(&self, adm: RawHandle) -> Option<u16> {
        self.lock()
            .adms
            .get(&adm.addr())
            .and_then(|adm| adm.selected_playout)
    }

    pub(crate) fn selected_recording(&self, adm: RawHandle) -> Option<u16> {
        self.lock()
            .adms
            .get(&adm.addr())
            .and_then(|adm| adm.selected_recording)
    }

    pub(crate) fn adm_calls(&self, adm: RawHandle) -> Vec<AdmCall> {
        self.lock()
            .adms
            .get(&adm.addr())
            .map(|adm| adm.calls.clone())
            .unwrap_or_default()
    }

    pub(crate) fn create_channel(&self, label: &str) -> RawHandle {
        let mut state = self.lock();
        let raw = state.alloc();
        state.channels.insert(
            raw.addr(),
            MockChannel {
                label: label.to_string(),
                send_result: true,
                destroy_on_unregister: true,
                ..Default::default()
            },
        );
        raw
    }

    pub(crate) fn rename_channel(&self, channel: RawHandle, label: &str) {
        if let Some(ch) = self.lock().channels.get_mut(&channel.addr()) {
            ch.label = label.to_string();
        }
    }

    pub(crate) fn set_status(&self, channel: RawHandle, status: i32) {
        if let Some(ch) = self.lock().channels.get_mut(&channel.addr()) {
            ch.status = status;
        }
    }

    pub(crate) fn set_send_result(&self, channel: RawHandle, ok: bool) {
        if let Some(ch) = self.lock().channels.get_mut(&channel.addr()) {
            ch.send_result = ok;
        }
    }

    pub(crate) fn set_refuse_observer(&self, channel: RawHandle, refuse: bool) {
        if let Some(ch) = self.lock().channels.get_mut(&channel.addr()) {
            ch.refuse_observer = refuse;
        }
    }

    /// When disabled, unregistering leaves the observer installed and never
    /// calls `on_destruction`, like an engine that loses the notification.
    pub(crate) fn set_destroy_on_unregister(&self, channel: RawHandle, destroy: bool) {
        if let Some(ch) = self.lock().channels.get_mut(&channel.addr()) {
            ch.destroy_on_unregister = destroy;
        }
    }

    pub(crate) fn sent(&self, channel: RawHandle) -> Vec<Vec<u8>> {
        self.lock()
            .channels
            .get(&channel.addr())
            .map(|ch| ch.sent.clone())
            .unwrap_or_default()
    }

    pub(crate) fn texts(&self, channel: RawHandle) -> Vec<String> {
        self.lock()
            .channels
            .get(&channel.addr())
            .map(|ch| ch.texts.clone())
            .unwrap_or_default()
    }

    pub(crate) fn has_observer(&self, channel: RawHandle) -> bool {
        self.lock()
            .channels
            .get(&channel.addr())
            .is_some_and(|ch| ch.observer.is_some())
    }

    pub(crate) fn create_track(&self, id: &str, kind: &'static CStr) -> RawHandle {
        let mut state = self.lock();
        let raw = state.alloc();
        state.tracks.insert(
            raw.addr(),
            MockTrack {
                id: id.to_string(),
                kind,
                sinks: Vec::new(),
            },
        );
        raw
    }

    pub(crate) fn release_count(&self, raw: RawHandle) -> usize {
        self.lock().releases.get(&raw.addr()).copied().unwrap_or(0)
    }

    pub(crate) fn invalid_calls(&self) -> usize {
        self.lock().invalid_calls
    }

    fn observer(&self, channel: RawHandle) -> Option<(usize, &'static DataChannelObserverFunctions)> {
        self.lock()
            .channels
            .get(&channel.addr())
            .and_then(|ch| ch.observer)
    }

    // events are delivered without holding the state lock, observers may
    // call back into the engine

    pub(crate) fn fire_state_change(&self, channel: RawHandle, status: i32) {
        self.set_status(channel, status);
        if let Some((context, functions)) = self.observer(channel) {
            unsafe { (functions.on_state_change)(context as *mut c_void) };
        }
    }

    pub(crate) fn fire_message(&self, channel: RawHandle, binary: bool, data: &[u8]) {
        if let Some((context, functions)) = self.observer(channel) {
            unsafe {
                (functions.on_message)(
                    context as *mut c_void,
                    binary,
                    data.as_ptr(),
                    data.len() as c_int,
                )
            };
        }
    }

    pub(crate) fn fire_buffered_amount_change(&self, channel: RawHandle, sent_data_size: u64) {
        if let Some((context, functions)) = self.observer(channel) {
            unsafe { (functions.on_buffered_amount_change)(context as *mut c_void, sent_data_size) };
        }
    }

    /// Destroys the observer from the engine side, as happens when the
    /// native channel goes away on its own.
    pub(crate) fn fire_destruction(&self, channel: RawHandle) {
        let observer = self
            .lock()
            .channels
            .get_mut(&channel.addr())
            .and_then(|ch| ch.observer.take());
        if let Some((context, functions)) = observer {
            unsafe { (functions.on_destruction)(context as *mut c_void) };
        }
    }

    /// Replays a callback through a context the engine kept after it was
    /// destroyed.
    pub(crate) fn fire_stale_state_change(
        &self,
        context: usize,
        functions: &'static DataChannelObserverFunctions,
    ) {
        unsafe { (functions.on_state_change)(context as *mut c_void) };
    }

    pub(crate) fn audio_sink_count(&self, track: RawHandle) -> usize {
        self.lock()
            .tracks
            .get(&track.addr())
            .map_or(0, |t| t.sinks.len())
    }

    /// Delivers one chunk of PCM to every sink attached to `track`, as the
    /// engine's audio thread would.
    pub(crate) fn fire_audio_data(
        &self,
        track: RawHandle,
        samples: &[u8],
        format: AudioFormat,
        number_of_frames: usize,
    ) {
        let sinks = self
            .lock()
            .tracks
            .get(&track.addr())
            .map(|t| t.sinks.clone())
            .unwrap_or_default();
        for (_, context, functions) in sinks {
            unsafe {
                (functions.on_data)(
                    context as *mut c_void,
                    samples.as_ptr() as *const c_void,
                    format.bits_per_sample,
                    format.sample_rate,
                    format.number_of_channels,
                    number_of_frames,
                )
            };
        }
    }

    fn record_release(&self, raw: RawHandle) {
        let mut state = self.lock();
        *state.releases.entry(raw.addr()).or_default() += 1;
    }
}

impl AudioDeviceApi for MockEngine {
    fn create_default(&self, thread: RawHandle) -> Option<RawHandle> {
        let mut state = self.lock();
        if state.fail_create {
            return None;
        }
        let raw = state.alloc();
        state.adms.insert(
            raw.addr(),
            MockAdm {
                thread: thread.addr(),
                ..Default::default()
            },
        );
        Some(raw)
    }

    fn release(&self, adm: RawHandle) {
        self.record_release(adm);
        let mut state = self.lock();
        if state.adms.remove(&adm.addr()).is_none() {
            state.invalid_calls += 1;
        }
    }

    fn playout_devices(&self, adm: RawHandle) -> i16 {
        let mut state = self.lock();
        if state.adm(adm).is_none() {
            return -1;
        }
        state
            .device_count_error
            .unwrap_or(state.playout_devices.len() as i16)
    }

    fn recording_devices(&self, adm: RawHandle) -> i16 {
        let mut state = self.lock();
        if state.adm(adm).is_none() {
            return -1;
        }
        state
            .device_count_error
            .unwrap_or(state.recording_devices.len() as i16)
    }

    fn set_playout_device(&self, adm: RawHandle, index: u16) -> i32 {
        let mut state = self.lock();
        let count = state.playout_devices.len();
        match state.adm(adm) {
            Some(adm) if (index as usize) < count => {
                adm.selected_playout = Some(index);
                0
            }
            _ => -1,
        }
    }

    fn set_recording_device(&self, adm: RawHandle, index: u16) -> i32 {
        let mut state = self.lock();
        let count = state.recording_devices.len();
        match state.adm(adm) {
            Some(adm) if (index as usize) < count => {
                adm.selected_recording = Some(index);
                0
            }
            _ => -1,
        }
    }

    fn playout_device_name(
        &self,
        adm: RawHandle,
        index: u16,
        name: &mut [c_char],
        guid: &mut [c_char],
    ) -> i32 {
        let mut state = self.lock();
        if state.adm(adm).is_none() {
            return -1;
        }
        match state.playout_devices.get(index as usize) {
            Some((device_name, device_guid)) => {
                write_c_string(name, device_name);
                write_c_string(guid, device_guid);
                0
            }
            None => -1,
        }
    }

    fn recording_device_name(
        &self,
        adm: RawHandle,
        index: u16,
        name: &mut [c_char],
        guid: &mut [c_char],
    ) -> i32 {
        let mut state = self.lock();
        if state.adm(adm).is_none() {
            return -1;
        }
        match state.recording_devices.get(index as usize) {
            Some((device_name, device_guid)) => {
                write_c_string(name, device_name);
                write_c_string(guid, device_guid);
                0
            }
            None => -1,
        }
    }

    fn init_playout(&self, adm: RawHandle, thread: RawHandle) {
        if let Some(adm) = self.lock().adm(adm) {
            adm.calls.push(AdmCall::InitPlayout(thread.addr()));
        }
    }

    fn start_playout(&self, adm: RawHandle, thread: RawHandle) {
        if let Some(adm) = self.lock().adm(adm) {
            adm.calls.push(AdmCall::StartPlayout(thread.addr()));
        }
    }

    fn stop_playout(&self, adm: RawHandle, thread: RawHandle) {
        if let Some(adm) = self.lock().adm(adm) {
            adm.calls.push(AdmCall::StopPlayout(thread.addr()));
        }
    }

    fn init_recording(&self, adm: RawHandle, thread: RawHandle) {
        if let Some(adm) = self.lock().adm(adm) {
            adm.calls.push(AdmCall::InitRecording(thread.addr()));
        }
    }

    fn start_recording(&self, adm: RawHandle, thread: RawHandle) {
        if let Some(adm) = self.lock().adm(adm) {
            adm.calls.push(AdmCall::StartRecording(thread.addr()));
        }
    }

    fn stop_recording(&self, adm: RawHandle, thread: RawHandle) {
        if let Some(adm) = self.lock().adm(adm) {
            adm.calls.push(AdmCall::StopRecording(thread.addr()));
        }
    }

    fn set_speaker_volume(&self, adm: RawHandle, volume: f32) {
        if let Some(adm) = self.lock().adm(adm) {
            adm.calls.push(AdmCall::SetSpeakerVolume(volume));
        }
    }
}

impl DataChannelApi for MockEngine {
    fn release(&self, channel: RawHandle) {
        self.record_release(channel);
        let mut state = self.lock();
        if state.channels.remove(&channel.addr()).is_none() {
            state.invalid_calls += 1;
        }
    }

    fn label(&self, channel: RawHandle) -> Option<CString> {
        self.lock()
            .channel(channel)
            .and_then(|ch| CString::new(ch.label.clone()).ok())
    }

    fn status(&self, channel: RawHandle) -> i32 {
        self.lock().channel(channel).map_or(-1, |ch| ch.status)
    }

    fn send_text(&self, channel: RawHandle, text: &CStr) -> bool {
        match self.lock().channel(channel) {
            Some(ch) if ch.send_result => {
                ch.texts.push(text.to_string_lossy().into_owned());
                true
            }
            _ => false,
        }
    }

    fn send_data(&self, channel: RawHandle, data: &[u8]) -> bool {
        match self.lock().channel(channel) {
            Some(ch) if ch.send_result => {
                ch.sent.push(data.to_vec());
                true
            }
            _ => false,
        }
    }

    fn register_observer(
        &self,
        channel: RawHandle,
        context: *mut c_void,
        functions: &'static DataChannelObserverFunctions,
    ) -> Option<RawHandle> {
        let mut state = self.lock();
        let refused = match state.channel(channel) {
            Some(ch) if !ch.refuse_observer => {
                ch.observer = Some((context as usize, functions));
                false
            }
            _ => true,
        };
        if refused {
            None
        } else {
            Some(state.alloc())
        }
    }

    fn unregister_observer(&self, channel: RawHandle) {
        let observer = match self.lock().channel(channel) {
            Some(ch) if ch.destroy_on_unregister => ch.observer.take(),
            _ => None,
        };
        // the native observer is deleted synchronously and reports it
        if let Some((context, functions)) = observer {
            unsafe { (functions.on_destruction)(context as *mut c_void) };
        }
    }
}

impl MediaStreamTrackApi for MockEngine {
    fn release(&self, track: RawHandle) {
        self.record_release(track);
        let mut state = self.lock();
        if state.tracks.remove(&track.addr()).is_none() {
            state.invalid_calls += 1;
        }
    }

    fn id(&self, track: RawHandle) -> Option<CString> {
        self.lock()
            .track(track)
            .and_then(|t| CString::new(t.id.clone()).ok())
    }

    fn kind(&self, track: RawHandle) -> Option<CString> {
        self.lock().track(track).map(|t| t.kind.to_owned())
    }

    fn add_audio_sink(
        &self,
        track: RawHandle,
        context: *mut c_void,
        functions: &'static AudioTrackSinkFunctions,
    ) -> Option<RawHandle> {
        let mut state = self.lock();
        let is_audio = state.track(track).is_some_and(|t| t.kind == c"audio");
        if !is_audio {
            return None;
        }
        let sink = state.alloc();
        state
            .tracks
            .get_mut(&track.addr())?
            .sinks
            .push((sink.addr(), context as usize, functions));
        Some(sink)
    }

    fn remove_audio_sink(&self, track: RawHandle, sink: RawHandle) {
        let mut state = self.lock();
        let removed = match state.tracks.get_mut(&track.addr()) {
            Some(t) => {
                let before = t.sinks.len();
                t.sinks.retain(|&(addr, _, _)| addr != sink.addr());
                t.sinks.len() < before
            }
            None => false,
        };
        if !removed {
            state.invalid_calls += 1;
        }
    }
}
