
pub mod device_name;
pub mod thread;

pub use device_name::AudioDeviceName;
pub use thread::WorkerThread;

use crate::configuration::InteropConfiguration;
use crate::engine::AudioDeviceApi;
use shared::error::{Error, Result};
use shared::marshal::CharBuffer;
use shared::{HandleCell, RawHandle};
use std::ffi::c_char;
use std::fmt;
use std::sync::Arc;

/// Largest device name, terminator included, the engine writes.
pub const ADM_MAX_DEVICE_NAME_SIZE: usize = 128;
/// Largest device guid, terminator included, the engine writes.
pub const ADM_MAX_GUID_SIZE: usize = 128;

const AUDIO_DEVICE_MODULE_KIND: &str = "audio device module";

/// device_text decodes a name or guid buffer. A buffer the engine filled
/// without a terminator held a truncated name.
fn device_text(buf: CharBuffer) -> Result<String> {
    buf.into_string().map_err(|err| match err {
        Error::ErrStringNotTerminated { capacity } => Error::ErrDeviceNameTruncated { capacity },
        err => err,
    })
}

/// AudioDeviceModule wraps the engine's platform audio device module.
///
/// Device enumeration and selection go straight to the engine. Playout and
/// recording control is marshaled onto the module's [`WorkerThread`]; those
/// calls report nothing back, and their ordering (init before start, start
/// before stop) is the caller's responsibility.
pub struct AudioDeviceModule {
    api: Arc<dyn AudioDeviceApi>,
    handle: HandleCell,
    thread: WorkerThread,
    name_capacity: usize,
    guid_capacity: usize,
}

impl AudioDeviceModule {
    /// create_default asks the engine for the platform default module, bound
    /// to `thread`.
    pub fn create_default(
        api: Arc<dyn AudioDeviceApi>,
        thread: WorkerThread,
        config: &InteropConfiguration,
    ) -> Result<Self> {
        let raw = api
            .create_default(thread.raw())
            .ok_or(Error::ErrCreateAudioDeviceModule)?;
        Ok(Self::new(api, raw, thread, config))
    }

    /// new takes over an engine reference to an existing module.
    pub fn new(
        api: Arc<dyn AudioDeviceApi>,
        raw: RawHandle,
        thread: WorkerThread,
        config: &InteropConfiguration,
    ) -> Self {
        Self {
            api,
            handle: HandleCell::new(AUDIO_DEVICE_MODULE_KIND, raw),
            thread,
            name_capacity: config.device_name_capacity(),
            guid_capacity: config.device_guid_capacity(),
        }
    }

    pub fn raw(&self) -> Option<RawHandle> {
        self.handle.raw()
    }

    pub fn thread(&self) -> WorkerThread {
        self.thread
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_released()
    }

    /// playout_devices returns the number of playout devices.
    pub fn playout_devices(&self) -> Result<u16> {
        let count = self.handle.with(|raw| self.api.playout_devices(raw))?;
        device_count(count)
    }

    /// recording_devices returns the number of recording devices.
    pub fn recording_devices(&self) -> Result<u16> {
        let count = self.handle.with(|raw| self.api.recording_devices(raw))?;
        device_count(count)
    }

    /// set_playout_device selects a playout device by zero-based index. The
    /// index is validated by the engine only.
    pub fn set_playout_device(&self, index: u16) -> Result<()> {
        let status = self
            .handle
            .with(|raw| self.api.set_playout_device(raw, index))?;
        shared::error::status_to_result(status).map(|_| ())
    }

    /// set_recording_device selects a recording device by zero-based index.
    pub fn set_recording_device(&self, index: u16) -> Result<()> {
        let status = self
            .handle
            .with(|raw| self.api.set_recording_device(raw, index))?;
        shared::error::status_to_result(status).map(|_| ())
    }

    pub fn playout_device_name(&self, index: u16) -> Result<AudioDeviceName> {
        self.device_name(index, |raw, name, guid| {
            self.api.playout_device_name(raw, index, name, guid)
        })
    }

    pub fn recording_device_name(&self, index: u16) -> Result<AudioDeviceName> {
        self.device_name(index, |raw, name, guid| {
            self.api.recording_device_name(raw, index, name, guid)
        })
    }

    fn device_name(
        &self,
        index: u16,
        query: impl FnOnce(RawHandle, &mut [c_char], &mut [c_char]) -> i32,
    ) -> Result<AudioDeviceName> {
        let mut name = CharBuffer::new(self.name_capacity);
        let mut guid = CharBuffer::new(self.guid_capacity);
        let status = self
            .handle
            .with(|raw| query(raw, name.as_mut_slice(), guid.as_mut_slice()))?;
        shared::error::status_to_result(status)?;

        Ok(AudioDeviceName {
            index,
            name: device_text(name)?,
            guid: device_text(guid)?,
        })
    }

    pub fn init_playout(&self) -> Result<()> {
        self.handle
            .with(|raw| self.api.init_playout(raw, self.thread.raw()))
    }

    pub fn start_playout(&self) -> Result<()> {
        self.handle
            .with(|raw| self.api.start_playout(raw, self.thread.raw()))
    }

    pub fn stop_playout(&self) -> Result<()> {
        self.handle
            .with(|raw| self.api.stop_playout(raw, self.thread.raw()))
    }

    pub fn init_recording(&self) -> Result<()> {
        self.handle
            .with(|raw| self.api.init_recording(raw, self.thread.raw()))
    }

    pub fn start_recording(&self) -> Result<()> {
        self.handle
            .with(|raw| self.api.start_recording(raw, self.thread.raw()))
    }

    pub fn stop_recording(&self) -> Result<()> {
        self.handle
            .with(|raw| self.api.stop_recording(raw, self.thread.raw()))
    }

    /// set_speaker_volume forwards `volume` unchanged; the engine clamps it to
    /// whatever range the device supports.
    pub fn set_speaker_volume(&self, volume: f32) -> Result<()> {
        self.handle
            .with(|raw| self.api.set_speaker_volume(raw, volume))
    }

    /// release drops the engine reference. Only the first call reaches the
    /// engine.
    pub fn release(&self) -> bool {
        self.handle.release(|raw| self.api.release(raw))
    }
}

fn device_count(count: i16) -> Result<u16> {
    u16::try_from(count).map_err(|_| Error::ErrNativeStatus(count as i32))
}

impl Drop for AudioDeviceModule {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for AudioDeviceModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioDeviceModule")
            .field("handle", &self.handle)
            .field("thread", &self.thread)
            .finish()
    }
}
