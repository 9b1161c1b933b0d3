
use crate::audio_device::{ADM_MAX_DEVICE_NAME_SIZE, ADM_MAX_GUID_SIZE};
use serde::{Deserialize, Serialize};

/// Default capacity of a [`RingBufferAudioSink`](crate::media_stream::RingBufferAudioSink),
/// one second of 48kHz 16-bit stereo.
pub const DEFAULT_AUDIO_SINK_CAPACITY: usize = 192_000;

/// InteropConfiguration tunes the buffers the bindings allocate on the Rust
/// side of the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteropConfiguration {
    pub(crate) device_name_capacity: usize,
    pub(crate) device_guid_capacity: usize,
    pub(crate) audio_sink_capacity: usize,
}

impl Default for InteropConfiguration {
    fn default() -> Self {
        Self {
            device_name_capacity: ADM_MAX_DEVICE_NAME_SIZE,
            device_guid_capacity: ADM_MAX_GUID_SIZE,
            audio_sink_capacity: DEFAULT_AUDIO_SINK_CAPACITY,
        }
    }
}

impl InteropConfiguration {
    /// device_name_capacity is the size of the buffer handed to the device
    /// name queries. The engine writes up to [`ADM_MAX_DEVICE_NAME_SIZE`]
    /// bytes, so smaller values are raised to it.
    pub fn device_name_capacity(&self) -> usize {
        self.device_name_capacity.max(ADM_MAX_DEVICE_NAME_SIZE)
    }

    /// device_guid_capacity is the guid counterpart of
    /// [`InteropConfiguration::device_name_capacity`].
    pub fn device_guid_capacity(&self) -> usize {
        self.device_guid_capacity.max(ADM_MAX_GUID_SIZE)
    }

    /// audio_sink_capacity is the ring size, in bytes, of sinks built with
    /// [`RingBufferAudioSink::from_config`](crate::media_stream::RingBufferAudioSink::from_config).
    pub fn audio_sink_capacity(&self) -> usize {
        self.audio_sink_capacity
    }
}

/// InteropConfigurationBuilder builds an [`InteropConfiguration`].
#[derive(Default, Debug, Clone)]
pub struct InteropConfigurationBuilder {
    configuration: InteropConfiguration,
}

impl InteropConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device_name_capacity(mut self, capacity: usize) -> Self {
        self.configuration.device_name_capacity = capacity;
        self
    }

    pub fn with_device_guid_capacity(mut self, capacity: usize) -> Self {
        self.configuration.device_guid_capacity = capacity;
        self
    }

    pub fn with_audio_sink_capacity(mut self, capacity: usize) -> Self {
        self.configuration.audio_sink_capacity = capacity;
        self
    }

    pub fn build(self) -> InteropConfiguration {
        self.configuration
    }
}
