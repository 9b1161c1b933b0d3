
pub mod audio_sink;

pub use audio_sink::{AudioData, AudioFormat, AudioTrackSink, RingBufferAudioSink};

use crate::bridge::{audio_sink_registry, ObserverToken, AUDIO_TRACK_SINK_FUNCTIONS};
use crate::engine::MediaStreamTrackApi;
use shared::error::{Error, Result};
use shared::marshal::c_string_to_string;
use shared::{HandleCell, RawHandle};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const MEDIA_STREAM_TRACK_KIND: &str = "media stream track";
const MEDIA_KIND_UNSPECIFIED_STR: &str = "Unspecified";

/// Media type of a track.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MediaKind {
    #[default]
    Unspecified,
    Audio,
    Video,
}

impl From<&str> for MediaKind {
    fn from(raw: &str) -> Self {
        match raw {
            "audio" => MediaKind::Audio,
            "video" => MediaKind::Video,
            _ => MediaKind::Unspecified,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Unspecified => MEDIA_KIND_UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

/// MediaStreamTrack wraps a native media stream track. Like every other
/// wrapper it owns one engine reference, released once.
///
/// Audio tracks feed attached [`AudioTrackSink`]s. Sinks still attached when
/// the track is released are detached first.
pub struct MediaStreamTrack {
    api: Arc<dyn MediaStreamTrackApi>,
    handle: HandleCell,
    // sink token to the engine's native sink
    sinks: Mutex<HashMap<ObserverToken, RawHandle>>,
}

impl MediaStreamTrack {
    pub fn new(api: Arc<dyn MediaStreamTrackApi>, raw: RawHandle) -> Self {
        Self {
            api,
            handle: HandleCell::new(MEDIA_STREAM_TRACK_KIND, raw),
            sinks: Mutex::new(HashMap::new()),
        }
    }

    fn sinks(&self) -> MutexGuard<'_, HashMap<ObserverToken, RawHandle>> {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn raw(&self) -> Option<RawHandle> {
        self.handle.raw()
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_released()
    }

    /// id returns the track identifier, read from the engine on every call.
    pub fn id(&self) -> Result<String> {
        let id = self
            .handle
            .with(|raw| self.api.id(raw))?
            .ok_or(Error::ErrNativeStringMissing)?;
        Ok(c_string_to_string(id))
    }

    pub fn kind(&self) -> Result<MediaKind> {
        let kind = self
            .handle
            .with(|raw| self.api.kind(raw))?
            .ok_or(Error::ErrNativeStringMissing)?;
        Ok(MediaKind::from(c_string_to_string(kind).as_str()))
    }

    /// add_audio_sink attaches `sink` to this audio track. The sink is kept
    /// alive until it is detached or the track is released.
    pub fn add_audio_sink(&self, sink: Arc<dyn AudioTrackSink>) -> Result<ObserverToken> {
        self.handle.with(|raw| {
            let registry = audio_sink_registry();
            let token = registry.insert(sink);
            match self
                .api
                .add_audio_sink(raw, token.as_context(), &AUDIO_TRACK_SINK_FUNCTIONS)
            {
                Some(native) => {
                    log::debug!("{MEDIA_STREAM_TRACK_KIND}: {token:?} attached as {native:?}");
                    self.sinks().insert(token, native);
                    Ok(token)
                }
                None => {
                    registry.remove(token);
                    Err(Error::ErrAudioSinkRejected)
                }
            }
        })?
    }

    /// remove_audio_sink detaches the sink attached as `token`.
    pub fn remove_audio_sink(&self, token: ObserverToken) -> Result<()> {
        self.handle.with(|raw| {
            let native = self
                .sinks()
                .remove(&token)
                .ok_or(Error::ErrAudioSinkNotAttached)?;
            self.detach(raw, token, native);
            Ok(())
        })?
    }

    fn detach(&self, raw: RawHandle, token: ObserverToken, native: RawHandle) {
        self.api.remove_audio_sink(raw, native);
        audio_sink_registry().remove(token);
        log::debug!("{MEDIA_STREAM_TRACK_KIND}: {token:?} detached");
    }

    pub fn release(&self) -> bool {
        // runs under the exclusive lock, so no sink is attached meanwhile
        self.handle.release(|raw| {
            for (token, native) in self.sinks().drain() {
                self.detach(raw, token, native);
            }
            self.api.release(raw)
        })
    }
}

impl Drop for MediaStreamTrack {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for MediaStreamTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStreamTrack")
            .field("handle", &self.handle)
            .finish()
    }
}
