
use crate::configuration::InteropConfiguration;
use serde::{Deserialize, Serialize};
use shared::error::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// AudioFormat describes interleaved PCM as delivered by an audio track.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub bits_per_sample: i32,
    pub sample_rate: i32,
    pub number_of_channels: usize,
}

/// AudioData is one chunk of audio handed to an [`AudioTrackSink`]. `samples`
/// is only valid for the duration of the callback.
#[derive(Debug, Copy, Clone)]
pub struct AudioData<'a> {
    pub samples: &'a [u8],
    pub format: AudioFormat,
    pub number_of_frames: usize,
}

impl AudioData<'_> {
    /// byte_len is the number of bytes the header says `samples` holds, or
    /// `None` if it does not fit in a `usize`.
    pub fn byte_len(&self) -> Option<usize> {
        let sample_size = usize::try_from(self.format.bits_per_sample / 8).ok()?;
        self.number_of_frames
            .checked_mul(self.format.number_of_channels)?
            .checked_mul(sample_size)
    }
}

/// AudioTrackSink receives decoded audio from a track, on an engine thread.
/// Attach one with [`MediaStreamTrack::add_audio_sink`](super::MediaStreamTrack::add_audio_sink).
pub trait AudioTrackSink: Send + Sync {
    fn on_data(&self, data: &AudioData<'_>);
}

/// Ring buffer indices. Every write is stored contiguously; a write that does
/// not fit before the end of the buffer starts over at zero and `watermark`
/// marks where the valid data before it stops. `read == write` always means
/// empty, so a write never fills the gap up to `read` completely.
#[derive(Debug)]
struct AudioRing {
    buf: Vec<u8>,
    read: usize,
    write: usize,
    watermark: usize,
    format: Option<AudioFormat>,
}

impl AudioRing {
    fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity],
            read: 0,
            write: 0,
            watermark: capacity,
            format: None,
        }
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }

    fn reset(&mut self) {
        self.read = 0;
        self.write = 0;
        self.watermark = self.capacity();
    }

    fn wrapped(&self) -> bool {
        self.write < self.read
    }

    fn available(&self) -> usize {
        if self.wrapped() {
            (self.watermark - self.read) + self.write
        } else {
            self.write - self.read
        }
    }

    /// push stores `data` whole or not at all.
    fn push(&mut self, data: &[u8]) -> bool {
        let len = data.len();
        if self.read == self.write {
            self.reset();
        }

        if self.wrapped() {
            if len >= self.read - self.write {
                return false;
            }
        } else if len > self.capacity() - self.write {
            if len >= self.read {
                return false;
            }
            self.watermark = self.write;
            self.write = 0;
        }

        self.buf[self.write..self.write + len].copy_from_slice(data);
        self.write += len;
        true
    }

    /// consume moves `read` forward by `n <= available()` bytes.
    fn consume(&mut self, n: usize) {
        if self.wrapped() {
            let tail = self.watermark - self.read;
            if n >= tail {
                self.read = n - tail;
                self.watermark = self.capacity();
            } else {
                self.read += n;
            }
        } else {
            self.read += n;
        }

        if self.read == self.write {
            self.reset();
        }
    }

    fn copy_out(&self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.available());
        let first = if self.wrapped() {
            n.min(self.watermark - self.read)
        } else {
            n
        };
        out[..first].copy_from_slice(&self.buf[self.read..self.read + first]);
        out[first..n].copy_from_slice(&self.buf[..n - first]);
        n
    }
}

/// RingBufferAudioSink buffers the audio of a track for a consumer that polls
/// it, such as a game engine's audio callback.
///
/// Chunks are stored whole: a chunk that does not fit, or whose header
/// disagrees with its payload, is dropped and counted in
/// [`RingBufferAudioSink::dropped`]. A change of [`AudioFormat`] discards
/// everything buffered in the old format.
#[derive(Debug)]
pub struct RingBufferAudioSink {
    ring: Mutex<AudioRing>,
    dropped: AtomicUsize,
}

impl RingBufferAudioSink {
    /// new creates a sink holding up to `capacity` bytes.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::ErrAudioSinkZeroCapacity);
        }
        Ok(Self {
            ring: Mutex::new(AudioRing::new(capacity)),
            dropped: AtomicUsize::new(0),
        })
    }

    pub fn from_config(config: &InteropConfiguration) -> Result<Self> {
        Self::new(config.audio_sink_capacity())
    }

    fn lock(&self) -> MutexGuard<'_, AudioRing> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    /// available returns the number of buffered bytes.
    pub fn available(&self) -> usize {
        self.lock().available()
    }

    /// format returns the format of the buffered audio, `None` before the
    /// first chunk.
    pub fn format(&self) -> Option<AudioFormat> {
        self.lock().format
    }

    /// dropped returns how many chunks were discarded so far.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// read copies up to `out.len()` buffered bytes into `out`, oldest first,
    /// and consumes them.
    pub fn read(&self, out: &mut [u8]) -> usize {
        let mut ring = self.lock();
        let n = ring.copy_out(out);
        ring.consume(n);
        n
    }

    /// advance discards `n` buffered bytes.
    pub fn advance(&self, n: usize) -> Result<()> {
        let mut ring = self.lock();
        let available = ring.available();
        if n > available {
            return Err(Error::ErrAudioSinkAdvance {
                requested: n,
                available,
            });
        }
        ring.consume(n);
        Ok(())
    }

    /// reset discards all buffered audio.
    pub fn reset(&self) {
        self.lock().reset();
    }

    fn drop_chunk(&self, reason: &str) {
        let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        log::trace!("audio sink: dropped chunk ({reason}), {dropped} dropped so far");
    }
}

impl AudioTrackSink for RingBufferAudioSink {
    fn on_data(&self, data: &AudioData<'_>) {
        let Some(len) = data.byte_len() else {
            self.drop_chunk("invalid header");
            return;
        };
        let Some(samples) = data.samples.get(..len) else {
            self.drop_chunk("short payload");
            return;
        };

        let mut ring = self.lock();
        if ring.format != Some(data.format) {
            log::debug!(
                "audio sink: format changed {:?} -> {:?}, resetting",
                ring.format,
                data.format
            );
            ring.format = Some(data.format);
            ring.reset();
        }

        if !ring.push(samples) {
            drop(ring);
            self.drop_chunk("buffer full");
        }
    }
}
