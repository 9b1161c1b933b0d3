use shared::RawHandle;

/// WorkerThread is a non-owning handle to the engine thread that playout and
/// recording control calls are marshaled onto.
///
/// The thread belongs to the engine; it must outlive every
/// [`AudioDeviceModule`](super::AudioDeviceModule) created on it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WorkerThread(RawHandle);

impl WorkerThread {
    pub fn new(raw: RawHandle) -> Self {
        WorkerThread(raw)
    }

    pub fn raw(&self) -> RawHandle {
        self.0
    }
}
