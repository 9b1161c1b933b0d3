
use crate::error::{Error, Result};
use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;
use std::sync::{PoisonError, RwLock};

/// RawHandle is an opaque, non-null pointer to a resource owned by the
/// native engine. The binding never dereferences it.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct RawHandle(NonNull<c_void>);

// Native engine objects are internally synchronized and reference counted;
// the pointer value itself carries no thread affinity.
unsafe impl Send for RawHandle {}
unsafe impl Sync for RawHandle {}

impl RawHandle {
    /// from_raw wraps a pointer handed out by the native engine.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to a live native object of the type the
    /// handle will be used with.
    pub unsafe fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(RawHandle)
    }

    /// from_addr builds a handle from an address-sized identifier, as used by
    /// engines that index their objects instead of handing out pointers.
    ///
    /// # Safety
    ///
    /// The engine receiving this handle must interpret it as an identifier
    /// and never dereference it.
    pub unsafe fn from_addr(addr: usize) -> Option<Self> {
        NonNull::new(addr as *mut c_void).map(RawHandle)
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.0.as_ptr()
    }

    pub fn addr(&self) -> usize {
        self.0.as_ptr() as usize
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawHandle({:p})", self.0.as_ptr())
    }
}

/// HandleCell guards a [`RawHandle`] with a liveness flag.
///
/// Native calls run under the shared side of the lock after checking the
/// handle is still live, so any number of them may proceed concurrently.
/// Release takes the exclusive side: it waits for in-flight calls to drain,
/// hands the handle to the release function exactly once, and leaves the cell
/// empty so later calls fail with [`Error::ErrHandleReleased`].
///
/// A closure passed to [`HandleCell::with`] must not release the same cell.
/// The exclusive lock would wait on the caller's own shared guard.
///
/// It must not call back into the same cell either. Observer callbacks the
/// engine runs synchronously inside such a closure count as calling back.
/// The lock may block a nested shared acquisition while a release is
/// waiting, so a nested call deadlocks against a concurrent release.
pub struct HandleCell {
    kind: &'static str,
    raw: RwLock<Option<RawHandle>>,
}

impl HandleCell {
    pub fn new(kind: &'static str, raw: RawHandle) -> Self {
        log::debug!("{kind}: wrapped {raw:?}");
        Self {
            kind,
            raw: RwLock::new(Some(raw)),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// with runs `f` with the live handle, holding off release until `f`
    /// returns.
    pub fn with<T>(&self, f: impl FnOnce(RawHandle) -> T) -> Result<T> {
        let guard = self.raw.read()?;
        match *guard {
            Some(raw) => Ok(f(raw)),
            None => Err(Error::ErrHandleReleased(self.kind)),
        }
    }

    /// raw returns the handle if it has not been released yet. The value may
    /// be stale by the time the caller uses it; prefer [`HandleCell::with`].
    pub fn raw(&self) -> Option<RawHandle> {
        *self.raw.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_released(&self) -> bool {
        self.raw().is_none()
    }

    /// release passes the handle to `release_fn` if this is the first release
    /// and reports whether it did.
    pub fn release(&self, release_fn: impl FnOnce(RawHandle)) -> bool {
        let mut guard = self.raw.write().unwrap_or_else(PoisonError::into_inner);
        match guard.take() {
            Some(raw) => {
                log::debug!("{}: releasing {raw:?}", self.kind);
                release_fn(raw);
                true
            }
            None => {
                log::trace!("{}: release on already released handle", self.kind);
                false
            }
        }
    }
}

impl fmt::Debug for HandleCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleCell")
            .field("kind", &self.kind)
            .field("raw", &self.raw())
            .finish()
    }
}
