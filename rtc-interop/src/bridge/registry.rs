use crate::data_channel::observer::{DataChannelObserver, ObserverSlot};
use crate::media_stream::AudioTrackSink;
use std::collections::HashMap;
use std::ffi::c_void;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

lazy_static! {
    static ref OBSERVER_REGISTRY: ObserverRegistry = ObserverRegistry::new();
    static ref AUDIO_SINK_REGISTRY: AudioSinkRegistry = AudioSinkRegistry::new();
}

// shared by both registries, so a context never resolves in the wrong one
static NEXT_TOKEN: AtomicUsize = AtomicUsize::new(1);

fn next_token() -> ObserverToken {
    loop {
        let raw = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        if let Some(token) = NonZeroUsize::new(raw) {
            return ObserverToken(token);
        }
    }
}

/// observer_registry returns the process-wide registry that native callbacks
/// resolve their context against.
pub fn observer_registry() -> &'static ObserverRegistry {
    &OBSERVER_REGISTRY
}

/// audio_sink_registry returns the process-wide registry of attached audio
/// sinks.
pub fn audio_sink_registry() -> &'static AudioSinkRegistry {
    &AUDIO_SINK_REGISTRY
}

/// ObserverToken identifies one observer registration or attached sink. It
/// is what the engine holds as its opaque context; it is never dereferenced.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ObserverToken(NonZeroUsize);

impl ObserverToken {
    pub fn as_context(&self) -> *mut c_void {
        self.0.get() as *mut c_void
    }

    pub fn from_context(context: *mut c_void) -> Option<Self> {
        NonZeroUsize::new(context as usize).map(ObserverToken)
    }
}

impl fmt::Debug for ObserverToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObserverToken({})", self.0)
    }
}

#[derive(Default, Debug)]
struct Lifecycle {
    in_flight: usize,
    removed: bool,
    destroyed: bool,
}

impl Lifecycle {
    fn take_destroyed(&mut self) -> bool {
        if self.removed && self.in_flight == 0 && !self.destroyed {
            self.destroyed = true;
            true
        } else {
            false
        }
    }
}

/// Registration is one observer as the registry holds it.
///
/// Dispatches that resolved it before it was removed may still be running.
/// `on_observer_destroyed` is owed to whichever of them returns last, or to
/// the remover when none is running, and is delivered exactly once.
pub(crate) struct Registration {
    pub(crate) observer: Arc<dyn DataChannelObserver>,
    pub(crate) slot: Weak<ObserverSlot>,
    lifecycle: Mutex<Lifecycle>,
}

impl Registration {
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self) {
        self.lifecycle().in_flight += 1;
    }

    /// exit ends one dispatch. It returns true when the registration was
    /// removed meanwhile and this was the last dispatch, in which case the
    /// caller delivers `on_observer_destroyed`.
    pub(crate) fn exit(&self) -> bool {
        let mut lifecycle = self.lifecycle();
        lifecycle.in_flight -= 1;
        lifecycle.take_destroyed()
    }

    /// retire marks a removed registration. It returns true when no dispatch
    /// is running, in which case the caller delivers `on_observer_destroyed`.
    pub(crate) fn retire(&self) -> bool {
        let mut lifecycle = self.lifecycle();
        lifecycle.removed = true;
        lifecycle.take_destroyed()
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.lifecycle().in_flight
    }
}

/// ObserverRegistry owns every registered observer until the engine reports
/// it destroyed (or its channel is released). Lookup and removal happen under
/// one lock, so once a token is removed no callback can resolve it again.
/// A dispatch is counted on its registration before that lock is dropped.
pub struct ObserverRegistry {
    registrations: Mutex<HashMap<ObserverToken, Arc<Registration>>>,
}

impl ObserverRegistry {
    fn new() -> Self {
        Self {
            registrations: Mutex::new(HashMap::new()),
        }
    }

    // callbacks cannot report errors, and observer code never runs under this
    // lock, so a poisoned map is still consistent
    fn lock(&self) -> MutexGuard<'_, HashMap<ObserverToken, Arc<Registration>>> {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn insert(
        &self,
        observer: Arc<dyn DataChannelObserver>,
        slot: Weak<ObserverSlot>,
    ) -> ObserverToken {
        let token = next_token();
        let registration = Registration {
            observer,
            slot,
            lifecycle: Mutex::new(Lifecycle::default()),
        };
        self.lock().insert(token, Arc::new(registration));
        log::trace!("observer registry: inserted {token:?}");
        token
    }

    /// acquire resolves `token` for one dispatch. The caller must pair it
    /// with [`Registration::exit`].
    pub(crate) fn acquire(&self, token: ObserverToken) -> Option<Arc<Registration>> {
        let registrations = self.lock();
        let registration = registrations.get(&token)?;
        registration.enter();
        Some(Arc::clone(registration))
    }

    pub(crate) fn remove(&self, token: ObserverToken) -> Option<Arc<Registration>> {
        let registration = self.lock().remove(&token);
        if registration.is_some() {
            log::trace!("observer registry: removed {token:?}");
        }
        registration
    }

    pub fn contains(&self, token: ObserverToken) -> bool {
        self.lock().contains_key(&token)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// AudioSinkRegistry owns every sink attached to a native audio track until
/// it is detached. A chunk already being delivered when the sink is detached
/// still completes against the sink it resolved.
pub struct AudioSinkRegistry {
    sinks: Mutex<HashMap<ObserverToken, Arc<dyn AudioTrackSink>>>,
}

impl AudioSinkRegistry {
    fn new() -> Self {
        Self {
            sinks: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ObserverToken, Arc<dyn AudioTrackSink>>> {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn insert(&self, sink: Arc<dyn AudioTrackSink>) -> ObserverToken {
        let token = next_token();
        self.lock().insert(token, sink);
        log::trace!("audio sink registry: inserted {token:?}");
        token
    }

    pub(crate) fn resolve(&self, token: ObserverToken) -> Option<Arc<dyn AudioTrackSink>> {
        self.lock().get(&token).cloned()
    }

    pub(crate) fn remove(&self, token: ObserverToken) -> Option<Arc<dyn AudioTrackSink>> {
        self.lock().remove(&token)
    }

    pub fn contains(&self, token: ObserverToken) -> bool {
        self.lock().contains_key(&token)
    }
}
