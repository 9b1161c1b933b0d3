
pub mod message;
pub mod observer;
pub mod state;

pub use message::DataChannelMessage;
pub use observer::{DataChannelObserver, ObserverState};
pub use state::DataChannelState;

use crate::bridge::{self, observer_registry, ObserverToken, DATA_CHANNEL_OBSERVER_FUNCTIONS};
use crate::engine::DataChannelApi;
use observer::ObserverSlot;
use shared::error::{Error, Result};
use shared::marshal::{c_string_to_string, checked_range, to_c_string};
use shared::{HandleCell, RawHandle};
use std::fmt;
use std::sync::Arc;

const DATA_CHANNEL_KIND: &str = "data channel";

/// DataChannel wraps a native data channel.
///
/// The wrapper owns one engine reference, released exactly once by
/// [`DataChannel::release`] or on drop. Every call checks the handle is still
/// live and holds off release until it returns, so calls racing a release
/// either complete against the live channel or fail with
/// [`Error::ErrHandleReleased`].
///
/// At most one observer is registered at a time.
pub struct DataChannel {
    api: Arc<dyn DataChannelApi>,
    handle: HandleCell,
    observer_slot: Arc<ObserverSlot>,
}

impl DataChannel {
    /// new takes over the engine reference held by `raw`.
    pub fn new(api: Arc<dyn DataChannelApi>, raw: RawHandle) -> Self {
        Self {
            api,
            handle: HandleCell::new(DATA_CHANNEL_KIND, raw),
            observer_slot: Arc::new(ObserverSlot::default()),
        }
    }

    /// raw returns the native handle while the channel is live.
    pub fn raw(&self) -> Option<RawHandle> {
        self.handle.raw()
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_released()
    }

    /// label returns the channel's current label. It is read from the engine
    /// on every call.
    pub fn label(&self) -> Result<String> {
        let label = self
            .handle
            .with(|raw| self.api.label(raw))?
            .ok_or(Error::ErrNativeStringMissing)?;
        Ok(c_string_to_string(label))
    }

    /// status returns the engine's state code unchanged.
    pub fn status(&self) -> Result<i32> {
        self.handle.with(|raw| self.api.status(raw))
    }

    /// ready_state maps [`DataChannel::status`] to a [`DataChannelState`].
    pub fn ready_state(&self) -> Result<DataChannelState> {
        Ok(DataChannelState::from(self.status()?))
    }

    /// send sends the binary message to the DataChannel peer.
    pub fn send(&self, data: &[u8]) -> Result<()> {
        let sent = self.handle.with(|raw| self.api.send_data(raw, data))?;
        if sent {
            Ok(())
        } else {
            Err(Error::ErrDataChannelSendFailed)
        }
    }

    /// send_range sends `data[offset..offset + length]`. The range is checked
    /// against `data` before anything reaches the engine.
    pub fn send_range(&self, data: &[u8], offset: usize, length: usize) -> Result<()> {
        let payload = checked_range(data, offset, length)?;
        self.send(payload)
    }

    /// send_text sends the text message to the DataChannel peer.
    pub fn send_text(&self, text: &str) -> Result<()> {
        let text = to_c_string(text)?;
        let sent = self.handle.with(|raw| self.api.send_text(raw, &text))?;
        if sent {
            Ok(())
        } else {
            Err(Error::ErrDataChannelSendFailed)
        }
    }

    pub fn observer_state(&self) -> ObserverState {
        self.observer_slot.state()
    }

    /// register_observer installs `observer` for this channel.
    ///
    /// The observer is kept alive by the registry until the engine delivers
    /// `on_observer_destroyed`, or until the channel is released. Fails while
    /// another observer is registered or still unregistering.
    pub fn register_observer(&self, observer: Arc<dyn DataChannelObserver>) -> Result<ObserverToken> {
        self.handle.with(|raw| {
            let registry = observer_registry();
            let token = registry.insert(observer, Arc::downgrade(&self.observer_slot));

            if let Err(err) = self.observer_slot.begin_register(token) {
                registry.remove(token);
                return Err(err);
            }

            match self.api.register_observer(
                raw,
                token.as_context(),
                &DATA_CHANNEL_OBSERVER_FUNCTIONS,
            ) {
                Some(registration) => {
                    log::debug!("{DATA_CHANNEL_KIND}: {token:?} registered as {registration:?}");
                    Ok(token)
                }
                None => {
                    self.observer_slot.abort_register(token);
                    registry.remove(token);
                    Err(Error::ErrObserverRegistrationFailed)
                }
            }
        })?
    }

    /// unregister_observer asks the engine to drop the current observer. The
    /// slot stays `Unregistering` until the engine confirms with
    /// `on_observer_destroyed`.
    ///
    /// The engine may confirm synchronously, so the observer's terminal
    /// callback can run inside this call while the channel's handle is held.
    pub fn unregister_observer(&self) -> Result<()> {
        self.handle.with(|raw| {
            if let Some(token) = self.observer_slot.begin_unregister()? {
                log::debug!("{DATA_CHANNEL_KIND}: unregistering {token:?}");
                self.api.unregister_observer(raw);
            }
            Ok(())
        })?
    }

    /// release drops the engine reference. Only the first call reaches the
    /// engine; it returns whether this call did.
    ///
    /// A registered observer is unregistered first. If the engine never
    /// confirms its destruction, the registration is evicted here and the
    /// observer still receives `on_observer_destroyed` exactly once, after
    /// any of its callbacks still running.
    pub fn release(&self) -> bool {
        if self.observer_slot.state() == ObserverState::Registered {
            if let Err(err) = self.unregister_observer() {
                log::warn!("{DATA_CHANNEL_KIND}: unregister before release failed: {err}");
            }
        }

        let released = self.handle.release(|raw| self.api.release(raw));

        if let Some(token) = self.observer_slot.token() {
            if let Some(registration) = observer_registry().remove(token) {
                log::warn!(
                    "{DATA_CHANNEL_KIND}: engine never destroyed {token:?}, evicting on release"
                );
                bridge::retire(token, &registration);
            }
        }

        released
    }
}

impl Drop for DataChannel {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for DataChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataChannel")
            .field("handle", &self.handle)
            .field("observer_state", &self.observer_state())
            .finish()
    }
}
