use crate::bridge::ObserverToken;
use crate::data_channel::message::DataChannelMessage;
use shared::error::{Error, Result};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// DataChannelObserver receives events for one data channel.
///
/// Callbacks arrive on the engine's own threads, possibly concurrently with
/// calls made on the channel, and in no guaranteed order relative to them.
pub trait DataChannelObserver: Send + Sync {
    /// The channel's state changed; query it with
    /// [`DataChannel::ready_state`](super::DataChannel::ready_state).
    fn on_state_change(&self);

    /// A message arrived. The payload is already copied out of the engine.
    fn on_message(&self, message: DataChannelMessage);

    /// The amount of buffered outgoing data changed by `sent_data_size` bytes.
    fn on_buffered_amount_change(&self, _sent_data_size: u64) {}

    /// Terminal callback. No other callback follows it for this registration,
    /// and it waits for callbacks already running to return.
    ///
    /// It may run synchronously inside
    /// [`DataChannel::unregister_observer`](super::DataChannel::unregister_observer)
    /// or inside whichever callback was the last one running. It must not call
    /// the channel it was registered on: not to release it, and not to query
    /// it, since that call can deadlock against a concurrent release.
    fn on_observer_destroyed(&self) {}
}

/// ObserverState is the registration state of a channel's single observer
/// slot.
///
/// ```text
/// Unregistered → Registered → Unregistering → Unregistered
/// ```
///
/// `Registered` may also drop straight to `Unregistered` when the engine
/// destroys the observer on its own.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ObserverState {
    #[default]
    Unregistered,
    Registered,
    Unregistering,
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
enum SlotState {
    #[default]
    Unregistered,
    Registered(ObserverToken),
    Unregistering(ObserverToken),
}

#[derive(Default, Debug)]
pub(crate) struct ObserverSlot {
    state: Mutex<SlotState>,
}

impl ObserverSlot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> ObserverState {
        match *self.lock() {
            SlotState::Unregistered => ObserverState::Unregistered,
            SlotState::Registered(_) => ObserverState::Registered,
            SlotState::Unregistering(_) => ObserverState::Unregistering,
        }
    }

    pub(crate) fn token(&self) -> Option<ObserverToken> {
        match *self.lock() {
            SlotState::Unregistered => None,
            SlotState::Registered(token) | SlotState::Unregistering(token) => Some(token),
        }
    }

    pub(crate) fn begin_register(&self, token: ObserverToken) -> Result<()> {
        let mut state = self.lock();
        match *state {
            SlotState::Unregistered => {
                *state = SlotState::Registered(token);
                Ok(())
            }
            SlotState::Registered(_) => Err(Error::ErrObserverAlreadyRegistered),
            SlotState::Unregistering(_) => Err(Error::ErrObserverUnregistering),
        }
    }

    /// abort_register rolls back a registration the engine refused.
    pub(crate) fn abort_register(&self, token: ObserverToken) {
        let mut state = self.lock();
        if *state == SlotState::Registered(token) {
            *state = SlotState::Unregistered;
        }
    }

    /// begin_unregister moves a registered slot to `Unregistering` and
    /// returns its token. A slot already unregistering yields `None`.
    pub(crate) fn begin_unregister(&self) -> Result<Option<ObserverToken>> {
        let mut state = self.lock();
        match *state {
            SlotState::Registered(token) => {
                *state = SlotState::Unregistering(token);
                Ok(Some(token))
            }
            SlotState::Unregistering(_) => Ok(None),
            SlotState::Unregistered => Err(Error::ErrObserverNotRegistered),
        }
    }

    /// complete_unregister frees the slot if it still belongs to `token`.
    pub(crate) fn complete_unregister(&self, token: ObserverToken) -> bool {
        let mut state = self.lock();
        match *state {
            SlotState::Registered(current) | SlotState::Unregistering(current)
                if current == token =>
            {
                *state = SlotState::Unregistered;
                true
            }
            _ => false,
        }
    }
}
