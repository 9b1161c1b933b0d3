use std::fmt;

/// DataChannelState indicates the state of a data channel as reported by the
/// native engine.
///
/// The engine owns the numbering; codes outside the known range map to
/// `Unspecified` rather than being guessed at.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataChannelState {
    #[default]
    Unspecified,

    /// The user agent is attempting to establish the underlying data
    /// transport. This is the initial state of a channel.
    Connecting,

    /// The underlying data transport is established and communication is
    /// possible.
    Open,

    /// The procedure to close down the underlying data transport has started.
    Closing,

    /// The underlying data transport has been closed or could not be
    /// established.
    Closed,
}

const DATA_CHANNEL_STATE_UNSPECIFIED_STR: &str = "Unspecified";
const DATA_CHANNEL_STATE_CONNECTING_STR: &str = "connecting";
const DATA_CHANNEL_STATE_OPEN_STR: &str = "open";
const DATA_CHANNEL_STATE_CLOSING_STR: &str = "closing";
const DATA_CHANNEL_STATE_CLOSED_STR: &str = "closed";

impl From<i32> for DataChannelState {
    fn from(v: i32) -> Self {
        match v {
            0 => DataChannelState::Connecting,
            1 => DataChannelState::Open,
            2 => DataChannelState::Closing,
            3 => DataChannelState::Closed,
            _ => DataChannelState::Unspecified,
        }
    }
}

impl From<&str> for DataChannelState {
    fn from(raw: &str) -> Self {
        match raw {
            DATA_CHANNEL_STATE_CONNECTING_STR => DataChannelState::Connecting,
            DATA_CHANNEL_STATE_OPEN_STR => DataChannelState::Open,
            DATA_CHANNEL_STATE_CLOSING_STR => DataChannelState::Closing,
            DATA_CHANNEL_STATE_CLOSED_STR => DataChannelState::Closed,
            _ => DataChannelState::Unspecified,
        }
    }
}

impl fmt::Display for DataChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            DataChannelState::Connecting => DATA_CHANNEL_STATE_CONNECTING_STR,
            DataChannelState::Open => DATA_CHANNEL_STATE_OPEN_STR,
            DataChannelState::Closing => DATA_CHANNEL_STATE_CLOSING_STR,
            DataChannelState::Closed => DATA_CHANNEL_STATE_CLOSED_STR,
            DataChannelState::Unspecified => DATA_CHANNEL_STATE_UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}
