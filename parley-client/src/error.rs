use parley_core::RoomName;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("failed to open hub connection: {0}")]
    Connect(String),

    #[error("transport is not connected")]
    NotConnected,

    #[error("transport closed")]
    Closed,

    #[error("socket error: {0}")]
    Socket(String),

    #[error("hub rejected invocation: {0}")]
    Remote(String),

    #[error("failed to encode frame: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Error)]
pub enum PeerError {
    #[error("peer connection setup failed: {0}")]
    Setup(String),

    #[error("{operation} failed: {message}")]
    Negotiation {
        operation: &'static str,
        message: String,
    },

    #[error("peer connection closed")]
    Closed,
}

impl PeerError {
    pub fn negotiation(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Negotiation {
            operation,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum MediaError {
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("no capture device available: {0}")]
    Unavailable(String),
}

impl MediaError {
    /// Message suitable for showing to the person at the keyboard.
    pub fn user_message(&self) -> String {
        match self {
            MediaError::PermissionDenied(_) => {
                "You must allow the application to access your microphone".to_string()
            }
            MediaError::Unavailable(_) => "No microphone was found on this device".to_string(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("`{0}` still has active observers")]
    StillInUse(String),

    #[error("invocation `{0}` timed out waiting for a connection")]
    Timeout(String),

    #[error("connection manager disposed")]
    Disposed,

    #[error("{0}")]
    PermissionDenied(String),

    #[error("a call is already in progress in room {0}")]
    AlreadyCalling(RoomName),

    #[error("no call in progress in room {0}")]
    NotCalling(RoomName),

    #[error("invalid envelope: {0}")]
    Protocol(String),

    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error("call session has stopped")]
    SessionClosed,
}
