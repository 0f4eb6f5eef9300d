//! Client side of the parley relay: a supervised hub connection and the
//! per-room call sessions negotiated over it.

pub mod call;
pub mod connection;
mod error;
pub mod peer;
pub mod rtc;
mod sync;
pub mod transport;

pub use call::{
    CallConfig, CallEvent, CallSession, CallSessionHandle, CallSnapshot, LegPhase, OfferMode,
};
pub use connection::{ConnectState, ConnectionConfig, ConnectionManager, Subscription};
pub use error::{ClientError, MediaError, PeerError, TransportError};
pub use peer::{
    LegContext, LegRole, MediaSource, MediaStream, OfferOptions, PeerConnection,
    PeerConnectionFactory, PeerEvent,
};
pub use rtc::{RtcConfig, RtcPeerFactory};
pub use transport::{Transport, TransportFactory, WsTransport, WsTransportFactory};

#[cfg(feature = "loopback")]
pub use transport::{LoopbackFactory, LoopbackTransport};
