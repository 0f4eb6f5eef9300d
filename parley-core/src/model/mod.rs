mod connection;
mod frame;
mod method;
mod room;
mod session;
mod signaling;

pub use connection::ConnectionId;
pub use frame::{ClientFrame, InvocationId, ServerFrame};
pub use method::{HEARTBEAT, HEARTBEAT_REPLY, JOIN_GROUP, LEAVE_GROUP};
pub use room::RoomName;
pub use session::SessionId;
pub use signaling::{
    AcceptCall, CallAction, DescriptionPayload, Hangup, IceCandidate, IceCandidatePayload,
    SdpType, SessionDescription, Signal, SignalEnvelope, SignalKind,
};
