use crate::ProtocolError;
use crate::model::room::RoomName;
use crate::model::session::SessionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Call-control message kinds the relay fans out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Call,
    AcceptCall,
    Offer,
    Answer,
    IceCandidate,
    Hangup,
}

impl SignalKind {
    pub const ALL: [SignalKind; 6] = [
        SignalKind::Call,
        SignalKind::AcceptCall,
        SignalKind::Offer,
        SignalKind::Answer,
        SignalKind::IceCandidate,
        SignalKind::Hangup,
    ];

    /// Hub method a sender invokes.
    pub fn invoke_method(self) -> &'static str {
        match self {
            SignalKind::Call => "CallAction",
            SignalKind::AcceptCall => "AcceptCall",
            SignalKind::Offer => "CreatedOffer",
            SignalKind::Answer => "CreatedAnswer",
            SignalKind::IceCandidate => "IceCandidate",
            SignalKind::Hangup => "HangupAction",
        }
    }

    /// Event name recipients receive.
    pub fn event_name(self) -> &'static str {
        match self {
            SignalKind::Call => "OnCallAction",
            SignalKind::AcceptCall => "OnAcceptCall",
            SignalKind::Offer => "OnCreatedOffer",
            SignalKind::Answer => "OnCreatedAnswer",
            SignalKind::IceCandidate => "OnIceCandidate",
            SignalKind::Hangup => "OnHangupAction",
        }
    }

    pub fn from_invoke_method(method: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.invoke_method() == method)
    }

    pub fn from_event_name(event: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.event_name() == event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Same shape as the browser's `RTCIceCandidateInit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAction {
    pub session: SessionId,
    pub is_caller: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptCall {
    pub session: SessionId,
    pub is_callee: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionPayload {
    pub session: SessionId,
    pub description: SessionDescription,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidatePayload {
    /// Description type of the peer connection that gathered the candidate:
    /// `offer` comes from a caller leg, `answer` from a callee leg.
    #[serde(rename = "type")]
    pub origin: SdpType,
    pub session: SessionId,
    pub ice_candidate: IceCandidate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hangup {
    pub is_leaver: bool,
    #[serde(default)]
    pub session: Option<SessionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Call(CallAction),
    AcceptCall(AcceptCall),
    Offer(DescriptionPayload),
    Answer(DescriptionPayload),
    IceCandidate(IceCandidatePayload),
    Hangup(Hangup),
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::Call(_) => SignalKind::Call,
            Signal::AcceptCall(_) => SignalKind::AcceptCall,
            Signal::Offer(_) => SignalKind::Offer,
            Signal::Answer(_) => SignalKind::Answer,
            Signal::IceCandidate(_) => SignalKind::IceCandidate,
            Signal::Hangup(_) => SignalKind::Hangup,
        }
    }

    pub fn session(&self) -> Option<SessionId> {
        match self {
            Signal::Call(p) => Some(p.session),
            Signal::AcceptCall(p) => Some(p.session),
            Signal::Offer(p) | Signal::Answer(p) => Some(p.session),
            Signal::IceCandidate(p) => Some(p.session),
            Signal::Hangup(p) => p.session,
        }
    }

    fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Signal::Call(p) => serde_json::to_value(p),
            Signal::AcceptCall(p) => serde_json::to_value(p),
            Signal::Offer(p) | Signal::Answer(p) => serde_json::to_value(p),
            Signal::IceCandidate(p) => serde_json::to_value(p),
            Signal::Hangup(p) => serde_json::to_value(p),
        }
    }

    fn from_value(kind: SignalKind, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            SignalKind::Call => Signal::Call(serde_json::from_value(value)?),
            SignalKind::AcceptCall => Signal::AcceptCall(serde_json::from_value(value)?),
            SignalKind::Offer => Signal::Offer(serde_json::from_value(value)?),
            SignalKind::Answer => Signal::Answer(serde_json::from_value(value)?),
            SignalKind::IceCandidate => Signal::IceCandidate(serde_json::from_value(value)?),
            SignalKind::Hangup => Signal::Hangup(serde_json::from_value(value)?),
        })
    }
}

/// `{ kind, room, payload }` as carried by invocations (`[room, payload]`)
/// and by the events the relay broadcasts (same argument layout).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalEnvelope {
    pub room: RoomName,
    pub signal: Signal,
}

impl SignalEnvelope {
    pub fn new(room: RoomName, signal: Signal) -> Self {
        Self { room, signal }
    }

    pub fn kind(&self) -> SignalKind {
        self.signal.kind()
    }

    /// Method name and arguments to hand to the hub.
    pub fn to_invocation(&self) -> Result<(&'static str, Vec<Value>), ProtocolError> {
        let method = self.kind().invoke_method();
        let payload = self.signal.to_value().map_err(|source| ProtocolError::Payload {
            method: method.to_string(),
            source,
        })?;
        Ok((method, vec![Value::String(self.room.to_string()), payload]))
    }

    /// Parse the arguments of a broadcast event.
    pub fn from_event(event: &str, args: &[Value]) -> Result<Self, ProtocolError> {
        let kind = SignalKind::from_event_name(event)
            .ok_or_else(|| ProtocolError::UnknownMethod(event.to_string()))?;
        Self::parse(kind, event, args)
    }

    fn parse(kind: SignalKind, method: &str, args: &[Value]) -> Result<Self, ProtocolError> {
        let [room, payload] = args else {
            return Err(ProtocolError::Arity {
                method: method.to_string(),
                expected: 2,
                actual: args.len(),
            });
        };
        let room = RoomName::try_from(room)?;
        let signal =
            Signal::from_value(kind, payload.clone()).map_err(|source| ProtocolError::Payload {
                method: method.to_string(),
                source,
            })?;
        Ok(Self { room, signal })
    }
}
