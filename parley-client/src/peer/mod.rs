//! Seams to the WebRTC stack and the capture device.

use crate::error::{MediaError, PeerError};
use async_trait::async_trait;
use parley_core::{IceCandidate, SdpType, SessionDescription, SessionId};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Which side of a call a peer connection plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegRole {
    /// The caller's own connection; it makes the offer.
    Local,
    /// A connection created for someone else's call; it answers.
    Remote,
}

impl LegRole {
    /// Description type this leg produces, which is also how its ICE
    /// candidates are tagged on the wire.
    pub fn description_type(self) -> SdpType {
        match self {
            LegRole::Local => SdpType::Offer,
            LegRole::Remote => SdpType::Answer,
        }
    }
}

/// Opaque handle to a set of media tracks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaStream {
    pub id: String,
}

impl MediaStream {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferOptions {
    pub offer_to_receive_audio: bool,
    pub offer_to_receive_video: bool,
}

impl Default for OfferOptions {
    fn default() -> Self {
        Self {
            offer_to_receive_audio: true,
            offer_to_receive_video: false,
        }
    }
}

/// Events a peer connection raises, tagged with the leg they belong to.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// A gathered local candidate; `None` marks the end of gathering.
    IceCandidate {
        session: SessionId,
        role: LegRole,
        candidate: Option<IceCandidate>,
    },
    StreamAdded {
        session: SessionId,
        role: LegRole,
        stream: MediaStream,
    },
    StreamRemoved {
        session: SessionId,
        role: LegRole,
        stream: MediaStream,
    },
}

/// What a factory needs to build the peer connection of one leg.
#[derive(Debug, Clone)]
pub struct LegContext {
    pub session: SessionId,
    pub role: LegRole,
    pub events: mpsc::UnboundedSender<PeerEvent>,
}

#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn create_offer(&self, options: &OfferOptions) -> Result<SessionDescription, PeerError>;

    async fn create_answer(&self) -> Result<SessionDescription, PeerError>;

    async fn set_local_description(&self, description: SessionDescription)
    -> Result<(), PeerError>;

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError>;

    /// Candidates that arrive before the remote description must be
    /// buffered by the implementation.
    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError>;

    async fn add_stream(&self, stream: &MediaStream) -> Result<(), PeerError>;

    async fn remove_stream(&self, stream: &MediaStream) -> Result<(), PeerError>;

    async fn close(&self);
}

#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    async fn create(&self, leg: LegContext) -> Result<Arc<dyn PeerConnection>, PeerError>;
}

/// Local capture, typically the microphone.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn acquire(&self) -> Result<MediaStream, MediaError>;
}
