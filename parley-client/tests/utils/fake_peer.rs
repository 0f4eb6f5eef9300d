use async_trait::async_trait;
use parley_client::{
    LegContext, LegRole, MediaError, MediaSource, MediaStream, OfferOptions, PeerConnection,
    PeerConnectionFactory, PeerError, PeerEvent,
};
use parley_core::{IceCandidate, SessionDescription, SessionId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Everything a [`FakePeer`] was asked to do.
#[derive(Debug, Clone, Default)]
pub struct PeerLog {
    pub local: Vec<SessionDescription>,
    pub remote: Vec<SessionDescription>,
    pub candidates: Vec<IceCandidate>,
    pub streams: Vec<MediaStream>,
    pub closed: bool,
}

/// Scripted peer connection. Setting a local description gathers exactly
/// one candidate; setting a remote one surfaces one remote stream.
pub struct FakePeer {
    pub session: SessionId,
    pub role: LegRole,
    events: mpsc::UnboundedSender<PeerEvent>,
    log: Mutex<PeerLog>,
}

impl FakePeer {
    pub fn log(&self) -> PeerLog {
        self.log.lock().unwrap().clone()
    }

    fn stream(&self) -> MediaStream {
        MediaStream::new(format!("{:?}-{}", self.role, self.session))
    }
}

#[async_trait]
impl PeerConnection for FakePeer {
    async fn create_offer(&self, _options: &OfferOptions) -> Result<SessionDescription, PeerError> {
        Ok(SessionDescription::offer(format!("v=0 offer {}", self.session)))
    }

    async fn create_answer(&self) -> Result<SessionDescription, PeerError> {
        if self.log.lock().unwrap().remote.is_empty() {
            return Err(PeerError::negotiation("create answer", "no remote offer"));
        }
        Ok(SessionDescription::answer(format!("v=0 answer {}", self.session)))
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError> {
        self.log.lock().unwrap().local.push(description);
        let _ = self.events.send(PeerEvent::IceCandidate {
            session: self.session,
            role: self.role,
            candidate: Some(IceCandidate {
                candidate: format!("candidate:{:?} 1 udp 1 127.0.0.1 9 typ host", self.role),
                sdp_mid: Some("0".into()),
                sdp_m_line_index: Some(0),
            }),
        });
        let _ = self.events.send(PeerEvent::IceCandidate {
            session: self.session,
            role: self.role,
            candidate: None,
        });
        Ok(())
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError> {
        self.log.lock().unwrap().remote.push(description);
        let _ = self.events.send(PeerEvent::StreamAdded {
            session: self.session,
            role: self.role,
            stream: self.stream(),
        });
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError> {
        self.log.lock().unwrap().candidates.push(candidate);
        Ok(())
    }

    async fn add_stream(&self, stream: &MediaStream) -> Result<(), PeerError> {
        self.log.lock().unwrap().streams.push(stream.clone());
        Ok(())
    }

    async fn remove_stream(&self, stream: &MediaStream) -> Result<(), PeerError> {
        self.log.lock().unwrap().streams.retain(|s| s != stream);
        Ok(())
    }

    async fn close(&self) {
        self.log.lock().unwrap().closed = true;
    }
}

#[derive(Default)]
pub struct FakePeerFactory {
    peers: Mutex<Vec<Arc<FakePeer>>>,
}

impl FakePeerFactory {
    pub fn peers(&self, role: LegRole) -> Vec<Arc<FakePeer>> {
        self.peers
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.role == role)
            .cloned()
            .collect()
    }

    pub fn find(&self, session: SessionId, role: LegRole) -> Option<Arc<FakePeer>> {
        self.peers(role).into_iter().find(|p| p.session == session)
    }
}

#[async_trait]
impl PeerConnectionFactory for FakePeerFactory {
    async fn create(&self, leg: LegContext) -> Result<Arc<dyn PeerConnection>, PeerError> {
        let peer = Arc::new(FakePeer {
            session: leg.session,
            role: leg.role,
            events: leg.events,
            log: Mutex::default(),
        });
        self.peers.lock().unwrap().push(peer.clone());
        Ok(peer as Arc<dyn PeerConnection>)
    }
}

/// Microphone stand-in; `denied()` behaves like a refused permission prompt.
pub struct FakeMedia {
    deny: AtomicBool,
}

impl FakeMedia {
    pub fn granted() -> Self {
        Self {
            deny: AtomicBool::new(false),
        }
    }

    pub fn denied() -> Self {
        Self {
            deny: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl MediaSource for FakeMedia {
    async fn acquire(&self) -> Result<MediaStream, MediaError> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(MediaError::PermissionDenied("prompt dismissed".into()));
        }
        Ok(MediaStream::new("microphone"))
    }
}
