use crate::call::{CallEvent, CallSession};
use crate::peer::{LegRole, PeerEvent};
use parley_core::{IceCandidatePayload, Signal};
use tracing::debug;

impl CallSession {
    pub(super) async fn handle_peer_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::IceCandidate {
                session,
                role,
                candidate: Some(candidate),
            } => {
                let known = match role {
                    LegRole::Local => self.local.as_ref().is_some_and(|leg| leg.session == session),
                    LegRole::Remote => self.remotes.contains_key(&session),
                };
                if !known {
                    debug!("Candidate from closed {:?} leg {} dropped", role, session);
                    return;
                }
                self.send(Signal::IceCandidate(IceCandidatePayload {
                    origin: role.description_type(),
                    session,
                    ice_candidate: candidate,
                }));
            }
            PeerEvent::IceCandidate {
                session,
                candidate: None,
                ..
            } => debug!("Candidate gathering finished for {}", session),
            PeerEvent::StreamAdded {
                session, stream, ..
            } => {
                if self.remote_streams.iter().any(|(_, s)| *s == stream) {
                    return;
                }
                debug!("Remote stream {} added on {}", stream.id, session);
                self.remote_streams.push((session, stream.clone()));
                self.emit(CallEvent::RemoteStreamAdded(stream));
            }
            PeerEvent::StreamRemoved { stream, .. } => {
                let before = self.remote_streams.len();
                self.remote_streams.retain(|(_, s)| *s != stream);
                if self.remote_streams.len() != before {
                    self.emit(CallEvent::RemoteStreamRemoved(stream));
                }
            }
        }
    }
}
