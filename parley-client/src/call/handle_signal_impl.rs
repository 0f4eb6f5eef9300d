use crate::call::leg::LegPhase;
use crate::call::{CallEvent, CallSession};
use crate::peer::LegRole;
use parley_core::{
    AcceptCall, CallAction, DescriptionPayload, Hangup, IceCandidatePayload, SdpType, Signal,
    SignalEnvelope,
};
use tracing::{debug, info, warn};

impl CallSession {
    pub(super) async fn handle_signal(&mut self, envelope: SignalEnvelope) {
        if let Some(session) = envelope.signal.session() {
            if self.is_ended(&session) && !matches!(envelope.signal, Signal::Hangup(_)) {
                debug!("Dropping {:?} for ended session {}", envelope.kind(), session);
                return;
            }
        }

        match envelope.signal {
            Signal::Call(call) => self.on_call(call).await,
            Signal::AcceptCall(accept) => self.on_accept_call(accept).await,
            Signal::Offer(offer) => self.on_offer(offer).await,
            Signal::Answer(answer) => self.on_answer(answer).await,
            Signal::IceCandidate(candidate) => self.on_ice_candidate(candidate).await,
            Signal::Hangup(hangup) => self.on_hangup(hangup).await,
        }
    }

    /// Someone in the room is calling: prepare a fresh remote leg for them.
    async fn on_call(&mut self, call: CallAction) {
        if let Some(previous) = self.remotes.get(&call.session) {
            warn!("Call {} repeated, replacing {}", call.session, previous);
            self.replace_remote(call.session).await;
        }

        match self.create_leg(call.session, LegRole::Remote).await {
            Ok(leg) => {
                info!("Incoming call {} in room {}", call.session, self.room);
                self.remotes.insert(call.session, leg);
                self.emit(CallEvent::PhaseChanged {
                    session: call.session,
                    role: LegRole::Remote,
                    phase: LegPhase::Idle,
                });
            }
            Err(_) => return,
        }

        if self.config.offer_mode == crate::call::OfferMode::OnAccept {
            self.send(Signal::AcceptCall(AcceptCall {
                session: call.session,
                is_callee: true,
            }));
        }
    }

    async fn on_accept_call(&mut self, accept: AcceptCall) {
        match self.local.as_ref() {
            Some(leg) if leg.session == accept.session && leg.phase == LegPhase::Calling => {
                debug!("Call {} accepted, offering", accept.session);
                self.send_offer().await;
            }
            _ => debug!("Ignoring AcceptCall for {}", accept.session),
        }
    }

    async fn on_offer(&mut self, offer: DescriptionPayload) {
        let session = offer.session;
        if !self.remotes.contains_key(&session) {
            match self.create_leg(session, LegRole::Remote).await {
                Ok(leg) => {
                    self.remotes.insert(session, leg);
                }
                Err(_) => return,
            }
        }
        let Some(leg) = self.remotes.get(&session) else {
            return;
        };
        if leg.phase == LegPhase::Negotiating {
            debug!("Offer for {} while negotiating, ignoring", leg);
            return;
        }
        let pc = leg.pc.clone();

        self.advance(session, LegRole::Remote, LegPhase::Offered);
        if let Err(e) = pc.set_remote_description(offer.description).await {
            return self.negotiation_failed(session, LegRole::Remote, e);
        }
        self.advance(session, LegRole::Remote, LegPhase::Negotiating);

        let answer = match pc.create_answer().await {
            Ok(answer) => answer,
            Err(e) => return self.negotiation_failed(session, LegRole::Remote, e),
        };
        if let Err(e) = pc.set_local_description(answer.clone()).await {
            return self.negotiation_failed(session, LegRole::Remote, e);
        }

        self.send(Signal::Answer(DescriptionPayload {
            session,
            description: answer,
        }));
        self.advance(session, LegRole::Remote, LegPhase::Active);
    }

    /// Only the answer to our own offer counts; answers other callees sent
    /// to other callers pass through the room too.
    async fn on_answer(&mut self, answer: DescriptionPayload) {
        let Some(leg) = self.local.as_ref() else {
            debug!("Answer for {} but not calling", answer.session);
            return;
        };
        if leg.session != answer.session {
            debug!("Answer for {} is not for {}", answer.session, leg);
            return;
        }
        if leg.phase != LegPhase::Negotiating {
            debug!("Answer for {} ignored in phase {:?}", leg, leg.phase);
            return;
        }
        let pc = leg.pc.clone();

        if let Err(e) = pc.set_remote_description(answer.description).await {
            return self.negotiation_failed(answer.session, LegRole::Local, e);
        }
        self.advance(answer.session, LegRole::Local, LegPhase::Active);
    }

    async fn on_ice_candidate(&mut self, payload: IceCandidatePayload) {
        let (leg, role) = match payload.origin {
            // Gathered by a caller: meant for the leg answering that call.
            SdpType::Offer => (self.remotes.get(&payload.session), LegRole::Remote),
            // Gathered by a callee: meant for the caller's own leg.
            SdpType::Answer => (
                self.local.as_ref().filter(|leg| leg.session == payload.session),
                LegRole::Local,
            ),
            other => {
                debug!("Candidate with description type {:?} dropped", other);
                return;
            }
        };
        let Some(leg) = leg else {
            debug!("No {:?} leg for candidate of {}", role, payload.session);
            return;
        };
        let pc = leg.pc.clone();

        if let Err(e) = pc.add_ice_candidate(payload.ice_candidate).await {
            self.negotiation_failed(payload.session, role, e);
        }
    }

    async fn on_hangup(&mut self, hangup: Hangup) {
        if let Some(session) = hangup.session {
            if self.remotes.contains_key(&session) {
                info!("Call {} hung up", session);
                self.close_remote(session).await;
            }
        }
        if hangup.is_leaver {
            self.close_local().await;
        }
    }

    /// Closes a remote leg that is about to be rebuilt, without
    /// tombstoning its session.
    async fn replace_remote(&mut self, session: parley_core::SessionId) {
        if let Some(leg) = self.remotes.remove(&session) {
            leg.pc.close().await;
            self.forget_streams(session);
            self.emit(CallEvent::LegClosed {
                session,
                role: LegRole::Remote,
            });
        }
    }
}
