use crate::call::leg::{Leg, LegPhase};
use crate::call::{CallEvent, CallSession, OfferMode};
use crate::error::{ClientError, PeerError};
use crate::peer::{LegContext, LegRole};
use parley_core::{
    CallAction, DescriptionPayload, Hangup, SessionId, Signal, SignalEnvelope,
};
use tracing::{debug, error, info, warn};

impl CallSession {
    /// Creates the local leg, announces it and, in immediate mode, offers.
    pub(super) async fn call(&mut self) -> Result<SessionId, ClientError> {
        if self.local.is_some() {
            return Err(ClientError::AlreadyCalling(self.room.clone()));
        }

        let session = SessionId::new();
        let leg = self.create_leg(session, LegRole::Local).await?;
        self.local = Some(leg);
        info!("Calling room {} with session {}", self.room, session);

        self.advance(session, LegRole::Local, LegPhase::Calling);
        self.send(Signal::Call(CallAction {
            session,
            is_caller: true,
        }));

        if self.config.offer_mode == OfferMode::Immediate {
            self.send_offer().await;
        }
        Ok(session)
    }

    /// Creates and sends the offer of the local leg.
    pub(super) async fn send_offer(&mut self) {
        let Some(leg) = self.local.as_ref() else {
            return;
        };
        let (session, pc) = (leg.session, leg.pc.clone());

        let offer = match pc.create_offer(&self.config.offer_options).await {
            Ok(offer) => offer,
            Err(e) => return self.negotiation_failed(session, LegRole::Local, e),
        };
        if let Err(e) = pc.set_local_description(offer.clone()).await {
            return self.negotiation_failed(session, LegRole::Local, e);
        }

        self.send(Signal::Offer(DescriptionPayload {
            session,
            description: offer,
        }));
        self.advance(session, LegRole::Local, LegPhase::Negotiating);
    }

    /// Detaches local media, closes the local leg and tells the room. A
    /// leaver also drops every remote leg.
    pub(super) async fn hangup(&mut self, is_leaver: bool) -> Result<(), ClientError> {
        let session = self.local.as_ref().map(|leg| leg.session);
        if session.is_none() && !is_leaver {
            return Err(ClientError::NotCalling(self.room.clone()));
        }

        self.close_local().await;
        if is_leaver {
            let sessions: Vec<SessionId> = self.remotes.keys().copied().collect();
            for session in sessions {
                self.close_remote(session).await;
            }
        }

        self.send(Signal::Hangup(Hangup { is_leaver, session }));
        info!(
            "Hung up in room {} (leaver: {}, session: {:?})",
            self.room,
            is_leaver,
            session.map(|s| s.to_string())
        );
        Ok(())
    }

    pub(super) async fn leave(&mut self) {
        if let Err(e) = self.hangup(true).await {
            debug!("Hangup while leaving {}: {}", self.room, e);
        }
        self.outbox.leave_group(&self.room);
        info!("Left room {}", self.room);
    }

    /// Builds a peer connection for one leg and attaches the local stream.
    pub(super) async fn create_leg(
        &self,
        session: SessionId,
        role: LegRole,
    ) -> Result<Leg, PeerError> {
        let pc = self
            .peers
            .create(LegContext {
                session,
                role,
                events: self.peer_events_tx.clone(),
            })
            .await
            .map_err(|e| {
                error!("Could not create {:?} peer connection for {}: {}", role, session, e);
                e
            })?;

        if let Err(e) = pc.add_stream(&self.local_stream).await {
            warn!("Attaching local media to {:?} leg {} failed: {}", role, session, e);
        }
        Ok(Leg::new(session, role, pc))
    }

    pub(super) async fn close_local(&mut self) {
        let Some(leg) = self.local.take() else {
            return;
        };
        if let Err(e) = leg.pc.remove_stream(&self.local_stream).await {
            debug!("Detaching local media from {} failed: {}", leg, e);
        }
        leg.pc.close().await;
        self.tombstone(leg.session);
        self.forget_streams(leg.session);
        debug!("Closed {}", leg);
        self.emit(CallEvent::LegClosed {
            session: leg.session,
            role: LegRole::Local,
        });
    }

    pub(super) async fn close_remote(&mut self, session: SessionId) {
        let Some(leg) = self.remotes.remove(&session) else {
            return;
        };
        leg.pc.close().await;
        self.tombstone(session);
        self.forget_streams(session);
        debug!("Closed {}", leg);
        self.emit(CallEvent::LegClosed {
            session,
            role: LegRole::Remote,
        });
    }

    /// Moves a leg to `next` if that is a valid step; otherwise logs and
    /// leaves it alone. Returns whether the leg moved.
    pub(super) fn advance(&mut self, session: SessionId, role: LegRole, next: LegPhase) -> bool {
        let leg = match role {
            LegRole::Local => self.local.as_mut().filter(|leg| leg.session == session),
            LegRole::Remote => self.remotes.get_mut(&session),
        };
        let Some(leg) = leg else {
            return false;
        };
        if !leg.phase.can_advance(role, next) {
            debug!("Ignoring {:?} → {:?} for {}", leg.phase, next, leg);
            return false;
        }
        leg.phase = next;
        debug!("{} entered {:?}", leg, next);
        self.emit(CallEvent::PhaseChanged {
            session,
            role,
            phase: next,
        });
        true
    }

    pub(super) fn negotiation_failed(&self, session: SessionId, role: LegRole, err: PeerError) {
        let phase = match role {
            LegRole::Local => self.local.as_ref().map(|leg| leg.phase),
            LegRole::Remote => self.remotes.get(&session).map(|leg| leg.phase),
        };
        error!(
            "Negotiation failed on {:?} leg {} in phase {:?}: {}",
            role, session, phase, err
        );
    }

    pub(super) fn send(&self, signal: Signal) {
        self.outbox
            .signal(SignalEnvelope::new(self.room.clone(), signal));
    }

    pub(super) fn forget_streams(&mut self, session: SessionId) {
        let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.remote_streams)
            .into_iter()
            .partition(|(s, _)| *s == session);
        self.remote_streams = kept;
        for (_, stream) in gone {
            self.emit(CallEvent::RemoteStreamRemoved(stream));
        }
    }
}
