//! Per-room call session: one actor owning the local leg, the remote legs
//! keyed by their caller's session id, and the negotiation between them.

mod call_impl;
mod handle_peer_event_impl;
mod handle_signal_impl;
mod leg;
mod outbox;

pub use leg::LegPhase;

use crate::connection::{ConnectionManager, Subscription};
use crate::error::ClientError;
use crate::peer::{
    LegRole, MediaSource, MediaStream, OfferOptions, PeerConnectionFactory, PeerEvent,
};
use leg::Leg;
use outbox::Outbox;
use parley_core::{JOIN_GROUP, RoomName, SessionId, SignalEnvelope, SignalKind};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// When the caller sends its offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OfferMode {
    /// Right after announcing the call.
    #[default]
    Immediate,
    /// Once a callee answers the announcement with `AcceptCall`.
    OnAccept,
}

#[derive(Debug, Clone, Default)]
pub struct CallConfig {
    pub offer_mode: OfferMode,
    pub offer_options: OfferOptions,
}

/// What a UI layer needs to follow a call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    PhaseChanged {
        session: SessionId,
        role: LegRole,
        phase: LegPhase,
    },
    RemoteStreamAdded(MediaStream),
    RemoteStreamRemoved(MediaStream),
    LegClosed {
        session: SessionId,
        role: LegRole,
    },
}

/// Point-in-time view of a call session.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSnapshot {
    pub local: Option<(SessionId, LegPhase)>,
    pub remotes: Vec<(SessionId, LegPhase)>,
    pub remote_streams: Vec<MediaStream>,
}

impl CallSnapshot {
    pub fn remote_phase(&self, session: SessionId) -> Option<LegPhase> {
        self.remotes
            .iter()
            .find(|(s, _)| *s == session)
            .map(|(_, phase)| *phase)
    }
}

enum CallCommand {
    Call(oneshot::Sender<Result<SessionId, ClientError>>),
    Hangup {
        is_leaver: bool,
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
    Leave(oneshot::Sender<()>),
    Snapshot(oneshot::Sender<CallSnapshot>),
}

const EVENT_CAPACITY: usize = 64;
const TOMBSTONE_LIMIT: usize = 256;

/// Handle to a running call session. Cloning it gives another handle to the
/// same session; when the last one is dropped the session leaves its room.
#[derive(Clone)]
pub struct CallSessionHandle {
    room: RoomName,
    commands: mpsc::UnboundedSender<CallCommand>,
    events: broadcast::Sender<CallEvent>,
}

impl CallSessionHandle {
    pub fn room(&self) -> &RoomName {
        &self.room
    }

    /// Announces a call to the room and, depending on the offer mode,
    /// starts negotiating. Returns the new session id.
    pub async fn call(&self) -> Result<SessionId, ClientError> {
        self.request(CallCommand::Call).await?
    }

    pub async fn hangup(&self, is_leaver: bool) -> Result<(), ClientError> {
        self.request(|reply| CallCommand::Hangup { is_leaver, reply })
            .await?
    }

    /// Hangs up as leaver, leaves the room and stops the session.
    pub async fn leave(&self) -> Result<(), ClientError> {
        self.request(CallCommand::Leave).await
    }

    pub async fn snapshot(&self) -> Result<CallSnapshot, ClientError> {
        self.request(CallCommand::Snapshot).await
    }

    pub fn events(&self) -> broadcast::Receiver<CallEvent> {
        self.events.subscribe()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> CallCommand,
    ) -> Result<T, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .map_err(|_| ClientError::SessionClosed)?;
        rx.await.map_err(|_| ClientError::SessionClosed)
    }
}

pub struct CallSession {
    room: RoomName,
    config: CallConfig,
    peers: Arc<dyn PeerConnectionFactory>,
    local_stream: MediaStream,
    local: Option<Leg>,
    remotes: HashMap<SessionId, Leg>,
    remote_streams: Vec<(SessionId, MediaStream)>,
    /// Sessions that already ended, oldest first.
    ended: Vec<SessionId>,
    ended_index: HashSet<SessionId>,
    outbox: Outbox,
    commands: mpsc::UnboundedReceiver<CallCommand>,
    signals: mpsc::UnboundedReceiver<SignalEnvelope>,
    peer_events: mpsc::UnboundedReceiver<PeerEvent>,
    peer_events_tx: mpsc::UnboundedSender<PeerEvent>,
    events: broadcast::Sender<CallEvent>,
    listener: JoinHandle<()>,
}

impl CallSession {
    /// Acquires local media, subscribes to the room's call-control events,
    /// joins the room and starts the session actor.
    pub async fn join(
        connection: ConnectionManager,
        room: RoomName,
        media: &dyn MediaSource,
        peers: Arc<dyn PeerConnectionFactory>,
        config: CallConfig,
    ) -> Result<CallSessionHandle, ClientError> {
        let local_stream = media.acquire().await.map_err(|e| {
            warn!("Media acquisition for room {} failed: {}", room, e);
            ClientError::PermissionDenied(e.user_message())
        })?;

        let (signals_tx, signals) = mpsc::unbounded_channel();
        let events: Vec<&str> = SignalKind::ALL.iter().map(|k| k.event_name()).collect();
        let subscription = connection.subscribe_all(&events);
        let listener = tokio::spawn(forward(subscription, room.clone(), signals_tx));

        if let Err(e) = connection
            .invoke(JOIN_GROUP, vec![Value::from(room.as_str())])
            .await
        {
            warn!("Joining room {} failed: {}", room, e);
            listener.abort();
            return Err(e);
        }
        info!("Joined room {}", room);

        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (peer_events_tx, peer_events) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let session = CallSession {
            room: room.clone(),
            config,
            peers,
            local_stream,
            local: None,
            remotes: HashMap::new(),
            remote_streams: Vec::new(),
            ended: Vec::new(),
            ended_index: HashSet::new(),
            outbox: Outbox::spawn(connection),
            commands,
            signals,
            peer_events,
            peer_events_tx,
            events: events.clone(),
            listener,
        };
        tokio::spawn(session.run());

        Ok(CallSessionHandle {
            room,
            commands: commands_tx,
            events,
        })
    }

    async fn run(mut self) {
        info!("Call session for room {} started", self.room);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(CallCommand::Leave(reply)) => {
                        self.leave().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!("All handles for room {} dropped", self.room);
                        self.leave().await;
                        break;
                    }
                },
                Some(envelope) = self.signals.recv() => self.handle_signal(envelope).await,
                Some(event) = self.peer_events.recv() => self.handle_peer_event(event).await,
            }
        }

        self.listener.abort();
        info!("Call session for room {} stopped", self.room);
    }

    async fn handle_command(&mut self, command: CallCommand) {
        match command {
            CallCommand::Call(reply) => {
                let _ = reply.send(self.call().await);
            }
            CallCommand::Hangup { is_leaver, reply } => {
                let _ = reply.send(self.hangup(is_leaver).await);
            }
            CallCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            CallCommand::Leave(_) => {}
        }
    }

    fn snapshot(&self) -> CallSnapshot {
        let mut remotes: Vec<_> = self
            .remotes
            .values()
            .map(|leg| (leg.session, leg.phase))
            .collect();
        remotes.sort_by_key(|(session, _)| session.0);
        CallSnapshot {
            local: self.local.as_ref().map(|leg| (leg.session, leg.phase)),
            remotes,
            remote_streams: self.remote_streams.iter().map(|(_, s)| s.clone()).collect(),
        }
    }

    fn emit(&self, event: CallEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn is_ended(&self, session: &SessionId) -> bool {
        self.ended_index.contains(session)
    }

    fn tombstone(&mut self, session: SessionId) {
        if !self.ended_index.insert(session) {
            return;
        }
        self.ended.push(session);
        if self.ended.len() > TOMBSTONE_LIMIT {
            let oldest = self.ended.remove(0);
            self.ended_index.remove(&oldest);
        }
    }
}

/// Feeds the room's call-control events into the session, keeping only
/// envelopes for `room`.
async fn forward(
    mut subscription: Subscription,
    room: RoomName,
    signals: mpsc::UnboundedSender<SignalEnvelope>,
) {
    while let Some((event, args)) = subscription.recv_event().await {
        match SignalEnvelope::from_event(&event, &args) {
            Ok(envelope) if envelope.room == room => {
                if signals.send(envelope).is_err() {
                    break;
                }
            }
            Ok(envelope) => debug!(
                "Ignoring {:?} for room {} in session for {}",
                envelope.kind(),
                envelope.room,
                room
            ),
            Err(e) => debug!("Dropping malformed `{}`: {}", event, e),
        }
    }
}
