//! Supervised hub connection: connect state, event subscriptions with
//! last-value replay, deduplicated invocations and the heartbeat that
//! rebuilds the transport when it goes stale.

mod connect_impl;
mod heartbeat_impl;
mod invocation;
mod invoke_impl;
mod subscription;

pub use subscription::Subscription;

use crate::sync::lock;
use crate::transport::{Transport, TransportFactory};
use invocation::PendingInvocations;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use subscription::{ListenerId, SubscriptionRegistry};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Period of the liveness check that also drives reconnects.
    pub heartbeat_interval: Duration,
    /// How long an invocation may wait for `Connected`; `None` waits forever.
    pub invoke_timeout: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            invoke_timeout: None,
        }
    }
}

/// The transport currently in use. `generation` goes up on every rebuild so
/// close notifications from replaced transports can be told apart.
struct TransportSlot {
    transport: Arc<dyn Transport>,
    generation: u64,
}

struct HeartbeatLoop {
    id: u64,
    task: JoinHandle<()>,
}

pub(crate) struct ConnectionInner {
    factory: Arc<dyn TransportFactory>,
    config: ConnectionConfig,
    state: watch::Sender<ConnectState>,
    slot: Mutex<TransportSlot>,
    subscriptions: Mutex<SubscriptionRegistry>,
    pending: Mutex<PendingInvocations>,
    heartbeat: Mutex<Option<HeartbeatLoop>>,
    heartbeat_ids: AtomicU64,
    last_update: Mutex<Option<Instant>>,
    disposed: AtomicBool,
}

impl ConnectionInner {
    /// Entry point for every inbound event the transport hands us.
    fn publish(&self, name: &str, args: Vec<Value>) {
        *lock(&self.last_update) = Some(Instant::now());
        let reached = lock(&self.subscriptions).publish(name, args);
        debug!("Event `{}` delivered to {} listener(s)", name, reached);
    }

    /// Called when a [`Subscription`] is dropped.
    pub(crate) fn release(&self, name: &str, id: ListenerId) {
        let remaining = {
            let mut registry = lock(&self.subscriptions);
            if registry.remove(name, id) > 0 {
                return;
            }
            registry.disarm(name)
        };
        if remaining == 0 {
            debug!("Last listener for `{}` gone, disarming", name);
            self.transport().off_message(name);
        }
    }

    fn transport(&self) -> Arc<dyn Transport> {
        lock(&self.slot).transport.clone()
    }

    fn generation(&self) -> u64 {
        lock(&self.slot).generation
    }
}

/// Client side of the hub connection. Cheap to clone; every clone drives
/// the same connection.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ConnectionInner>,
}

impl ConnectionManager {
    /// Builds the manager around a first transport. No I/O happens until
    /// [`start`](Self::start), [`connect`](Self::connect) or an invocation.
    pub fn new(factory: Arc<dyn TransportFactory>, config: ConnectionConfig) -> Self {
        let transport = factory.create();
        let (state, _) = watch::channel(ConnectState::Disconnected);
        let manager = Self {
            inner: Arc::new(ConnectionInner {
                factory,
                config,
                state,
                slot: Mutex::new(TransportSlot {
                    transport: transport.clone(),
                    generation: 0,
                }),
                subscriptions: Mutex::default(),
                pending: Mutex::default(),
                heartbeat: Mutex::new(None),
                heartbeat_ids: AtomicU64::new(0),
                last_update: Mutex::new(None),
                disposed: AtomicBool::new(false),
            }),
        };
        manager.watch_close(&transport, 0);
        manager
    }

    /// Arms the heartbeat listener (its priming invocation opens the
    /// connection) and starts the heartbeat loop.
    pub fn start(&self) {
        let mut replies = self.subscribe(parley_core::HEARTBEAT);
        tokio::spawn(async move {
            while let Some(args) = replies.recv().await {
                debug!("Heartbeat reply: {:?}", args);
            }
        });
        self.start_heartbeat();
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    pub fn state(&self) -> ConnectState {
        *self.inner.state.borrow()
    }

    /// Current state followed by every transition.
    pub fn state_stream(&self) -> watch::Receiver<ConnectState> {
        self.inner.state.subscribe()
    }

    /// When the last inbound event arrived on any subscription.
    pub fn last_update(&self) -> Option<Instant> {
        *lock(&self.inner.last_update)
    }

    pub fn connection_id(&self) -> Option<parley_core::ConnectionId> {
        self.inner.transport().connection_id()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Subscribes to a hub event. The first subscriber for a name arms the
    /// transport listener and sends a one-off priming invocation of the
    /// same name.
    pub fn subscribe(&self, event: &str) -> Subscription {
        self.subscribe_all(&[event])
    }

    /// One subscription over several events, delivered in arrival order.
    pub fn subscribe_all(&self, events: &[&str]) -> Subscription {
        let added = lock(&self.inner.subscriptions).add(events);
        for name in added.first {
            self.arm(&name);
            let this = self.clone();
            tokio::spawn(async move {
                if let Err(e) = this.invoke(&name, Vec::new()).await {
                    debug!("Priming invocation `{}` failed: {}", name, e);
                }
            });
        }
        Subscription::new(
            events.iter().map(|name| name.to_string()).collect(),
            added.id,
            added.rx,
            Arc::downgrade(&self.inner),
        )
    }

    /// Disarms `event` if nobody listens to it any more. With observers
    /// left the listener stays and `StillInUse` comes back.
    pub fn unsubscribe(&self, event: &str) -> Result<(), crate::ClientError> {
        let remaining = lock(&self.inner.subscriptions).disarm(event);
        if remaining > 0 {
            warn!("Cannot unsubscribe `{}`: still in use", event);
            return Err(crate::ClientError::StillInUse(event.to_string()));
        }
        self.inner.transport().off_message(event);
        Ok(())
    }

    /// Points the current transport's listener for `event` at the registry.
    fn arm(&self, event: &str) {
        let weak = Arc::downgrade(&self.inner);
        let name = event.to_string();
        self.inner.transport().on_message(
            event,
            Arc::new(move |args| {
                if let Some(inner) = weak.upgrade() {
                    inner.publish(&name, args);
                }
            }),
        );
    }
}
