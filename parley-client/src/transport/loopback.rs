use crate::error::TransportError;
use crate::sync::lock;
use crate::transport::{CloseHandler, MessageHandler, Transport, TransportFactory};
use async_trait::async_trait;
use parley_core::{ConnectionId, ServerFrame};
use parley_server::Hub;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

struct Session {
    connection_id: ConnectionId,
    pump: JoinHandle<()>,
}

#[derive(Default)]
struct Shared {
    session: Mutex<Option<Session>>,
    handlers: Mutex<HashMap<String, MessageHandler>>,
    close_handler: Mutex<Option<CloseHandler>>,
}

impl Shared {
    fn dispatch(&self, frame: ServerFrame) {
        let ServerFrame::Event { method, args } = frame else {
            return;
        };
        let handler = lock(&self.handlers).get(&method).cloned();
        match handler {
            Some(handler) => handler(args),
            None => debug!("No handler for event `{}`", method),
        }
    }
}

/// In-process hub session: invocations go straight to a [`Hub`] and its
/// broadcasts come back through the connection's outbound queue.
pub struct LoopbackTransport {
    hub: Hub,
    available: Arc<AtomicBool>,
    sent: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
    shared: Arc<Shared>,
}

impl LoopbackTransport {
    pub fn new(hub: Hub) -> Self {
        Self {
            hub,
            available: Arc::new(AtomicBool::new(true)),
            sent: Arc::default(),
            shared: Arc::new(Shared::default()),
        }
    }

    /// Drops the session as if the network went away: the hub forgets the
    /// connection and the close handler fires with an error.
    pub fn sever(&self) {
        self.end_session(Some(TransportError::Socket("connection severed".into())));
    }

    pub fn is_open(&self) -> bool {
        lock(&self.shared.session).is_some()
    }

    fn end_session(&self, reason: Option<TransportError>) {
        let Some(session) = lock(&self.shared.session).take() else {
            return;
        };
        session.pump.abort();
        self.hub.router().disconnect(&session.connection_id);
        info!("Loopback session {} ended", session.connection_id);

        let handler = lock(&self.shared.close_handler).clone();
        if let Some(handler) = handler {
            handler(reason);
        }
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn open(&self) -> Result<(), TransportError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(TransportError::Connect("loopback hub unavailable".into()));
        }
        let mut session = lock(&self.shared.session);
        if session.is_some() {
            return Ok(());
        }

        let connection_id = ConnectionId::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();
        self.hub.router().register(connection_id, tx);

        let shared = self.shared.clone();
        let pump = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                shared.dispatch(frame);
            }
        });

        *session = Some(Session {
            connection_id,
            pump,
        });
        debug!("Loopback session {} open", connection_id);
        Ok(())
    }

    async fn close(&self) {
        self.end_session(None);
    }

    async fn send(&self, method: &str, args: Vec<Value>) -> Result<Value, TransportError> {
        let Some(connection_id) = self.connection_id() else {
            return Err(TransportError::NotConnected);
        };
        lock(&self.sent).push((method.to_string(), args.clone()));
        self.hub
            .dispatch(connection_id, method, &args)
            .map_err(|e| TransportError::Remote(e.to_string()))
    }

    fn on_message(&self, method: &str, handler: MessageHandler) {
        lock(&self.shared.handlers).insert(method.to_string(), handler);
    }

    fn off_message(&self, method: &str) {
        lock(&self.shared.handlers).remove(method);
    }

    fn on_close(&self, handler: CloseHandler) {
        *lock(&self.shared.close_handler) = Some(handler);
    }

    fn connection_id(&self) -> Option<ConnectionId> {
        lock(&self.shared.session).as_ref().map(|s| s.connection_id)
    }
}

/// Builds [`LoopbackTransport`]s against one shared [`Hub`] and keeps track of
/// them, so tests can sever the live session, refuse new ones, and count
/// what was sent.
#[derive(Clone)]
pub struct LoopbackFactory {
    hub: Hub,
    available: Arc<AtomicBool>,
    sent: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
    created: Arc<Mutex<Vec<Arc<LoopbackTransport>>>>,
}

impl LoopbackFactory {
    pub fn new(hub: Hub) -> Self {
        Self {
            hub,
            available: Arc::new(AtomicBool::new(true)),
            sent: Arc::default(),
            created: Arc::default(),
        }
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// While unavailable, every `open` fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of transports built so far.
    pub fn created(&self) -> usize {
        lock(&self.created).len()
    }

    /// Most recently built transport.
    pub fn current(&self) -> Option<Arc<LoopbackTransport>> {
        lock(&self.created).last().cloned()
    }

    /// Invocations of `method` that reached the hub, across all transports.
    pub fn sent(&self, method: &str) -> Vec<Vec<Value>> {
        lock(&self.sent)
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, args)| args.clone())
            .collect()
    }
}

impl TransportFactory for LoopbackFactory {
    fn create(&self) -> Arc<dyn Transport> {
        let transport = Arc::new(LoopbackTransport {
            hub: self.hub.clone(),
            available: self.available.clone(),
            sent: self.sent.clone(),
            shared: Arc::new(Shared::default()),
        });
        lock(&self.created).push(transport.clone());
        transport
    }
}
