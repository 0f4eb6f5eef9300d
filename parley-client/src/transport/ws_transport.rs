use crate::error::TransportError;
use crate::sync::lock;
use crate::transport::{CloseHandler, MessageHandler, Transport, TransportFactory};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parley_core::{ClientFrame, ConnectionId, InvocationId, ServerFrame};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

type Completion = oneshot::Sender<Result<Value, TransportError>>;

struct Session {
    outbound: mpsc::UnboundedSender<Message>,
    reader: Option<JoinHandle<()>>,
    live: Arc<AtomicBool>,
}

#[derive(Default)]
struct Shared {
    session: Mutex<Option<Session>>,
    pending: Mutex<HashMap<InvocationId, Completion>>,
    handlers: Mutex<HashMap<String, MessageHandler>>,
    close_handler: Mutex<Option<CloseHandler>>,
    connection_id: Mutex<Option<ConnectionId>>,
    next_id: AtomicU64,
}

impl Shared {
    fn handle_text(&self, text: &str) {
        let frame = match serde_json::from_str::<ServerFrame>(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Invalid frame from hub: {}", e);
                return;
            }
        };

        match frame {
            ServerFrame::Welcome { connection_id } => {
                debug!("Hub assigned connection id {}", connection_id);
                *lock(&self.connection_id) = Some(connection_id);
            }
            ServerFrame::Completion { id, result, error } => {
                let Some(waiter) = lock(&self.pending).remove(&id) else {
                    debug!("Completion {} has no waiter", id);
                    return;
                };
                let outcome = match error {
                    Some(error) => Err(TransportError::Remote(error)),
                    None => Ok(result.unwrap_or(Value::Null)),
                };
                let _ = waiter.send(outcome);
            }
            ServerFrame::Event { method, args } => {
                let handler = lock(&self.handlers).get(&method).cloned();
                match handler {
                    Some(handler) => handler(args),
                    None => debug!("No handler for event `{}`", method),
                }
            }
        }
    }

    /// Tears down the session flagged by `live`. Runs at most once per
    /// session, whichever of `close()` and the reader gets here first.
    fn session_ended(&self, live: &Arc<AtomicBool>, reason: Option<TransportError>) {
        if !live.swap(false, Ordering::SeqCst) {
            return;
        }

        let session = {
            let mut current = lock(&self.session);
            match current.as_ref() {
                Some(s) if Arc::ptr_eq(&s.live, live) => current.take(),
                _ => None,
            }
        };
        if let Some(reader) = session.and_then(|s| s.reader) {
            reader.abort();
        }

        let waiters: Vec<Completion> = lock(&self.pending).drain().map(|(_, tx)| tx).collect();
        for waiter in waiters {
            let _ = waiter.send(Err(TransportError::Closed));
        }
        *lock(&self.connection_id) = None;

        match &reason {
            Some(e) => warn!("Hub connection lost: {}", e),
            None => info!("Hub connection closed"),
        }
        let handler = lock(&self.close_handler).clone();
        if let Some(handler) = handler {
            handler(reason);
        }
    }
}

/// Hub session over a WebSocket, speaking the JSON frame protocol.
pub struct WsTransport {
    url: String,
    shared: Arc<Shared>,
}

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self) -> Result<(), TransportError> {
        if lock(&self.shared.session).is_some() {
            return Ok(());
        }

        let (socket, _) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(self.url.as_str()))
            .await
            .map_err(|_| TransportError::Connect(format!("timed out connecting to {}", self.url)))?
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (mut write, mut read) = socket.split();

        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if write.send(msg).await.is_err() {
                    break;
                }
            }
            let _ = write.close().await;
        });

        let live = Arc::new(AtomicBool::new(true));
        *lock(&self.shared.session) = Some(Session {
            outbound: tx,
            reader: None,
            live: live.clone(),
        });

        let reader = tokio::spawn({
            let shared = self.shared.clone();
            let live = live.clone();

            async move {
                let reason = loop {
                    match read.next().await {
                        Some(Ok(Message::Text(text))) => shared.handle_text(text.as_str()),
                        Some(Ok(Message::Close(_))) | None => break None,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => break Some(TransportError::Socket(e.to_string())),
                    }
                };
                shared.session_ended(&live, reason);
            }
        });

        match lock(&self.shared.session).as_mut() {
            Some(session) if Arc::ptr_eq(&session.live, &live) => session.reader = Some(reader),
            _ => reader.abort(),
        }

        info!("Hub connection open: {}", self.url);
        Ok(())
    }

    async fn close(&self) {
        let live = {
            let session = lock(&self.shared.session);
            let Some(session) = session.as_ref() else {
                return;
            };
            let _ = session.outbound.send(Message::Close(None));
            session.live.clone()
        };
        self.shared.session_ended(&live, None);
    }

    async fn send(&self, method: &str, args: Vec<Value>) -> Result<Value, TransportError> {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let frame = ClientFrame::Invoke {
            id,
            method: method.to_string(),
            args,
        };
        let text = serde_json::to_string(&frame).map_err(|e| TransportError::Encode(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        {
            let session = lock(&self.shared.session);
            let Some(session) = session.as_ref() else {
                return Err(TransportError::NotConnected);
            };
            lock(&self.shared.pending).insert(id, tx);
            if session.outbound.send(Message::Text(text.into())).is_err() {
                lock(&self.shared.pending).remove(&id);
                return Err(TransportError::Closed);
            }
        }

        rx.await.unwrap_or(Err(TransportError::Closed))
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
        *lock(&self.shared.connection_id)
    }
}

/// Hands out a fresh [`WsTransport`] to `url` per session.
#[derive(Debug, Clone)]
pub struct WsTransportFactory {
    url: String,
}

impl WsTransportFactory {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl TransportFactory for WsTransportFactory {
    fn create(&self) -> Arc<dyn Transport> {
        Arc::new(WsTransport::new(self.url.clone()))
    }
}
