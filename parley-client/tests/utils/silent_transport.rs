use async_trait::async_trait;
use parley_client::transport::{CloseHandler, MessageHandler};
use parley_client::{Transport, TransportError, TransportFactory};
use parley_core::ConnectionId;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Opens fine but never answers: every send waits until the transport is
/// closed, like a hub that stopped reading while the socket stays up.
#[derive(Default)]
pub struct SilentTransport {
    session: Mutex<Option<(ConnectionId, watch::Sender<bool>)>>,
    close_handler: Mutex<Option<CloseHandler>>,
}

impl SilentTransport {
    pub fn is_open(&self) -> bool {
        self.session.lock().unwrap().is_some()
    }
}

#[async_trait]
impl Transport for SilentTransport {
    async fn open(&self) -> Result<(), TransportError> {
        let mut session = self.session.lock().unwrap();
        if session.is_none() {
            *session = Some((ConnectionId::new(), watch::channel(false).0));
        }
        Ok(())
    }

    async fn close(&self) {
        let Some((_, closed)) = self.session.lock().unwrap().take() else {
            return;
        };
        closed.send_replace(true);
        let handler = self.close_handler.lock().unwrap().clone();
        if let Some(handler) = handler {
            handler(None);
        }
    }

    async fn send(&self, _method: &str, _args: Vec<Value>) -> Result<Value, TransportError> {
        let mut closed = match self.session.lock().unwrap().as_ref() {
            Some((_, closed)) => closed.subscribe(),
            None => return Err(TransportError::NotConnected),
        };
        let _ = closed.wait_for(|closed| *closed).await;
        Err(TransportError::Closed)
    }

    fn on_message(&self, _method: &str, _handler: MessageHandler) {}

    fn off_message(&self, _method: &str) {}

    fn on_close(&self, handler: CloseHandler) {
        *self.close_handler.lock().unwrap() = Some(handler);
    }

    fn connection_id(&self) -> Option<ConnectionId> {
        self.session.lock().unwrap().as_ref().map(|(id, _)| *id)
    }
}

#[derive(Clone, Default)]
pub struct SilentFactory {
    created: Arc<Mutex<Vec<Arc<SilentTransport>>>>,
}

impl SilentFactory {
    pub fn created(&self) -> Vec<Arc<SilentTransport>> {
        self.created.lock().unwrap().clone()
    }
}

impl TransportFactory for SilentFactory {
    fn create(&self) -> Arc<dyn Transport> {
        let transport = Arc::new(SilentTransport::default());
        self.created.lock().unwrap().push(transport.clone());
        transport
    }
}
