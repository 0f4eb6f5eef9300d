//! Hub session abstraction and its adapters.

#[cfg(feature = "loopback")]
mod loopback;
mod ws_transport;

#[cfg(feature = "loopback")]
pub use loopback::{LoopbackFactory, LoopbackTransport};
pub use ws_transport::{WsTransport, WsTransportFactory};

use crate::error::TransportError;
use async_trait::async_trait;
use parley_core::ConnectionId;
use serde_json::Value;
use std::sync::Arc;

/// Receives the arguments of one broadcast event.
pub type MessageHandler = Arc<dyn Fn(Vec<Value>) + Send + Sync>;

/// Called once when an opened session ends, with the reason if it failed.
pub type CloseHandler = Arc<dyn Fn(Option<TransportError>) + Send + Sync>;

/// One hub session. A transport can be reopened after it closed; handlers
/// registered with `on_message` survive that.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self) -> Result<(), TransportError>;

    /// Ends the session. In-flight sends fail with `TransportError::Closed`.
    async fn close(&self);

    /// Invokes a hub method and waits for its completion.
    async fn send(&self, method: &str, args: Vec<Value>) -> Result<Value, TransportError>;

    /// Replaces the handler for `method`.
    fn on_message(&self, method: &str, handler: MessageHandler);

    fn off_message(&self, method: &str);

    fn on_close(&self, handler: CloseHandler);

    /// Id the hub assigned to the current session, if any.
    fn connection_id(&self) -> Option<ConnectionId>;
}

/// Builds fresh transports; the connection manager asks for one per
/// reconnect.
pub trait TransportFactory: Send + Sync {
    fn create(&self) -> Arc<dyn Transport>;
}
