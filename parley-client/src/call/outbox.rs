use crate::connection::ConnectionManager;
use parley_core::{RoomName, SignalEnvelope};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Sends a call session's invocations one at a time, in the order they were
/// queued, without holding up the session while the connection is down.
pub(crate) struct Outbox {
    tx: mpsc::UnboundedSender<(&'static str, Vec<Value>)>,
}

impl Outbox {
    pub fn spawn(connection: ConnectionManager) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<(&'static str, Vec<Value>)>();
        tokio::spawn(async move {
            while let Some((method, args)) = rx.recv().await {
                match connection.invoke(method, args).await {
                    Ok(reached) => debug!("{} delivered to {} peer(s)", method, reached),
                    Err(e) => warn!("Failed to send {}: {}", method, e),
                }
            }
        });
        Self { tx }
    }

    pub fn signal(&self, envelope: SignalEnvelope) {
        match envelope.to_invocation() {
            Ok((method, args)) => self.push(method, args),
            Err(e) => warn!("Dropping unencodable {:?}: {}", envelope.kind(), e),
        }
    }

    pub fn leave_group(&self, room: &RoomName) {
        self.push(parley_core::LEAVE_GROUP, vec![Value::from(room.as_str())]);
    }

    fn push(&self, method: &'static str, args: Vec<Value>) {
        if self.tx.send((method, args)).is_err() {
            warn!("Outbox closed, dropping {}", method);
        }
    }
}
