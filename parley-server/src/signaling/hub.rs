use crate::room::RoomRouter;
use parley_core::{
    ClientFrame, ConnectionId, HEARTBEAT, JOIN_GROUP, LEAVE_GROUP, ProtocolError, RoomName,
    ServerFrame, SignalKind,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum HubError {
    #[error("unknown hub method `{0}`")]
    UnknownMethod(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(#[from] ProtocolError),
}

/// Maps hub method invocations onto router operations.
#[derive(Clone, Default)]
pub struct Hub {
    router: RoomRouter,
}

impl Hub {
    pub fn new(router: RoomRouter) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &RoomRouter {
        &self.router
    }

    pub fn dispatch(
        &self,
        connection_id: ConnectionId,
        method: &str,
        args: &[Value],
    ) -> Result<Value, HubError> {
        match method {
            JOIN_GROUP => {
                let room = room_arg(method, args, 1)?;
                self.router.join(connection_id, room);
                Ok(Value::Null)
            }
            LEAVE_GROUP => {
                let room = room_arg(method, args, 1)?;
                self.router.leave(&connection_id, &room);
                Ok(Value::Null)
            }
            HEARTBEAT => {
                self.router.heartbeat(&connection_id);
                Ok(Value::Null)
            }
            _ => {
                let kind = SignalKind::from_invoke_method(method)
                    .ok_or_else(|| HubError::UnknownMethod(method.to_string()))?;
                let room = room_arg(method, args, 2)?;
                let delivered = self.router.relay(&connection_id, &room, kind, args[1].clone());
                Ok(Value::from(delivered))
            }
        }
    }

    /// Handles one text frame from a socket. Returns the completion to send
    /// back, or `None` if the frame could not be parsed.
    pub fn handle_text(&self, connection_id: ConnectionId, text: &str) -> Option<ServerFrame> {
        let frame = match serde_json::from_str::<ClientFrame>(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Invalid frame from {}: {}", connection_id, e);
                return None;
            }
        };

        let ClientFrame::Invoke { id, method, args } = frame;
        let outcome = self.dispatch(connection_id, &method, &args).map_err(|e| {
            debug!("Invocation {} `{}` from {} failed: {}", id, method, connection_id, e);
            e.to_string()
        });
        Some(ServerFrame::completion(id, outcome))
    }
}

fn room_arg(method: &str, args: &[Value], expected: usize) -> Result<RoomName, ProtocolError> {
    if args.len() != expected {
        return Err(ProtocolError::Arity {
            method: method.to_string(),
            expected,
            actual: args.len(),
        });
    }
    RoomName::try_from(&args[0])
}
