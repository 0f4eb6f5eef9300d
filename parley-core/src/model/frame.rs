use crate::model::connection::ConnectionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type InvocationId = u64;

/// Frames a client writes to the hub socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum ClientFrame {
    Invoke {
        id: InvocationId,
        method: String,
        #[serde(default)]
        args: Vec<Value>,
    },
}

/// Frames the hub writes back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", content = "d")]
pub enum ServerFrame {
    Welcome {
        connection_id: ConnectionId,
    },
    /// Exactly one per `Invoke`, matched by `id`.
    Completion {
        id: InvocationId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Event {
        method: String,
        #[serde(default)]
        args: Vec<Value>,
    },
}

impl ServerFrame {
    pub fn completion(id: InvocationId, outcome: Result<Value, String>) -> Self {
        match outcome {
            Ok(result) => Self::Completion {
                id,
                result: Some(result),
                error: None,
            },
            Err(error) => Self::Completion {
                id,
                result: None,
                error: Some(error),
            },
        }
    }

    pub fn event(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Event {
            method: method.into(),
            args,
        }
    }
}
