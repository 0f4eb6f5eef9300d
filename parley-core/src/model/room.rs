use crate::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Room names are compared byte for byte: no trimming, no case folding.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    pub fn new(name: impl Into<String>) -> Result<Self, ProtocolError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ProtocolError::InvalidRoom);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&serde_json::Value> for RoomName {
    type Error = ProtocolError;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        value
            .as_str()
            .ok_or(ProtocolError::InvalidRoom)
            .and_then(RoomName::new)
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
