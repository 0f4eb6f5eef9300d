use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown signaling method `{0}`")]
    UnknownMethod(String),

    #[error("expected {expected} arguments for `{method}`, got {actual}")]
    Arity {
        method: String,
        expected: usize,
        actual: usize,
    },

    #[error("room name must be a non-empty string")]
    InvalidRoom,

    #[error("malformed payload for `{method}`: {source}")]
    Payload {
        method: String,
        #[source]
        source: serde_json::Error,
    },
}
