//! Error types for the protocol layer.

/// Errors produced while parsing or validating wire frames.
///
/// Every variant is terminal for the connection that produced it: the
/// handler maps it to a close code + reason and tears the connection down.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The register frame was not a JSON object of the expected shape.
    #[error("invalid register payload: {0}")]
    MalformedRegister(#[source] serde_json::Error),

    /// A controller registered with neither an id nor a token.
    #[error("controller id required")]
    MissingControllerId,

    /// A slot identifier failed validation (`[a-z0-9_-]{1,32}` after
    /// trimming and lowercasing).
    #[error("invalid controller id {0:?}")]
    InvalidSlotId(String),

    /// The register frame named a role other than `game` or `controller`.
    #[error("invalid role {0:?}")]
    UnknownRole(String),

    /// A controller state frame was not a JSON object.
    #[error("invalid payload: {0}")]
    MalformedState(#[source] serde_json::Error),
}
