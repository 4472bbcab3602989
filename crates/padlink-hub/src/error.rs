//! Error types for the hub registry.

use padlink_protocol::ProtocolError;
use padlink_session::SessionError;

/// Errors surfaced by hub registry operations.
///
/// The `Display` strings double as WebSocket close reasons for the
/// connection that triggered the failure, so they are part of the wire
/// contract.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// All controller slots are taken and the registering slot is not a
    /// reconnection. Expected under normal operation, not exceptional.
    #[error("controller limit reached")]
    ControllerLimitReached,

    /// A register frame supplied both a token and an id, and they name
    /// different slots.
    #[error("token slot mismatch")]
    TokenSlotMismatch,

    /// Slot validation failed (token issue path).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Token store failure (invalid/expired token, bad user, randomness).
    #[error(transparent)]
    Session(#[from] SessionError),
}
