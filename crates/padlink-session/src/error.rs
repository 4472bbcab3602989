//! Error types for the session layer.

/// Errors that can occur while issuing or resolving controller tokens.
///
/// The `Display` strings of [`InvalidToken`](SessionError::InvalidToken)
/// and [`ExpiredToken`](SessionError::ExpiredToken) double as the close
/// reasons sent to a controller whose handshake presented the token, so
/// the two cases stay distinguishable on the client side.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The token is unknown: never issued, already evicted by a newer
    /// token for the same slot, or swept after expiry.
    #[error("invalid controller token")]
    InvalidToken,

    /// The token was found but its TTL has elapsed.
    #[error("controller token expired")]
    ExpiredToken,

    /// A token was requested for a user with an empty id.
    #[error("user id required")]
    UserIdRequired,

    /// The system randomness source failed; no token state was committed.
    #[error("token generation failed: {0}")]
    TokenGeneration(String),
}
