//! Unified error type for the padlink meta-crate.

use padlink_hub::HubError;
use padlink_protocol::ProtocolError;
use padlink_session::SessionError;
use padlink_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls, so
/// `?` converts sub-crate errors automatically. Connection handlers return
/// this after they have already closed the offending transport; the accept
/// loop only logs it.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (malformed frames, bad slot ids, bad roles).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (token lifecycle).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A hub registry error (capacity, token slot mismatch).
    #[error(transparent)]
    Hub(#[from] HubError),
}
