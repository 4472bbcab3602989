//! Error types for the transport layer.

use tokio_tungstenite::tungstenite;

/// Errors that can occur on the WebSocket transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the TCP listener failed.
    #[error("bind failed: {0}")]
    Bind(#[source] std::io::Error),

    /// Accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// The HTTP→WebSocket upgrade failed (malformed request, or the
    /// Origin allow-list rejected the peer).
    #[error("websocket handshake failed: {0}")]
    Handshake(#[source] tungstenite::Error),

    /// Reading the next frame failed.
    #[error("receive failed: {0}")]
    Receive(#[source] tungstenite::Error),

    /// Writing a frame failed.
    #[error("send failed: {0}")]
    Send(#[source] tungstenite::Error),

    /// A payload destined for a text frame was not valid UTF-8.
    #[error("payload is not valid UTF-8")]
    NonUtf8Payload,
}
