//! WebSocket transport for the padlink input-relay hub.
//!
//! Wraps `tokio-tungstenite` behind three small types:
//!
//! - [`WsListener`] — accepts connections, enforcing the Origin allow-list
//!   during the HTTP upgrade and attributing a remote IP to each peer
//! - [`WsReader`] — the read half; owned by the connection's handler task
//! - [`WsSender`] — the cloneable write half; owned by the session object
//!   so a *different* task (the relay writer, or whoever performs a
//!   replacement) can write or close without touching the read loop
//!
//! The split matters: the handler blocks in `read` for most of a session's
//! life, and the close path must never wait behind it.

mod error;
mod websocket;

pub use error::TransportError;
pub use websocket::{Frame, WsListener, WsReader, WsSender};
