//! # Padlink
//!
//! Real-time input-relay hub: up to four mobile "controller" clients push
//! periodic input state over WebSocket, and the hub forwards it to a single
//! "game" client with strict backpressure — stale inputs are dropped, never
//! queued behind a slow consumer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use padlink::prelude::*;
//!
//! # async fn run() -> Result<(), RelayError> {
//! let server = RelayServer::builder()
//!     .bind("0.0.0.0:8765")
//!     .config(HubConfig::default())
//!     .build()
//!     .await?;
//! let hub = server.hub(); // issue_token / assignments / shutdown
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::RelayError;
pub use server::{RelayServer, RelayServerBuilder};

/// Re-exports everything an embedder needs.
pub mod prelude {
    // Meta-crate
    pub use crate::{RelayError, RelayServer, RelayServerBuilder};

    // Protocol types
    pub use padlink_protocol::{
        CloseCode, ProtocolError, Register, SlotId, UserProfile,
    };

    // Session types
    pub use padlink_session::{
        ControllerSession, GameSession, IssuedToken, SessionError,
        TokenBinding, TokenStore,
    };

    // Hub types
    pub use padlink_hub::{Assignment, Hub, HubConfig, HubError};

    // Transport types
    pub use padlink_transport::{
        Frame, TransportError, WsListener, WsReader, WsSender,
    };
}
