//! Wire protocol types for the padlink input-relay hub.
//!
//! This crate defines everything that travels on the WebSocket wire between
//! controllers, the hub, and the game:
//!
//! 1. **Identity** — [`SlotId`] (a controller position) and [`UserProfile`]
//!    (the lobby identity bound to a slot)
//! 2. **Frames** — the [`Register`] handshake frame and the minimal view of
//!    a controller state frame the hub needs ([`state_frame_slot`])
//! 3. **Close semantics** — [`CloseCode`] with the reason texts the hub
//!    sends when it terminates a connection
//!
//! The hub deliberately does NOT model the full controller state frame
//! (axes, buttons, timestamp): those bytes are forwarded to the game
//! untouched, so decoding them here would only invite accidental
//! re-encoding.

mod error;
mod frame;
mod types;

pub use error::ProtocolError;
pub use frame::{state_frame_slot, Register};
pub use types::{CloseCode, SlotId, UserProfile};
