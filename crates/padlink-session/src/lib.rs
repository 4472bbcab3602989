//! Session objects and the token store for the padlink input-relay hub.
//!
//! This crate owns the per-connection state:
//!
//! 1. **[`ControllerSession`]** — one per registered controller slot; tracks
//!    the lobby identity and a monotonic last-seen timestamp
//! 2. **[`GameSession`]** — the singleton downstream consumer; owns the
//!    bounded drop-oldest relay queue and the writer task that drains it
//! 3. **[`TokenStore`]** — short-lived bearer tokens binding a slot to a
//!    lobby user, with TTL expiry swept on every access
//!
//! # Concurrency note
//!
//! `TokenStore` is NOT thread-safe by itself — it is a plain pair of
//! `HashMap`s, owned by the hub registry and mutated only under the hub's
//! lock. Keeping it lock-free here avoids a second layer of locking and
//! keeps the cross-map invariant (slot → most recent token) atomic.
//!
//! The sessions are the opposite: they are shared across tasks behind
//! `Arc` and synchronize internally (the relay queue under its own mutex,
//! last-seen under a per-session mutex), so touching them never requires
//! the hub lock.

mod error;
mod relay;
mod session;
mod tokens;

pub use error::SessionError;
pub use session::{ControllerSession, GameSession};
pub use tokens::{IssuedToken, TokenBinding, TokenStore};
