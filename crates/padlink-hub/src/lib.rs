//! The hub registry: the coordinating component of the padlink relay.
//!
//! The [`Hub`] owns the singleton game session, the controller-by-slot map,
//! and the token store, all behind one lock. A single lock is deliberate:
//! the maps are tiny (at most `max_controllers` controllers and a handful
//! of tokens) and the token invariants span two maps, so atomic multi-map
//! updates matter far more than lock sharding ever could.
//!
//! # How it fits in the stack
//!
//! ```text
//! Connection handler (above)  ← admits sessions, forwards payloads
//!     ↕
//! Hub registry (this crate)   ← enforces singleton-game / one-per-slot /
//!     ↕                         token invariants, orchestrates shutdown
//! Session layer (below)       ← session objects, relay queue, token store
//! ```

mod config;
mod error;
mod hub;

pub use config::HubConfig;
pub use error::HubError;
pub use hub::{Assignment, Hub};
