//! Handshake and state-frame parsing.
//!
//! Two frames matter to the hub:
//!
//! - The **register frame** — the mandatory first text frame of every
//!   connection: `{"role": "game" | "controller", "id"?, "token"?}`.
//! - The **controller state frame** — everything a controller sends after
//!   registering. The hub only extracts the optional `id` field to verify
//!   it matches the session's slot; the payload itself is forwarded to the
//!   game byte-for-byte.

use serde::Deserialize;

use crate::{ProtocolError, SlotId};

/// The raw shape of the register frame before validation.
#[derive(Debug, Deserialize)]
struct RawRegister {
    #[serde(default)]
    role: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    token: String,
}

/// A validated register frame, dispatched on role.
///
/// The handler matches on this once and then runs a role-specific loop; the
/// two roles share nothing beyond the first frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Register {
    /// `{"role":"game"}` — the singleton downstream consumer.
    Game,

    /// `{"role":"controller", ...}` — an input producer.
    ///
    /// Exactly one of `slot` / `token` may be absent: with a token the
    /// authoritative slot comes from the token binding, and a supplied
    /// `slot` is only cross-checked against it.
    Controller {
        slot: Option<SlotId>,
        token: Option<String>,
    },
}

impl Register {
    /// Parses and validates the first frame of a connection.
    ///
    /// Role and id are trimmed and lowercased before validation; the token
    /// is trimmed only (token values are case-sensitive).
    ///
    /// # Errors
    /// - [`ProtocolError::MalformedRegister`] — not a JSON object
    /// - [`ProtocolError::UnknownRole`] — role is neither `game` nor
    ///   `controller`
    /// - [`ProtocolError::MissingControllerId`] — controller with neither
    ///   id nor token
    /// - [`ProtocolError::InvalidSlotId`] — a supplied id fails validation,
    ///   token or not
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        let raw: RawRegister =
            serde_json::from_slice(data).map_err(ProtocolError::MalformedRegister)?;

        let role = raw.role.trim().to_ascii_lowercase();
        let id = raw.id.trim();
        let token = raw.token.trim();

        match role.as_str() {
            "game" => Ok(Register::Game),
            "controller" => {
                let token = (!token.is_empty()).then(|| token.to_string());
                let slot = if id.is_empty() {
                    if token.is_none() {
                        return Err(ProtocolError::MissingControllerId);
                    }
                    None
                } else {
                    Some(SlotId::parse(id)?)
                };
                Ok(Register::Controller { slot, token })
            }
            _ => Err(ProtocolError::UnknownRole(role)),
        }
    }
}

/// Extracts the optional `id` field from a controller state frame.
///
/// Returns the raw (untrimmed) id string so the caller can compare it
/// against the session slot — a mismatch is a policy violation, not
/// something to silently canonicalize away.
///
/// # Errors
/// Returns [`ProtocolError::MalformedState`] if the payload is not a JSON
/// object.
pub fn state_frame_slot(payload: &[u8]) -> Result<Option<String>, ProtocolError> {
    #[derive(Deserialize)]
    struct Brief {
        #[serde(default)]
        id: String,
    }

    let brief: Brief =
        serde_json::from_slice(payload).map_err(ProtocolError::MalformedState)?;
    Ok((!brief.id.is_empty()).then_some(brief.id))
}

// =========================================================================
// Tests
// =========================================================================
