//! Identity types and close-code semantics.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// SlotId
// ---------------------------------------------------------------------------

/// A validated controller slot identifier.
///
/// The canonical form is lowercase and matches `[a-z0-9_-]{1,32}`. Clients
/// conventionally use `p1..pN`, but any string in the alphabet is accepted —
/// the hard cap on *distinct* slots is enforced by the hub registry, not by
/// the identifier space.
///
/// Construction goes through [`SlotId::parse`], which trims and lowercases
/// the input before validating, so every `SlotId` in the process is already
/// canonical and can be compared byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    /// Maximum length of a slot identifier.
    pub const MAX_LEN: usize = 32;

    /// Parses and canonicalizes a raw slot identifier.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidSlotId`] if the trimmed, lowercased
    /// input is empty, too long, or contains characters outside
    /// `[a-z0-9_-]`.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let candidate = raw.trim().to_ascii_lowercase();
        let valid = !candidate.is_empty()
            && candidate.len() <= Self::MAX_LEN
            && candidate
                .bytes()
                .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-'));
        if !valid {
            return Err(ProtocolError::InvalidSlotId(raw.trim().to_string()));
        }
        Ok(Self(candidate))
    }

    /// Returns the canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// UserProfile
// ---------------------------------------------------------------------------

/// The lobby identity bound to a controller slot.
///
/// `personality` is an opaque string owned by the lobby service; the hub
/// stores and echoes it without interpretation. A default (all-empty)
/// profile represents a controller that registered by bare slot id, with
/// no lobby binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub personality: String,
}

impl UserProfile {
    /// `true` when the profile carries no lobby identity.
    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CloseCode
// ---------------------------------------------------------------------------

/// The subset of RFC 6455 close codes the hub sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCode {
    /// 1000 — normal closure (peer close, handshake deadline, shutdown).
    Normal,
    /// 1003 — a non-text frame was received where text is required.
    Unsupported,
    /// 1008 — protocol/policy violations: unknown role, bad token,
    /// id mismatch, limit reached, replacement.
    Policy,
    /// 1011 — the hub failed internally (relay write failure).
    Internal,
}

impl CloseCode {
    /// The numeric close status for the wire.
    pub fn as_u16(self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::Unsupported => 1003,
            CloseCode::Policy => 1008,
            CloseCode::Internal => 1011,
        }
    }

    /// The reason text used when the closer has nothing more specific.
    pub fn default_reason(self) -> &'static str {
        match self {
            CloseCode::Normal => "normal closure",
            CloseCode::Unsupported => "unsupported data",
            CloseCode::Policy => "policy violation",
            CloseCode::Internal => "internal error",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // SlotId::parse
    // =====================================================================

    #[test]
    fn test_parse_plain_slot_accepted() {
        let slot = SlotId::parse("p1").expect("should parse");
        assert_eq!(slot.as_str(), "p1");
    }

    #[test]
    fn test_parse_trims_and_lowercases() {
        // Clients are sloppy about casing and whitespace; the canonical
        // form must come out identical either way.
        let slot = SlotId::parse("  P1 ").expect("should parse");
        assert_eq!(slot.as_str(), "p1");
        assert_eq!(slot, SlotId::parse("p1").unwrap());
    }

    #[test]
    fn test_parse_full_alphabet_accepted() {
        let slot = SlotId::parse("slot_4-b2").expect("should parse");
        assert_eq!(slot.as_str(), "slot_4-b2");
    }

    #[test]
    fn test_parse_empty_rejected() {
        assert!(SlotId::parse("").is_err());
        assert!(SlotId::parse("   ").is_err());
    }

    #[test]
    fn test_parse_over_max_len_rejected() {
        let long = "a".repeat(SlotId::MAX_LEN + 1);
        assert!(SlotId::parse(&long).is_err());

        let at_max = "a".repeat(SlotId::MAX_LEN);
        assert!(SlotId::parse(&at_max).is_ok());
    }

    #[test]
    fn test_parse_forbidden_characters_rejected() {
        for raw in ["p 1", "p1!", "sl.ot", "p1/", "päd"] {
            assert!(
                SlotId::parse(raw).is_err(),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_slot_id_serializes_as_plain_string() {
        // `#[serde(transparent)]` means SlotId("p1") → `"p1"`.
        let json = serde_json::to_string(&SlotId::parse("p1").unwrap()).unwrap();
        assert_eq!(json, "\"p1\"");
    }

    #[test]
    fn test_slot_id_orders_lexicographically() {
        let mut slots = vec![
            SlotId::parse("p3").unwrap(),
            SlotId::parse("p1").unwrap(),
            SlotId::parse("p2").unwrap(),
        ];
        slots.sort();
        let order: Vec<_> = slots.iter().map(SlotId::as_str).collect();
        assert_eq!(order, ["p1", "p2", "p3"]);
    }

    // =====================================================================
    // UserProfile
    // =====================================================================

    #[test]
    fn test_user_profile_default_is_empty() {
        assert!(UserProfile::default().is_empty());
    }

    #[test]
    fn test_user_profile_with_id_not_empty() {
        let user = UserProfile {
            id: "u-1".into(),
            name: String::new(),
            personality: String::new(),
        };
        assert!(!user.is_empty());
    }

    // =====================================================================
    // CloseCode
    // =====================================================================

    #[test]
    fn test_close_codes_match_rfc_values() {
        assert_eq!(CloseCode::Normal.as_u16(), 1000);
        assert_eq!(CloseCode::Unsupported.as_u16(), 1003);
        assert_eq!(CloseCode::Policy.as_u16(), 1008);
        assert_eq!(CloseCode::Internal.as_u16(), 1011);
    }

    #[test]
    fn test_default_reasons_are_stable() {
        // Operators grep for these strings; they are part of the contract.
        assert_eq!(CloseCode::Normal.default_reason(), "normal closure");
        assert_eq!(
            CloseCode::Unsupported.default_reason(),
            "unsupported data"
        );
        assert_eq!(CloseCode::Policy.default_reason(), "policy violation");
        assert_eq!(CloseCode::Internal.default_reason(), "internal error");
    }
}
