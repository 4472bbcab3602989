//! The controller token store: short-lived bearer tokens binding a slot to
//! a lobby user.
//!
//! Tokens are unguessable random values; no signing is needed because the
//! hub stores them. Per slot, only the most recently issued token is live:
//!
//! ```text
//! NONE ──issue──► ACTIVE ──expire / evict──► NONE
//!                   │  ▲
//!                   │  └── issue (same slot) — old token deleted
//!                   │
//!                   └── resolve (handshake) — stays ACTIVE until TTL
//! ```
//!
//! Expiry is lazy: every issue/resolve/iteration sweep removes entries
//! whose deadline has passed. There is no background sweeper — the maps
//! hold O(MaxControllers) entries and every read path sweeps anyway.
//!
//! All operations take `now: Instant` explicitly so expiry is testable
//! without sleeping.

use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::TryRngCore;

use padlink_protocol::{SlotId, UserProfile};

use crate::SessionError;

/// TTL applied when the caller passes a zero duration.
const FALLBACK_TTL: Duration = Duration::from_secs(60);

/// The binding carried by an active token.
#[derive(Debug, Clone)]
pub struct TokenBinding {
    pub slot: SlotId,
    pub user: UserProfile,
    /// Monotonic deadline; drives all expiry decisions.
    pub expires_at: Instant,
    /// Wall-clock deadline captured at issue time, for display only.
    pub expires_wall: SystemTime,
}

/// The result of issuing a token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: SystemTime,
}

/// In-memory token → binding map with a slot → most-recent-token index.
///
/// Not internally synchronized: owned by the hub registry and mutated only
/// under the hub lock, which is what keeps the two maps consistent.
#[derive(Default)]
pub struct TokenStore {
    tokens: HashMap<String, TokenBinding>,
    slot_tokens: HashMap<SlotId, String>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a token authorizing `user` to register as `slot`.
    ///
    /// Any previous token for the slot is evicted, whatever its remaining
    /// TTL. A zero `ttl` falls back to one minute.
    ///
    /// # Errors
    /// - [`SessionError::UserIdRequired`] if `user.id` is empty
    /// - [`SessionError::TokenGeneration`] if system randomness fails; no
    ///   state is committed in that case
    pub fn issue(
        &mut self,
        slot: SlotId,
        user: UserProfile,
        ttl: Duration,
        now: Instant,
    ) -> Result<IssuedToken, SessionError> {
        let user = UserProfile {
            id: user.id.trim().to_string(),
            name: user.name.trim().to_string(),
            personality: user.personality.trim().to_string(),
        };
        if user.id.is_empty() {
            return Err(SessionError::UserIdRequired);
        }
        let ttl = if ttl.is_zero() { FALLBACK_TTL } else { ttl };

        let token = generate_token()?;

        self.sweep(now);
        if let Some(previous) = self.slot_tokens.remove(&slot) {
            self.tokens.remove(&previous);
        }

        let expires_wall = SystemTime::now() + ttl;
        self.tokens.insert(
            token.clone(),
            TokenBinding {
                slot: slot.clone(),
                user,
                expires_at: now + ttl,
                expires_wall,
            },
        );
        self.slot_tokens.insert(slot, token.clone());

        Ok(IssuedToken {
            token,
            expires_at: expires_wall,
        })
    }

    /// Looks a token up, distinguishing "never valid" from "was valid".
    ///
    /// An expired entry is evicted on the spot and reported as
    /// [`SessionError::ExpiredToken`] so the caller can tell the user why
    /// the handshake failed. Resolving does NOT consume the token — it
    /// stays usable until TTL or replacement.
    pub fn resolve(
        &mut self,
        token: &str,
        now: Instant,
    ) -> Result<TokenBinding, SessionError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SessionError::InvalidToken);
        }

        let binding = match self.tokens.get(token) {
            Some(binding) => binding.clone(),
            None => {
                self.sweep(now);
                return Err(SessionError::InvalidToken);
            }
        };

        if binding.expires_at <= now {
            self.tokens.remove(token);
            if self
                .slot_tokens
                .get(&binding.slot)
                .is_some_and(|t| t == token)
            {
                self.slot_tokens.remove(&binding.slot);
            }
            self.sweep(now);
            return Err(SessionError::ExpiredToken);
        }

        self.sweep(now);
        Ok(binding)
    }

    /// Removes every entry whose deadline has passed, keeping the slot
    /// index consistent.
    pub fn sweep(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .tokens
            .iter()
            .filter(|(_, binding)| binding.expires_at <= now)
            .map(|(token, _)| token.clone())
            .collect();
        for token in expired {
            if let Some(binding) = self.tokens.remove(&token) {
                if self
                    .slot_tokens
                    .get(&binding.slot)
                    .is_some_and(|t| *t == token)
                {
                    self.slot_tokens.remove(&binding.slot);
                }
            }
        }
    }

    /// Iterates the live bindings. Callers that need freshness guarantees
    /// should [`sweep`](Self::sweep) first.
    pub fn iter(&self) -> impl Iterator<Item = &TokenBinding> {
        self.tokens.values()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// 32 cryptographically random bytes, base64url without padding.
fn generate_token() -> Result<String, SessionError> {
    let mut buf = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| SessionError::TokenGeneration(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(buf))
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Expiry is tested by pinning `now` and probing with instants before
    //! and after the deadline — no sleeping, no flakiness.

    use super::*;

    fn slot(s: &str) -> SlotId {
        SlotId::parse(s).expect("valid slot")
    }

    fn user(id: &str) -> UserProfile {
        UserProfile {
            id: id.into(),
            name: format!("name-{id}"),
            personality: "3".into(),
        }
    }

    const TTL: Duration = Duration::from_secs(60);

    // =====================================================================
    // issue()
    // =====================================================================

    #[test]
    fn test_issue_returns_url_safe_token() {
        let mut store = TokenStore::new();

        let issued = store
            .issue(slot("p1"), user("u-1"), TTL, Instant::now())
            .expect("should issue");

        // 32 bytes → 43 base64url chars, no padding.
        assert_eq!(issued.token.len(), 43);
        assert!(issued.token.chars().all(|c| {
            c.is_ascii_alphanumeric() || c == '-' || c == '_'
        }));
    }

    #[test]
    fn test_issue_tokens_are_unique() {
        let mut store = TokenStore::new();
        let now = Instant::now();

        let a = store.issue(slot("p1"), user("u-1"), TTL, now).unwrap();
        let b = store.issue(slot("p2"), user("u-2"), TTL, now).unwrap();

        assert_ne!(a.token, b.token);
    }

    #[test]
    fn test_issue_empty_user_id_rejected() {
        let mut store = TokenStore::new();

        let result = store.issue(
            slot("p1"),
            UserProfile {
                id: "   ".into(),
                ..UserProfile::default()
            },
            TTL,
            Instant::now(),
        );

        assert!(matches!(result, Err(SessionError::UserIdRequired)));
        assert!(store.is_empty(), "no state on rejection");
    }

    #[test]
    fn test_issue_trims_user_fields() {
        let mut store = TokenStore::new();
        let now = Instant::now();

        let issued = store
            .issue(
                slot("p1"),
                UserProfile {
                    id: " u-1 ".into(),
                    name: " Alice ".into(),
                    personality: " 3 ".into(),
                },
                TTL,
                now,
            )
            .unwrap();

        let binding = store.resolve(&issued.token, now).unwrap();
        assert_eq!(binding.user.id, "u-1");
        assert_eq!(binding.user.name, "Alice");
        assert_eq!(binding.user.personality, "3");
    }

    #[test]
    fn test_issue_zero_ttl_falls_back_to_one_minute() {
        let mut store = TokenStore::new();
        let now = Instant::now();

        let issued = store
            .issue(slot("p1"), user("u-1"), Duration::ZERO, now)
            .unwrap();

        // Still valid well within the fallback minute…
        assert!(store
            .resolve(&issued.token, now + Duration::from_secs(59))
            .is_ok());
        // …and gone at the minute mark.
        assert!(matches!(
            store.resolve(&issued.token, now + Duration::from_secs(60)),
            Err(SessionError::ExpiredToken)
        ));
    }

    #[test]
    fn test_issue_same_slot_evicts_previous_token() {
        let mut store = TokenStore::new();
        let now = Instant::now();

        let first = store.issue(slot("p1"), user("u-1"), TTL, now).unwrap();
        let second = store.issue(slot("p1"), user("u-2"), TTL, now).unwrap();

        // The first token is gone entirely — invalid, not expired.
        assert!(matches!(
            store.resolve(&first.token, now),
            Err(SessionError::InvalidToken)
        ));
        let binding = store.resolve(&second.token, now).unwrap();
        assert_eq!(binding.user.id, "u-2");
        assert_eq!(store.len(), 1);
    }

    // =====================================================================
    // resolve()
    // =====================================================================

    #[test]
    fn test_resolve_round_trip_returns_binding() {
        let mut store = TokenStore::new();
        let now = Instant::now();

        let issued = store.issue(slot("p2"), user("u-1"), TTL, now).unwrap();
        let binding = store.resolve(&issued.token, now).expect("should resolve");

        assert_eq!(binding.slot, slot("p2"));
        assert_eq!(binding.user, user("u-1"));
    }

    #[test]
    fn test_resolve_unknown_token_invalid() {
        let mut store = TokenStore::new();

        let result = store.resolve("no-such-token", Instant::now());

        assert!(matches!(result, Err(SessionError::InvalidToken)));
    }

    #[test]
    fn test_resolve_empty_token_invalid() {
        let mut store = TokenStore::new();

        assert!(matches!(
            store.resolve("", Instant::now()),
            Err(SessionError::InvalidToken)
        ));
        assert!(matches!(
            store.resolve("   ", Instant::now()),
            Err(SessionError::InvalidToken)
        ));
    }

    #[test]
    fn test_resolve_after_ttl_reports_expired_and_evicts() {
        let mut store = TokenStore::new();
        let now = Instant::now();
        let issued = store.issue(slot("p1"), user("u-1"), TTL, now).unwrap();

        let later = now + TTL + Duration::from_secs(1);
        let first = store.resolve(&issued.token, later);
        assert!(matches!(first, Err(SessionError::ExpiredToken)));

        // Evicted: the second probe can no longer tell it ever existed.
        let second = store.resolve(&issued.token, later);
        assert!(matches!(second, Err(SessionError::InvalidToken)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_resolve_does_not_consume_token() {
        // A controller may drop and re-handshake with the same token
        // within the TTL; the token must survive the first resolve.
        let mut store = TokenStore::new();
        let now = Instant::now();
        let issued = store.issue(slot("p1"), user("u-1"), TTL, now).unwrap();

        store.resolve(&issued.token, now).expect("first resolve");
        store
            .resolve(&issued.token, now + Duration::from_secs(1))
            .expect("second resolve within TTL");
    }

    #[test]
    fn test_resolve_trims_token() {
        let mut store = TokenStore::new();
        let now = Instant::now();
        let issued = store.issue(slot("p1"), user("u-1"), TTL, now).unwrap();

        let padded = format!("  {}  ", issued.token);
        assert!(store.resolve(&padded, now).is_ok());
    }

    // =====================================================================
    // sweep()
    // =====================================================================

    #[test]
    fn test_sweep_removes_only_expired_entries() {
        let mut store = TokenStore::new();
        let now = Instant::now();

        let short = store
            .issue(slot("p1"), user("u-1"), Duration::from_secs(10), now)
            .unwrap();
        let long = store
            .issue(slot("p2"), user("u-2"), Duration::from_secs(100), now)
            .unwrap();

        store.sweep(now + Duration::from_secs(30));

        assert_eq!(store.len(), 1);
        assert!(matches!(
            store.resolve(&short.token, now + Duration::from_secs(30)),
            Err(SessionError::InvalidToken)
        ));
        assert!(store
            .resolve(&long.token, now + Duration::from_secs(30))
            .is_ok());
    }

    #[test]
    fn test_sweep_then_issue_reuses_slot() {
        // After its token expires, a slot can be reserved again and the
        // new binding wins.
        let mut store = TokenStore::new();
        let now = Instant::now();

        store
            .issue(slot("p1"), user("u-1"), Duration::from_secs(10), now)
            .unwrap();
        let later = now + Duration::from_secs(20);

        let reissued = store.issue(slot("p1"), user("u-2"), TTL, later).unwrap();

        assert_eq!(store.len(), 1);
        let binding = store.resolve(&reissued.token, later).unwrap();
        assert_eq!(binding.user.id, "u-2");
    }

    #[test]
    fn test_iter_exposes_live_bindings() {
        let mut store = TokenStore::new();
        let now = Instant::now();
        store.issue(slot("p1"), user("u-1"), TTL, now).unwrap();
        store.issue(slot("p2"), user("u-2"), TTL, now).unwrap();

        let mut slots: Vec<_> =
            store.iter().map(|b| b.slot.as_str().to_string()).collect();
        slots.sort();
        assert_eq!(slots, ["p1", "p2"]);
    }
}
