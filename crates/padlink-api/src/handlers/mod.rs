//! HTTP handlers and shared helpers.

mod controller;
mod game;

pub(crate) use controller::{controller_assignments, controller_session};
pub(crate) use game::{
    game_lobby_clear, game_lobby_fetch, game_lobby_update, game_result,
    game_start,
};

use std::time::SystemTime;

use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

/// `GET /healthz`
pub(crate) async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Formats a wall-clock instant the way every timestamp in the API reads.
pub(crate) fn rfc3339(t: SystemTime) -> String {
    DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses a slot reference (`"p3"`, `"P3"`, or bare `"3"`) into its
/// canonical id and 1-based seat number.
///
/// References outside `1..=max_slots` are rejected: clients may only name
/// seats the hub can actually hold.
pub(crate) fn normalize_slot(raw: &str, max_slots: usize) -> Option<(String, u32)> {
    let trimmed = raw.trim().to_ascii_lowercase();
    let digits = trimmed.strip_prefix('p').unwrap_or(&trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let number: u32 = digits.parse().ok()?;
    if number == 0 || number as usize > max_slots {
        return None;
    }
    Some((format!("p{number}"), number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_slot_accepts_prefixed_and_bare() {
        assert_eq!(normalize_slot("p3", 4), Some(("p3".into(), 3)));
        assert_eq!(normalize_slot("3", 4), Some(("p3".into(), 3)));
        assert_eq!(normalize_slot(" P12 ", 16), Some(("p12".into(), 12)));
    }

    #[test]
    fn test_normalize_slot_canonicalizes_leading_zeroes() {
        assert_eq!(normalize_slot("p01", 4), Some(("p1".into(), 1)));
    }

    #[test]
    fn test_normalize_slot_enforces_seat_bound() {
        assert_eq!(normalize_slot("p4", 4), Some(("p4".into(), 4)));
        assert_eq!(normalize_slot("p5", 4), None);
        assert_eq!(normalize_slot("99", 4), None);
        // The same reference is fine on a larger hub.
        assert_eq!(normalize_slot("p5", 8), Some(("p5".into(), 5)));
    }

    #[test]
    fn test_normalize_slot_rejects_garbage() {
        for raw in ["", "p", "p0", "0", "px", "3p", "-1", "p1x"] {
            assert_eq!(
                normalize_slot(raw, 4),
                None,
                "{raw:?} should be rejected"
            );
        }
    }
}
