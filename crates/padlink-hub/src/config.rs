//! Hub configuration.

use std::time::Duration;

/// Tunable parameters for hub behaviour.
///
/// Create one, override the fields you care about, and pass it through
/// [`normalized`](HubConfig::normalized) — zero values fall back to the
/// defaults rather than producing a hub that can never admit anything.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Hard cap on distinct controller slots registered at once.
    pub max_controllers: usize,

    /// Capacity of the game session's relay queue. Deployments derive
    /// this from the controller input rate (2 × rate in Hz).
    pub relay_queue_size: usize,

    /// How long a fresh connection gets to send its register frame.
    pub register_timeout: Duration,

    /// Per-frame deadline for writes to the game.
    pub write_timeout: Duration,

    /// Origin allow-list for the WebSocket upgrade. Empty means any; a
    /// single `"*"` entry is treated as "any".
    pub allowed_origins: Vec<String>,

    /// Default token lifetime when the issuing caller does not override.
    pub session_token_ttl: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_controllers: 4,
            relay_queue_size: 128,
            register_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(2),
            allowed_origins: Vec::new(),
            session_token_ttl: Duration::from_secs(60),
        }
    }
}

impl HubConfig {
    /// Replaces zero values with defaults and collapses a `["*"]` origin
    /// list into the empty (allow-any) form.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if self.max_controllers == 0 {
            self.max_controllers = defaults.max_controllers;
        }
        if self.relay_queue_size == 0 {
            self.relay_queue_size = defaults.relay_queue_size;
        }
        if self.register_timeout.is_zero() {
            self.register_timeout = defaults.register_timeout;
        }
        if self.write_timeout.is_zero() {
            self.write_timeout = defaults.write_timeout;
        }
        if self.session_token_ttl.is_zero() {
            self.session_token_ttl = defaults.session_token_ttl;
        }
        if self.allowed_origins.len() == 1 && self.allowed_origins[0] == "*" {
            self.allowed_origins.clear();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_fills_zero_values() {
        let cfg = HubConfig {
            max_controllers: 0,
            relay_queue_size: 0,
            register_timeout: Duration::ZERO,
            write_timeout: Duration::ZERO,
            allowed_origins: Vec::new(),
            session_token_ttl: Duration::ZERO,
        }
        .normalized();

        assert_eq!(cfg.max_controllers, 4);
        assert_eq!(cfg.relay_queue_size, 128);
        assert_eq!(cfg.register_timeout, Duration::from_secs(5));
        assert_eq!(cfg.write_timeout, Duration::from_secs(2));
        assert_eq!(cfg.session_token_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_normalized_keeps_explicit_values() {
        let cfg = HubConfig {
            max_controllers: 2,
            relay_queue_size: 16,
            register_timeout: Duration::from_millis(250),
            write_timeout: Duration::from_secs(1),
            allowed_origins: vec!["https://pads.example".into()],
            session_token_ttl: Duration::from_secs(30),
        }
        .normalized();

        assert_eq!(cfg.max_controllers, 2);
        assert_eq!(cfg.relay_queue_size, 16);
        assert_eq!(cfg.register_timeout, Duration::from_millis(250));
        assert_eq!(cfg.allowed_origins, vec!["https://pads.example"]);
    }

    #[test]
    fn test_normalized_wildcard_origin_means_any() {
        let cfg = HubConfig {
            allowed_origins: vec!["*".into()],
            ..HubConfig::default()
        }
        .normalized();

        assert!(cfg.allowed_origins.is_empty());
    }

    #[test]
    fn test_normalized_wildcard_among_others_kept_verbatim() {
        // Only a lone "*" is special; a mixed list is taken literally.
        let cfg = HubConfig {
            allowed_origins: vec!["*".into(), "https://a".into()],
            ..HubConfig::default()
        }
        .normalized();

        assert_eq!(cfg.allowed_origins.len(), 2);
    }
}
