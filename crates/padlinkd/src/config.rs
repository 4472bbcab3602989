//! Daemon configuration from environment variables.
//!
//! Every knob has a default; unset, empty, or unparsable values fall back
//! rather than failing startup. Durations are given in whole seconds.

use std::time::Duration;

use padlink_hub::HubConfig;

const DEFAULT_ADDR: &str = "127.0.0.1:8765";
const DEFAULT_API_ADDR: &str = "127.0.0.1:8766";
const DEFAULT_MAX_CONTROLLERS: usize = 4;
const DEFAULT_RATE_HZ: usize = 60;
const DEFAULT_REGISTER_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_SESSION_TOKEN_TTL: Duration = Duration::from_secs(60);
const DEFAULT_LOBBY_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_GAME_ID: &str = "game_1";
const DEFAULT_ATTRACTION_ID: &str = "game_1";
const DEFAULT_STAFF_NAME: &str = "hub";

/// Application-level configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: String,
    pub api_addr: String,
    pub origins: Vec<String>,
    pub max_controllers: usize,
    pub rate_hz: usize,
    pub register_timeout: Duration,
    pub write_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub session_token_ttl: Duration,
    /// Empty disables the lobby integration.
    pub lobby_base_url: String,
    pub game_id: String,
    pub attraction_id: String,
    pub staff_name: String,
    pub lobby_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            addr: env_string("ADDR", DEFAULT_ADDR),
            api_addr: env_string("API_ADDR", DEFAULT_API_ADDR),
            origins: parse_origins(std::env::var("ORIGINS").ok()),
            max_controllers: env_count("MAX_CLIENTS", DEFAULT_MAX_CONTROLLERS),
            rate_hz: env_count("RATE_HZ", DEFAULT_RATE_HZ),
            register_timeout: env_secs(
                "REGISTER_TIMEOUT_SECS",
                DEFAULT_REGISTER_TIMEOUT,
            ),
            write_timeout: env_secs("WRITE_TIMEOUT_SECS", DEFAULT_WRITE_TIMEOUT),
            shutdown_timeout: env_secs(
                "SHUTDOWN_TIMEOUT_SECS",
                DEFAULT_SHUTDOWN_TIMEOUT,
            ),
            session_token_ttl: env_secs(
                "SESSION_TOKEN_TTL_SECS",
                DEFAULT_SESSION_TOKEN_TTL,
            ),
            lobby_base_url: env_string("LOBBY_BASE_URL", ""),
            game_id: env_string("GAME_ID", DEFAULT_GAME_ID),
            attraction_id: env_string("ATTRACTION_ID", DEFAULT_ATTRACTION_ID),
            staff_name: env_string("STAFF_NAME", DEFAULT_STAFF_NAME),
            lobby_timeout: env_secs("LOBBY_TIMEOUT_SECS", DEFAULT_LOBBY_TIMEOUT),
        }
    }

    /// The hub-layer view of this configuration. The relay queue holds two
    /// ticks of input at the configured rate.
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            max_controllers: self.max_controllers,
            relay_queue_size: self.rate_hz.saturating_mul(2),
            register_timeout: self.register_timeout,
            write_timeout: self.write_timeout,
            allowed_origins: self.origins.clone(),
            session_token_ttl: self.session_token_ttl,
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

fn env_count(key: &str, default: usize) -> usize {
    parse_count(std::env::var(key).ok()).unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    parse_secs(std::env::var(key).ok()).unwrap_or(default)
}

fn parse_count(raw: Option<String>) -> Option<usize> {
    let value: usize = raw?.trim().parse().ok()?;
    (value > 0).then_some(value)
}

fn parse_secs(raw: Option<String>) -> Option<Duration> {
    let value: u64 = raw?.trim().parse().ok()?;
    (value > 0).then(|| Duration::from_secs(value))
}

/// `"*"`, empty, or unset all mean "any origin"; otherwise a comma list.
fn parse_origins(raw: Option<String>) -> Vec<String> {
    let raw = raw.unwrap_or_default();
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "*" {
        return Vec::new();
    }
    trimmed
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count_rejects_zero_and_garbage() {
        assert_eq!(parse_count(Some("4".into())), Some(4));
        assert_eq!(parse_count(Some(" 8 ".into())), Some(8));
        assert_eq!(parse_count(Some("0".into())), None);
        assert_eq!(parse_count(Some("-2".into())), None);
        assert_eq!(parse_count(Some("four".into())), None);
        assert_eq!(parse_count(None), None);
    }

    #[test]
    fn test_parse_secs_rejects_zero_and_garbage() {
        assert_eq!(parse_secs(Some("5".into())), Some(Duration::from_secs(5)));
        assert_eq!(parse_secs(Some("0".into())), None);
        assert_eq!(parse_secs(Some("soon".into())), None);
        assert_eq!(parse_secs(None), None);
    }

    #[test]
    fn test_parse_origins_wildcard_and_empty_mean_any() {
        assert!(parse_origins(None).is_empty());
        assert!(parse_origins(Some("".into())).is_empty());
        assert!(parse_origins(Some("*".into())).is_empty());
        assert!(parse_origins(Some("  *  ".into())).is_empty());
    }

    #[test]
    fn test_parse_origins_splits_and_trims() {
        let origins = parse_origins(Some(
            "https://a.example, https://b.example ,,".into(),
        ));
        assert_eq!(origins, vec!["https://a.example", "https://b.example"]);
    }
}
