//! Client for the external lobby service.
//!
//! The lobby service is the authority on who is seated where; the hub only
//! needs four things from it: the current lobby, a user→slot lookup, visit
//! records when a round starts, and score submission when one ends.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Largest response body the client will read; bytes past the cap are
/// never pulled off the wire.
const MAX_RESPONSE_BODY: usize = 1 << 20;

/// Parameters for constructing a [`LobbyClient`].
#[derive(Debug, Clone)]
pub struct LobbyConfig {
    pub base_url: String,
    pub game_id: String,
    pub attraction_id: String,
    pub staff_name: String,
    pub timeout: Duration,
}

/// Errors from the lobby client.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// The user is not seated in the current lobby.
    #[error("user not present in lobby")]
    UserNotFound,

    /// The lobby service answered with a non-success status.
    #[error("lobby {operation} failed (status {status}): {detail}")]
    Api {
        operation: &'static str,
        status: u16,
        detail: String,
    },

    /// The request never completed (connect, timeout, body read).
    #[error("lobby request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the JSON shape this client expects
    /// (including bodies truncated at the read cap).
    #[error("lobby {operation} returned an invalid body: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A required configuration value was missing or malformed.
    #[error("lobby configuration: {0}")]
    Config(&'static str),
}

/// The lobby state as reported by the lobby service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lobby {
    pub game_id: String,
    #[serde(default)]
    pub slots: Vec<LobbySlot>,
}

/// One seated (or empty) lobby position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbySlot {
    /// 1-based seat index.
    pub slot: u32,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub personality: String,
}

impl LobbySlot {
    /// The controller slot id this seat maps to (`p<index>`).
    pub fn slot_id(&self) -> String {
        format!("p{}", self.slot)
    }
}

/// A score line submitted when a round ends.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSubmission {
    pub slot: u32,
    pub user_id: String,
    pub name: String,
    pub score: i64,
}

/// The lobby service's acknowledgement of a result submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultReceipt {
    pub game_id: String,
    pub play_id: i64,
}

/// HTTP client for the lobby service.
pub struct LobbyClient {
    base_url: String,
    game_id: String,
    attraction_id: String,
    staff_name: String,
    http: reqwest::Client,
}

impl LobbyClient {
    /// Validates the configuration and builds the client.
    pub fn new(cfg: LobbyConfig) -> Result<Self, LobbyError> {
        let base_url = cfg.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(LobbyError::Config("base URL required"));
        }
        let game_id = cfg.game_id.trim().to_string();
        if game_id.is_empty() {
            return Err(LobbyError::Config("game id required"));
        }
        let attraction_id = cfg.attraction_id.trim().to_string();
        if attraction_id.is_empty() {
            return Err(LobbyError::Config("attraction id required"));
        }
        let staff_name = cfg.staff_name.trim().to_string();
        if staff_name.is_empty() {
            return Err(LobbyError::Config("staff name required"));
        }

        let timeout = if cfg.timeout.is_zero() {
            Duration::from_secs(3)
        } else {
            cfg.timeout
        };
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LobbyError::Transport)?;

        Ok(Self {
            base_url,
            game_id,
            attraction_id,
            staff_name,
            http,
        })
    }

    fn lobby_url(&self) -> String {
        format!("{}/api/games/lobby/{}", self.base_url, self.game_id)
    }

    /// Retrieves the current lobby state.
    pub async fn fetch_lobby(&self) -> Result<Lobby, LobbyError> {
        let response = self.http.get(self.lobby_url()).send().await?;
        decode("lobby request", response).await
    }

    /// Locates the seat occupied by `user_id`.
    pub async fn find_slot_for_user(
        &self,
        user_id: &str,
    ) -> Result<LobbySlot, LobbyError> {
        let lobby = self.fetch_lobby().await?;
        lobby
            .slots
            .into_iter()
            .find(|slot| slot.user_id == user_id)
            .ok_or(LobbyError::UserNotFound)
    }

    /// Marks that `user_id` visited the configured attraction.
    pub async fn record_visit(&self, user_id: &str) -> Result<(), LobbyError> {
        let url = format!(
            "{}/api/entry/attraction/{}/visit",
            self.base_url, self.attraction_id
        );
        let body = serde_json::json!({
            "userId": user_id,
            "staff": self.staff_name,
        });
        let response = self.http.post(url).json(&body).send().await?;
        expect_success("visit request", response).await
    }

    /// Replaces lobby seat assignments. A `None` value vacates the seat.
    pub async fn update_lobby(
        &self,
        slots: &BTreeMap<u32, Option<String>>,
    ) -> Result<Lobby, LobbyError> {
        let body = serde_json::json!({ "slots": slots });
        let response = self.http.post(self.lobby_url()).json(&body).send().await?;
        decode("lobby update", response).await
    }

    /// Clears the lobby for the configured game.
    pub async fn clear_lobby(&self) -> Result<Lobby, LobbyError> {
        let response = self.http.delete(self.lobby_url()).send().await?;
        decode("lobby delete", response).await
    }

    /// Submits the scores of a finished round.
    pub async fn submit_result(
        &self,
        start_time: DateTime<Utc>,
        results: &[ResultSubmission],
    ) -> Result<ResultReceipt, LobbyError> {
        let url = format!("{}/result", self.lobby_url());
        let body = serde_json::json!({
            "startTime": start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            "staff": self.staff_name,
            "results": results,
        });
        let response = self.http.post(url).json(&body).send().await?;
        decode("result request", response).await
    }
}

async fn decode<T: DeserializeOwned>(
    operation: &'static str,
    mut response: reqwest::Response,
) -> Result<T, LobbyError> {
    if !response.status().is_success() {
        return Err(api_error(operation, response).await);
    }
    let body = read_body_capped(&mut response).await?;
    serde_json::from_slice(&body)
        .map_err(|source| LobbyError::Decode { operation, source })
}

async fn expect_success(
    operation: &'static str,
    response: reqwest::Response,
) -> Result<(), LobbyError> {
    if !response.status().is_success() {
        return Err(api_error(operation, response).await);
    }
    Ok(())
}

/// Turns a non-success response into a structured error, carrying the
/// (capped) body as the diagnostic detail.
async fn api_error(
    operation: &'static str,
    mut response: reqwest::Response,
) -> LobbyError {
    let status = response.status();
    let body = read_body_capped(&mut response).await.unwrap_or_default();
    let mut detail = String::from_utf8_lossy(&body).trim().to_string();
    if detail.is_empty() {
        detail = status.to_string();
    }
    LobbyError::Api {
        operation,
        status: status.as_u16(),
        detail,
    }
}

/// Reads at most [`MAX_RESPONSE_BODY`] bytes of the body. A body that hits
/// the cap is returned truncated; the remainder is left unread.
async fn read_body_capped(
    response: &mut reqwest::Response,
) -> Result<Vec<u8>, reqwest::Error> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let remaining = MAX_RESPONSE_BODY - body.len();
        if chunk.len() >= remaining {
            body.extend_from_slice(&chunk[..remaining]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
