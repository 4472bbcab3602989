//! `/api/game/*` — lobby proxy, round start (visit records), and results.

use std::collections::{BTreeMap, HashMap};

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use padlink_hub::Assignment;

use super::normalize_slot;
use crate::lobby::{Lobby, ResultSubmission};
use crate::{ApiError, ApiState, LobbyClient, LobbyError};

fn lobby_client(state: &ApiState) -> Result<&LobbyClient, ApiError> {
    state
        .lobby
        .as_deref()
        .ok_or(ApiError::LobbyDisabled)
}

fn upstream(event: &'static str, error: LobbyError, message: &str) -> ApiError {
    tracing::error!(error = %error, "{event}");
    ApiError::Upstream(message.into())
}

/// The lobby, reshaped with canonical controller slot ids.
fn lobby_payload(lobby: Lobby) -> Value {
    let slots: Vec<Value> = lobby
        .slots
        .iter()
        .map(|seat| {
            json!({
                "slot": seat.slot,
                "slotId": seat.slot_id(),
                "userId": seat.user_id,
                "name": seat.name,
                "personality": seat.personality,
            })
        })
        .collect();
    json!({ "gameId": lobby.game_id, "slots": slots })
}

fn assignment_index(state: &ApiState) -> HashMap<String, Assignment> {
    state
        .hub
        .assignments()
        .into_iter()
        .map(|record| (record.slot.as_str().to_string(), record))
        .collect()
}

// ── GET /api/game/lobby ──────────────────────────────────────────────────

pub(crate) async fn game_lobby_fetch(
    State(state): State<ApiState>,
) -> Result<Json<Value>, ApiError> {
    let lobby = lobby_client(&state)?;
    let current = lobby.fetch_lobby().await.map_err(|e| {
        upstream("lobby_fetch_failed", e, "failed to fetch lobby")
    })?;
    Ok(Json(lobby_payload(current)))
}

// ── POST /api/game/lobby ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LobbyUpdateRequest {
    /// Seat number (or `p<N>` key) → user id; `null` vacates the seat.
    #[serde(default)]
    lobby: HashMap<String, Option<String>>,
}

pub(crate) async fn game_lobby_update(
    State(state): State<ApiState>,
    Json(request): Json<LobbyUpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    let lobby = lobby_client(&state)?;

    if request.lobby.is_empty() {
        return Err(ApiError::BadRequest("lobby mapping required".into()));
    }

    let max_slots = state.hub.config().max_controllers;
    let mut seats: BTreeMap<u32, Option<String>> = BTreeMap::new();
    for (key, value) in &request.lobby {
        let Some((_, number)) = normalize_slot(key, max_slots) else {
            return Err(ApiError::BadRequest(format!("invalid slot key: {key}")));
        };
        seats.insert(number, value.clone());
    }

    let updated = lobby.update_lobby(&seats).await.map_err(|e| {
        upstream("lobby_update_failed", e, "failed to update lobby")
    })?;
    Ok(Json(lobby_payload(updated)))
}

// ── DELETE /api/game/lobby ───────────────────────────────────────────────

pub(crate) async fn game_lobby_clear(
    State(state): State<ApiState>,
) -> Result<Json<Value>, ApiError> {
    let lobby = lobby_client(&state)?;
    let cleared = lobby.clear_lobby().await.map_err(|e| {
        upstream("lobby_clear_failed", e, "failed to clear lobby")
    })?;
    Ok(Json(lobby_payload(cleared)))
}

// ── POST /api/game/start ─────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StartRequest {
    /// Explicit slots to mark; empty means every connected, user-bound one.
    #[serde(default)]
    slots: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VisitResult {
    slot_id: String,
    user_id: String,
}

pub(crate) async fn game_start(
    State(state): State<ApiState>,
    body: axum::body::Bytes,
) -> Result<Json<Value>, ApiError> {
    let lobby = lobby_client(&state)?;

    // An absent body is fine (mark every eligible slot); a present body
    // must be well-formed.
    let request: StartRequest = if body.is_empty() {
        StartRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|_| ApiError::BadRequest("invalid JSON payload".into()))?
    };

    let index = assignment_index(&state);

    let mut targets: Vec<String> = Vec::new();
    if !request.slots.is_empty() {
        for raw in &request.slots {
            let slot_id = raw.trim().to_ascii_lowercase();
            if slot_id.is_empty() || targets.contains(&slot_id) {
                continue;
            }
            if !index.contains_key(&slot_id) {
                return Err(ApiError::NotFound(format!(
                    "slot not found: {slot_id}"
                )));
            }
            targets.push(slot_id);
        }
    } else {
        targets = index
            .iter()
            .filter(|(_, record)| record.connected && !record.user_id.is_empty())
            .map(|(slot_id, _)| slot_id.clone())
            .collect();
    }

    if targets.is_empty() {
        return Ok(Json(json!({
            "gameId": state.game_id,
            "marked": [],
            "skipped": [],
            "message": "no eligible players to mark",
        })));
    }
    targets.sort();

    let mut marked: Vec<VisitResult> = Vec::new();
    let mut skipped: Vec<String> = Vec::new();
    for slot_id in &targets {
        let record = &index[slot_id];
        if record.user_id.is_empty() {
            skipped.push(slot_id.clone());
            continue;
        }
        if let Err(e) = lobby.record_visit(&record.user_id).await {
            tracing::error!(
                slot = %slot_id,
                user_id = %record.user_id,
                error = %e,
                "lobby_visit_failed"
            );
            return Err(ApiError::Upstream(format!(
                "failed to mark visit for slot {slot_id}"
            )));
        }
        marked.push(VisitResult {
            slot_id: slot_id.clone(),
            user_id: record.user_id.clone(),
        });
    }

    Ok(Json(json!({
        "gameId": state.game_id,
        "marked": marked,
        "count": marked.len(),
        "slots": targets,
        "skipped": skipped,
    })))
}

// ── POST /api/game/result ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct ResultRequest {
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    results: Vec<ResultEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct ResultEntry {
    slot_id: String,
    score: i64,
    #[serde(default)]
    name: String,
}

pub(crate) async fn game_result(
    State(state): State<ApiState>,
    Json(request): Json<ResultRequest>,
) -> Result<Json<Value>, ApiError> {
    let lobby = lobby_client(&state)?;

    if request.results.is_empty() {
        return Err(ApiError::BadRequest("results array required".into()));
    }

    let start_time: DateTime<Utc> = match request.start_time.as_deref() {
        None | Some("") => Utc::now(),
        Some(raw) => raw
            .parse()
            .map_err(|_| ApiError::BadRequest("invalid startTime".into()))?,
    };

    let index = assignment_index(&state);
    let max_slots = state.hub.config().max_controllers;

    let mut submissions: Vec<ResultSubmission> = Vec::new();
    let mut seen: BTreeMap<u32, String> = BTreeMap::new();
    for entry in &request.results {
        let raw = entry.slot_id.trim();
        if raw.is_empty() {
            return Err(ApiError::BadRequest("slotId is required".into()));
        }
        let Some((slot_id, number)) = normalize_slot(raw, max_slots) else {
            return Err(ApiError::BadRequest(format!("invalid slotId: {raw}")));
        };
        if seen.contains_key(&number) {
            return Err(ApiError::BadRequest(format!(
                "duplicate slotId: {slot_id}"
            )));
        }
        seen.insert(number, slot_id.clone());

        let Some(record) =
            index.get(&slot_id).filter(|r| !r.user_id.trim().is_empty())
        else {
            return Err(ApiError::NotFound(format!(
                "slot not assigned to user: {slot_id}"
            )));
        };

        if entry.score < 0 {
            return Err(ApiError::BadRequest(
                "score must be non-negative".into(),
            ));
        }

        let mut name = entry.name.trim().to_string();
        if name.is_empty() {
            name = record.name.trim().to_string();
        }

        submissions.push(ResultSubmission {
            slot: number,
            user_id: record.user_id.clone(),
            name,
            score: entry.score,
        });
    }

    let receipt = lobby
        .submit_result(start_time, &submissions)
        .await
        .map_err(|e| {
            upstream("lobby_result_failed", e, "failed to submit game results")
        })?;

    Ok(Json(json!({
        "gameId": receipt.game_id,
        "playId": receipt.play_id,
        "submitted": submissions.len(),
        "startTime": start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
    })))
}
