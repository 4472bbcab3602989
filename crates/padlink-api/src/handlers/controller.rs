//! `/api/controller/*` — token issuance and the assignments view.

use std::time::SystemTime;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use padlink_protocol::UserProfile;

use super::rfc3339;
use crate::{ApiError, ApiState, LobbyError};

// ── POST /api/controller/session ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct SessionRequest {
    #[serde(default)]
    user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionResponse {
    token: String,
    slot_id: String,
    /// Seconds until the token expires, floored at one.
    ttl: u64,
    expires_at: String,
    user: SessionUser,
    game_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionUser {
    id: String,
    name: String,
    personality: String,
}

pub(crate) async fn controller_session(
    State(state): State<ApiState>,
    Json(request): Json<SessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let lobby = state.lobby.as_ref().ok_or(ApiError::LobbyDisabled)?;

    let user_id = request.user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::BadRequest("userId is required".into()));
    }

    let seat = match lobby.find_slot_for_user(user_id).await {
        Ok(seat) => seat,
        Err(LobbyError::UserNotFound) => {
            return Err(ApiError::NotFound("user not present in lobby".into()));
        }
        Err(e) => {
            tracing::error!(user_id, error = %e, "lobby_lookup_failed");
            return Err(ApiError::Upstream(
                "failed to verify user lobby assignment".into(),
            ));
        }
    };

    let profile = UserProfile {
        id: seat.user_id.clone(),
        name: seat.name.clone(),
        personality: seat.personality.clone(),
    };
    let slot_id = seat.slot_id();

    let issued = state
        .hub
        .issue_token(&slot_id, profile.clone(), Some(state.token_ttl))
        .map_err(|e| {
            tracing::error!(slot = %slot_id, user_id, error = %e, "token_issue_failed");
            ApiError::Internal("failed to issue controller token".into())
        })?;

    let ttl = issued
        .expires_at
        .duration_since(SystemTime::now())
        .map(|d| d.as_secs())
        .unwrap_or(0)
        .max(1);

    Ok(Json(SessionResponse {
        token: issued.token,
        slot_id,
        ttl,
        expires_at: rfc3339(issued.expires_at),
        user: SessionUser {
            id: profile.id,
            name: profile.name,
            personality: profile.personality,
        },
        game_id: state.game_id.clone(),
    }))
}

// ── GET /api/controller/assignments ──────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentsResponse {
    assignments: Vec<AssignmentRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssignmentRecord {
    slot_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    user_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    personality: String,
    connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_seen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_expires_at: Option<String>,
}

pub(crate) async fn controller_assignments(
    State(state): State<ApiState>,
) -> Json<AssignmentsResponse> {
    let assignments = state
        .hub
        .assignments()
        .into_iter()
        .map(|record| AssignmentRecord {
            slot_id: record.slot.as_str().to_string(),
            user_id: record.user_id,
            name: record.name,
            personality: record.personality,
            connected: record.connected,
            last_seen: record.last_seen.map(rfc3339),
            token_expires_at: record.token_expires_at.map(rfc3339),
        })
        .collect();
    Json(AssignmentsResponse { assignments })
}
