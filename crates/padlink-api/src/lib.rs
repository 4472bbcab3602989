//! HTTP adapter for the padlink hub.
//!
//! Exposes the hub's collaborator surface over JSON:
//!
//! - `GET  /healthz` — liveness
//! - `POST /api/controller/session` — look a user up in the lobby service
//!   and mint a controller token for their slot
//! - `GET  /api/controller/assignments` — the merged slot view
//! - `GET|POST|DELETE /api/game/lobby` — lobby-service proxy
//! - `POST /api/game/start` — record attraction visits for seated players
//! - `POST /api/game/result` — submit scores to the lobby service
//!
//! The adapter holds an `Arc<Hub>` and an optional [`LobbyClient`]; with no
//! lobby configured, the lobby-backed endpoints answer 503.

mod error;
mod handlers;
mod lobby;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use padlink_hub::Hub;

pub use error::{ApiError, ApiErrorBody};
pub use lobby::{Lobby, LobbyClient, LobbyConfig, LobbyError, LobbySlot};

/// Shared state passed to every handler.
#[derive(Clone)]
pub struct ApiState {
    pub hub: Arc<Hub>,
    pub lobby: Option<Arc<LobbyClient>>,
    /// TTL applied to tokens minted via `/api/controller/session`.
    pub token_ttl: Duration,
    /// Game identifier echoed in responses.
    pub game_id: String,
}

/// Builds the adapter's router.
pub fn router(state: ApiState) -> Router {
    let api = Router::new()
        .route("/controller/session", post(handlers::controller_session))
        .route(
            "/controller/assignments",
            get(handlers::controller_assignments),
        )
        .route(
            "/game/lobby",
            get(handlers::game_lobby_fetch)
                .post(handlers::game_lobby_update)
                .delete(handlers::game_lobby_clear),
        )
        .route("/game/start", post(handlers::game_start))
        .route("/game/result", post(handlers::game_result))
        .with_state(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(handlers::health))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Binds and serves the adapter until the task is dropped.
pub async fn serve(state: ApiState, addr: &str) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "api listening");
    axum::serve(listener, app).await?;
    Ok(())
}
