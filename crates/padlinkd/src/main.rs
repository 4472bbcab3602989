//! padlinkd — the padlink daemon.
//!
//! Runs two planes on separate listeners: the WebSocket relay (controllers
//! and the game) and the HTTP adapter (token issuance, assignments, lobby
//! proxy). A termination signal triggers the hub's graceful shutdown
//! before the process exits.

use std::sync::Arc;

use anyhow::{Context, Result};

use padlink::prelude::*;
use padlink_api::{ApiState, LobbyClient, LobbyConfig};

mod config;

use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = Config::from_env();

    let server = RelayServer::builder()
        .bind(&cfg.addr)
        .config(cfg.hub_config())
        .build()
        .await
        .context("bind relay listener")?;
    let hub = server.hub();
    tracing::info!(addr = %cfg.addr, "server_listening");

    let lobby = if cfg.lobby_base_url.is_empty() {
        tracing::info!("lobby integration disabled");
        None
    } else {
        let client = LobbyClient::new(LobbyConfig {
            base_url: cfg.lobby_base_url.clone(),
            game_id: cfg.game_id.clone(),
            attraction_id: cfg.attraction_id.clone(),
            staff_name: cfg.staff_name.clone(),
            timeout: cfg.lobby_timeout,
        })
        .context("initialise lobby client")?;
        Some(Arc::new(client))
    };

    let state = ApiState {
        hub: Arc::clone(&hub),
        lobby,
        token_ttl: cfg.session_token_ttl,
        game_id: cfg.game_id.clone(),
    };

    let mut relay_task = tokio::spawn(server.run());
    let api_addr = cfg.api_addr.clone();
    let mut api_task =
        tokio::spawn(async move { padlink_api::serve(state, &api_addr).await });

    tokio::select! {
        _ = shutdown_signal() => {
            tracing::info!("shutdown_signal");
        }
        result = &mut relay_task => {
            return finish("relay server", flatten(result));
        }
        result = &mut api_task => {
            return finish("api server", flatten_anyhow(result));
        }
    }

    hub.shutdown(cfg.shutdown_timeout).await;
    relay_task.abort();
    api_task.abort();
    tracing::info!("shutdown_complete");
    Ok(())
}

/// Resolves once SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn flatten(result: Result<Result<(), RelayError>, tokio::task::JoinError>) -> Result<()> {
    match result {
        Ok(inner) => inner.map_err(Into::into),
        Err(join) => Err(anyhow::anyhow!("task panicked: {join}")),
    }
}

fn flatten_anyhow(result: Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    match result {
        Ok(inner) => inner,
        Err(join) => Err(anyhow::anyhow!("task panicked: {join}")),
    }
}

/// A server task ended on its own — that is always an error path.
fn finish(what: &str, result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => Err(anyhow::anyhow!("{what} exited unexpectedly")),
        Err(e) => {
            tracing::error!(error = %e, "server_error");
            Err(e)
        }
    }
}
