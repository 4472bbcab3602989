//! `RelayServer` builder and accept loop.
//!
//! Ties the layers together: transport → handler → hub. The HTTP adapter
//! (token issuance, assignments) talks to the same [`Hub`] handle returned
//! by [`RelayServer::hub`].

use std::sync::Arc;

use padlink_hub::{Hub, HubConfig};
use padlink_transport::WsListener;

use crate::handler::handle_connection;
use crate::RelayError;

/// Builder for configuring and starting a relay server.
pub struct RelayServerBuilder {
    bind_addr: String,
    config: HubConfig,
}

impl RelayServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8765".to_string(),
            config: HubConfig::default(),
        }
    }

    /// Sets the WebSocket listen address.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the hub configuration.
    pub fn config(mut self, config: HubConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener and constructs the hub.
    pub async fn build(self) -> Result<RelayServer, RelayError> {
        let config = self.config.normalized();
        let listener =
            WsListener::bind(&self.bind_addr, config.allowed_origins.clone())
                .await?;
        let hub = Hub::new(config);
        Ok(RelayServer { listener, hub })
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running relay server.
pub struct RelayServer {
    listener: WsListener,
    hub: Arc<Hub>,
}

impl RelayServer {
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }

    /// The hub handle: token issuance, assignments, shutdown.
    pub fn hub(&self) -> Arc<Hub> {
        Arc::clone(&self.hub)
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop: one handler task per connection, until the
    /// task running this future is dropped or aborted.
    pub async fn run(self) -> Result<(), RelayError> {
        tracing::info!("relay server running");

        loop {
            match self.listener.accept().await {
                Ok((reader, sender, remote)) => {
                    let hub = Arc::clone(&self.hub);
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(hub, reader, sender, remote).await
                        {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "ws_accept_failed");
                }
            }
        }
    }
}
