//! Inspector HTTP server lifecycle management.
//!
//! Provides [`start_server`] which binds to a TCP port and runs the
//! Axum server until the given shutdown future resolves.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Configuration for the inspector server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The host to bind to: an IPv4 or IPv6 address, or a name such as
    /// `localhost`.
    pub host: String,
    /// The TCP port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 9002,
        }
    }
}

impl From<&fsm_inspect_core::config::ListenConfig> for ServerConfig {
    fn from(listen: &fsm_inspect_core::config::ListenConfig) -> Self {
        Self {
            host: listen.host.clone(),
            port: listen.port,
        }
    }
}

/// Start the inspector HTTP server.
///
/// Binds to the configured address, builds the router, and serves
/// requests until `shutdown` resolves. Returns `Ok(())` on clean
/// shutdown.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind or the server
/// encounters a fatal I/O error.
pub async fn start_server(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let router = build_router(state);

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|e| {
            ServerError::Bind(format!("bind failed on {}:{}: {e}", config.host, config.port))
        })?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;

    info!(%addr, "Inspector server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    info!("Inspector server stopped");
    Ok(())
}

/// Errors that can occur when starting or running the inspector server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_to_a_host_name() {
        let config = ServerConfig {
            host: String::from("localhost"),
            port: 0,
        };
        let result = start_server(&config, Arc::new(AppState::new()), async {}).await;
        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn port_in_use_is_a_bind_error() {
        let taken = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let config = ServerConfig {
            host: String::from("127.0.0.1"),
            port: taken.local_addr().unwrap().port(),
        };
        let result = start_server(&config, Arc::new(AppState::new()), async {}).await;
        assert!(matches!(result, Err(ServerError::Bind(_))));
    }
}
