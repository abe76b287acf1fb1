//! Page server configuration and startup

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use devtalk_core::{ChatEngine, ServerConfig, SessionManager};
use tracing::info;

use crate::api::{AppState, create_router};
use crate::error::{Result, WebError};

/// Page server configuration
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for WebConfig {
    fn from(config: &ServerConfig) -> Self {
        Self::new(config.host.clone(), config.port)
    }
}

impl WebConfig {
    /// Create a new configuration
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|e| WebError::ConfigError(format!("Invalid address {}: {}", addr, e)))
    }
}

/// Chat page server
pub struct WebServer {
    config: WebConfig,
    state: AppState,
}

impl WebServer {
    /// Create a new page server
    pub fn new(config: WebConfig, sessions: Arc<SessionManager>, engine: Arc<ChatEngine>) -> Self {
        Self {
            config,
            state: AppState::new(sessions, engine),
        }
    }

    /// Get the router
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Start the server and run until the process is interrupted
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// Start the server and run until `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.socket_addr()?;
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| WebError::ServerError(format!("Failed to bind {}: {}", addr, e)))?;

        info!("DevTalk page server listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| WebError::ServerError(format!("Server error: {}", e)))?;

        info!("DevTalk page server stopped");
        Ok(())
    }
}
