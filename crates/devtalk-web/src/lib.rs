//! devtalk-web: DevTalk chat page and JSON API
//!
//! Serves the single-page chat UI and the endpoints it talks to.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use devtalk_core::{ChatEngine, Config, LocalModelClient, SessionManager};
//! use devtalk_web::{WebConfig, WebServer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::load().unwrap();
//!     let client = LocalModelClient::new(&config.model).unwrap();
//!     let engine = Arc::new(ChatEngine::new(Arc::new(client), &config));
//!     let sessions = Arc::new(SessionManager::new(config.session.clone()));
//!
//!     let server = WebServer::new(WebConfig::from(&config.server), sessions, engine);
//!     server.run().await.unwrap();
//! }
//! ```

pub mod api;
pub mod error;
pub mod server;

pub use api::{AppState, ChatReply, MessageRequest, SessionView, SettingsRequest, create_router};
pub use error::{ErrorResponse, Result, WebError};
pub use server::{WebConfig, WebServer};
