//! devtalk-core: DevTalk conversation core
//!
//! Conversation sessions, prompt assembly, generation with bounded retry
//! and response sanitization, plus the HTTP client for a locally-hosted
//! inference server.

pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
pub mod session;

pub use config::{
    Config, GenerationConfig, LauncherConfig, ModelConfig, ProviderKind, RetryConfig,
    ServerConfig, SessionConfig,
};
pub use engine::{
    ChatEngine, FALLBACK_RESPONSE, RetryPolicy, Sleeper, SubmitOutcome, TokioSleeper, build_prompt,
    sanitize_response,
};
pub use error::{Error, Result};
pub use llm::{LocalModelClient, ModelProvider, SamplingParams};
pub use session::{Role, Session, SessionHandle, SessionManager, Temperature, Turn};
