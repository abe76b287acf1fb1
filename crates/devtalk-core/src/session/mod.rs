//! Session management module
//!
//! Conversation state for DevTalk: turns, persona, temperature, and the
//! in-memory registry of live sessions.

mod manager;
mod types;

pub use manager::{SessionHandle, SessionManager};
pub use types::{Role, Session, Temperature, Turn};
