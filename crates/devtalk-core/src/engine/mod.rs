//! Prompt/response engine
//!
//! Turns a session plus a new user message into an appended assistant turn:
//! windowing, prompt assembly, generation with bounded retry and output
//! sanitization.

mod chat;
mod prompt;
mod retry;

pub use chat::{ChatEngine, FALLBACK_RESPONSE, SubmitOutcome};
pub use prompt::{END_TAG, build_prompt, sanitize_response};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
