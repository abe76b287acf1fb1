//! Model provider abstraction and local inference client
//!
//! Supports llama.cpp servers and OpenAI-compatible completion APIs.

mod client;
mod types;

pub use client::{LocalModelClient, ModelProvider};
pub use types::*;
