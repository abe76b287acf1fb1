//! Completion API types

use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;

/// Sampling parameters sent with every generation call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_k: u32,
    pub top_p: f32,
    pub repeat_penalty: f32,
}

impl SamplingParams {
    /// Combine the session temperature with the fixed generation settings
    pub fn new(temperature: f32, generation: &GenerationConfig) -> Self {
        Self {
            temperature,
            max_tokens: generation.max_tokens,
            top_k: generation.top_k,
            top_p: generation.top_p,
            repeat_penalty: generation.repeat_penalty,
        }
    }
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self::new(0.4, &GenerationConfig::default())
    }
}

// ============================================================================
// llama.cpp server (`POST /completion`)
// ============================================================================

/// Request body for the llama.cpp completion endpoint
#[derive(Debug, Clone, Serialize)]
pub struct LlamaCppRequest {
    pub prompt: String,
    pub n_predict: u32,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub repeat_penalty: f32,
    pub stream: bool,
}

impl LlamaCppRequest {
    pub fn new(prompt: &str, params: &SamplingParams) -> Self {
        Self {
            prompt: prompt.to_string(),
            n_predict: params.max_tokens,
            temperature: params.temperature,
            top_k: params.top_k,
            top_p: params.top_p,
            repeat_penalty: params.repeat_penalty,
            stream: false,
        }
    }
}

/// Response body of the llama.cpp completion endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct LlamaCppResponse {
    pub content: String,
    #[serde(default)]
    pub tokens_predicted: Option<u64>,
}

// ============================================================================
// OpenAI-compatible server (`POST /v1/completions`)
// ============================================================================

/// Request body for an OpenAI-compatible completions endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    /// Non-standard, honored by vLLM, LM Studio and llama.cpp
    pub top_k: u32,
    /// Non-standard, honored by vLLM, LM Studio and llama.cpp
    pub repeat_penalty: f32,
    pub stream: bool,
}

impl CompletionRequest {
    pub fn new(model: &str, prompt: &str, params: &SamplingParams) -> Self {
        Self {
            model: model.to_string(),
            prompt: prompt.to_string(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
            repeat_penalty: params.repeat_penalty,
            stream: false,
        }
    }
}

/// Response body of an OpenAI-compatible completions endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    pub text: String,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl CompletionResponse {
    /// Text of the first choice, if any
    pub fn into_text(self) -> Option<String> {
        self.choices.into_iter().next().map(|c| c.text)
    }
}
