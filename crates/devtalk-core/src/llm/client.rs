//! Local inference server HTTP client
//!
//! Supports llama.cpp's native completion API and OpenAI-compatible
//! completion servers (vLLM, LM Studio, ...).

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{ModelConfig, ProviderKind};
use crate::error::{Error, Result};

use super::types::*;

/// Black-box text completion capability
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Complete `prompt` with the given sampling parameters
    async fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String>;
}

/// Client for a locally-hosted inference server
#[derive(Clone)]
pub struct LocalModelClient {
    client: Client,
    model: String,
    base_url: String,
    provider: ProviderKind,
}

impl LocalModelClient {
    /// Create a new client.
    ///
    /// Fails with [`Error::ModelUnavailable`] when the model file is required
    /// but missing.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        if config.require_model_file {
            let path = config.model_path();
            if !path.is_file() {
                return Err(Error::ModelUnavailable(format!(
                    "model file not found: {}",
                    path.display()
                )));
            }
            debug!("Model file present: {}", path.display());
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            model: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            provider: config.provider,
        })
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the provider type
    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Send request to a llama.cpp server
    async fn send_llamacpp_request(&self, prompt: &str, params: &SamplingParams) -> Result<String> {
        let url = format!("{}/completion", self.base_url);

        debug!("Sending request to llama.cpp server: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&LlamaCppRequest::new(prompt, params))
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(Error::Http)?;

        if !status.is_success() {
            warn!("llama.cpp server error: {} - {}", status, body);
            return Err(Error::Provider(format!("{}: {}", status, body)));
        }

        let parsed: LlamaCppResponse = serde_json::from_str(&body).map_err(|e| {
            Error::Provider(format!("Failed to parse response: {} - {}", e, body))
        })?;

        info!(
            "llama.cpp response: {} chars, tokens={}",
            parsed.content.len(),
            parsed.tokens_predicted.unwrap_or(0)
        );

        Ok(parsed.content)
    }

    /// Send request to an OpenAI-compatible server
    async fn send_openai_request(&self, prompt: &str, params: &SamplingParams) -> Result<String> {
        let url = format!("{}/v1/completions", self.base_url);

        debug!("Sending request to OpenAI-compatible server: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&CompletionRequest::new(&self.model, prompt, params))
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(Error::Http)?;

        if !status.is_success() {
            warn!("OpenAI-compatible server error: {} - {}", status, body);
            return Err(Error::Provider(format!("{}: {}", status, body)));
        }

        let parsed: CompletionResponse = serde_json::from_str(&body).map_err(|e| {
            Error::Provider(format!("Failed to parse response: {} - {}", e, body))
        })?;

        let text = parsed
            .into_text()
            .ok_or_else(|| Error::Provider("Response contained no choices".to_string()))?;

        info!("OpenAI-compatible response: {} chars", text.len());

        Ok(text)
    }
}

#[async_trait]
impl ModelProvider for LocalModelClient {
    async fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String> {
        match self.provider {
            ProviderKind::LlamaCpp => self.send_llamacpp_request(prompt, params).await,
            ProviderKind::OpenAi => self.send_openai_request(prompt, params).await,
        }
    }
}
