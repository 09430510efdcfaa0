//! Generation gateway: the external language-model collaborator.
//!
//! Authentication failures degrade gracefully into a caller-supplied
//! deterministic fallback; every other upstream failure fails the request.

use crate::config::GenerationConfig;
use crate::error::ApiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("generation service rejected the configured credentials")]
    Auth,
    #[error("{0}")]
    Upstream(String),
}

#[async_trait]
pub trait GenerationGateway: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, GatewayError>;
}

/// Converts a gateway outcome into content: auth failures substitute the
/// fallback template, other upstream errors surface as `GenerationFailed`.
pub fn resolve_generation(
    result: Result<String, GatewayError>,
    fallback: impl FnOnce() -> String,
    failure_message: &str,
) -> Result<String, ApiError> {
    match result {
        Ok(content) => Ok(content),
        Err(GatewayError::Auth) => {
            tracing::warn!("generation auth failed, using templated fallback");
            Ok(fallback())
        }
        Err(GatewayError::Upstream(err)) => {
            tracing::error!(error = %err, "generation upstream error");
            Err(ApiError::GenerationFailed(failure_message.to_string()))
        }
    }
}

/// Chat-completions client for an OpenAI-compatible endpoint.
pub struct OpenAiGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiGateway {
    pub fn new(config: &GenerationConfig) -> Self {
        OpenAiGateway {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[async_trait]
impl GenerationGateway for OpenAiGateway {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, GatewayError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Upstream(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(GatewayError::Auth);
        }
        if !status.is_success() {
            return Err(GatewayError::Upstream(format!(
                "generation service returned {status}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Upstream(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GatewayError::Upstream("generation service returned no choices".into()))?;
        Ok(content.trim().to_string())
    }
}
