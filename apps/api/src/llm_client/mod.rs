//! LLM Client: every outbound text-generation call goes through this module.
//!
//! Handlers depend only on the `TextGenerator` capability. The concrete backend
//! (Gemini or Cohere) is chosen from configuration once at startup and injected via
//! `AppState`. Each call is a single HTTP attempt: no retries, no fallback provider.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::config::Config;

pub mod cohere;
pub mod gemini;

pub use cohere::CohereClient;
pub use gemini::GeminiClient;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("prompt was blocked by the provider: {0}")]
    Blocked(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// The hosted text-generation backends this service can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    Cohere,
}

impl Provider {
    pub fn api_key_var(self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::Cohere => "COHERE_API_KEY",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Gemini => gemini::DEFAULT_MODEL,
            Provider::Cohere => cohere::DEFAULT_MODEL,
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::Gemini => gemini::DEFAULT_BASE_URL,
            Provider::Cohere => cohere::DEFAULT_BASE_URL,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Gemini => f.write_str("gemini"),
            Provider::Cohere => f.write_str("cohere"),
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "cohere" => Ok(Provider::Cohere),
            other => Err(format!("unknown LLM provider '{other}' (expected gemini or cohere)")),
        }
    }
}

/// Per-call generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl GenerationOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_output_tokens: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            ..Self::new(config.model.clone())
        }
    }
}

/// The abstract "generate(prompt, options) → text" capability.
///
/// Carried in `AppState` as `Arc<dyn TextGenerator>` so tests can swap in a stub.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn provider(&self) -> Provider;

    /// Sends `prompt` and returns the trimmed completion text.
    async fn generate(&self, prompt: &str, options: &GenerationOptions)
        -> Result<String, LlmError>;

    /// Names of the models that can serve `generate` calls.
    async fn list_models(&self) -> Result<Vec<String>, LlmError>;
}

/// Builds the configured provider client.
pub fn from_config(config: &Config) -> Result<Arc<dyn TextGenerator>, LlmError> {
    let base_url = config
        .llm_base_url
        .clone()
        .unwrap_or_else(|| config.provider.default_base_url().to_string());
    let timeout = Duration::from_secs(config.llm_timeout_secs);

    let generator: Arc<dyn TextGenerator> = match config.provider {
        Provider::Gemini => Arc::new(GeminiClient::new(
            config.api_key.clone(),
            base_url,
            timeout,
        )?),
        Provider::Cohere => Arc::new(CohereClient::new(
            config.api_key.clone(),
            base_url,
            timeout,
        )?),
    };
    Ok(generator)
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client, LlmError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Passes successful responses through; turns anything else into `LlmError::Api`,
/// using `extract_message` to pull the provider's message out of its error body.
pub(crate) async fn ensure_success(
    response: Response,
    extract_message: fn(&str) -> Option<String>,
) -> Result<Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!("LLM API returned {}: {}", status, body);
    let message = extract_message(&body)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body
            }
        });

    Err(LlmError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Trims the completion and rejects whitespace-only output.
pub(crate) fn non_empty(text: String) -> Result<String, LlmError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(LlmError::EmptyContent)
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str_case_insensitive() {
        assert_eq!("GEMINI".parse::<Provider>().unwrap(), Provider::Gemini);
        assert_eq!(" cohere ".parse::<Provider>().unwrap(), Provider::Cohere);
        assert!("openai".parse::<Provider>().is_err());
    }

    #[test]
    fn test_provider_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Provider::Cohere).unwrap(),
            r#""cohere""#
        );
        assert_eq!(Provider::Gemini.to_string(), "gemini");
    }

    #[test]
    fn test_non_empty_trims_and_rejects_blank() {
        assert_eq!(non_empty("  tailored resume \n".to_string()).unwrap(), "tailored resume");
        assert!(matches!(
            non_empty(" \n\t".to_string()),
            Err(LlmError::EmptyContent)
        ));
    }
}
