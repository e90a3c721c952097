use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::llm_client::Provider;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Fails at startup if the selected provider's API key is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub llm_base_url: Option<String>,
    pub llm_timeout_secs: u64,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub prompt_template_path: Option<PathBuf>,
    pub alignment_percent: u8,
    pub allow_fabrication: bool,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let provider: Provider = parse_env("LLM_PROVIDER")?.unwrap_or(Provider::Gemini);
        let api_key = require_env(provider.api_key_var())?;

        let alignment_percent: u8 = parse_env("ALIGNMENT_PERCENT")?.unwrap_or(90);
        if !(1..=100).contains(&alignment_percent) {
            bail!("ALIGNMENT_PERCENT must be between 1 and 100, got {alignment_percent}");
        }

        Ok(Config {
            provider,
            api_key,
            model: optional_env("LLM_MODEL")
                .unwrap_or_else(|| provider.default_model().to_string()),
            llm_base_url: optional_env("LLM_BASE_URL"),
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS")?.unwrap_or(120),
            temperature: parse_env("LLM_TEMPERATURE")?,
            max_output_tokens: parse_env("LLM_MAX_OUTPUT_TOKENS")?,
            prompt_template_path: optional_env("PROMPT_TEMPLATE_PATH").map(PathBuf::from),
            alignment_percent,
            allow_fabrication: parse_env("ALLOW_FABRICATION")?.unwrap_or(false),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES")?.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            port: parse_env("PORT")?.unwrap_or(8080),
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    optional_env(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Returns the variable's value, treating an empty string as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}"))
        })
        .transpose()
}
