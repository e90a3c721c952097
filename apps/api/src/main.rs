mod config;
mod errors;
mod extraction;
mod llm_client;
mod prompt;
mod routes;
mod state;
mod tweak;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::GenerationOptions;
use crate::prompt::{PromptOptions, PromptTemplate};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on a missing provider API key)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume tweak API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the provider client once; handlers only see the TextGenerator trait
    let generator = llm_client::from_config(&config).context("Failed to build LLM client")?;
    info!(
        "LLM client initialized (provider: {}, model: {})",
        config.provider, config.model
    );

    let prompt_options = PromptOptions {
        alignment_percent: config.alignment_percent,
        allow_fabrication: config.allow_fabrication,
    };
    let prompt = match &config.prompt_template_path {
        Some(path) => PromptTemplate::from_file(path, prompt_options)?,
        None => PromptTemplate::with_options(prompt_options),
    };
    info!(
        "Prompt template loaded (custom: {}, alignment: {}%, fabrication allowed: {})",
        config.prompt_template_path.is_some(),
        prompt.options().alignment_percent,
        prompt.options().allow_fabrication
    );

    let state = AppState {
        generator,
        prompt: Arc::new(prompt),
        generation: Arc::new(GenerationOptions::from_config(&config)),
        max_upload_bytes: config.max_upload_bytes,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
