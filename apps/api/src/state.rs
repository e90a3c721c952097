use std::sync::Arc;

use crate::llm_client::{GenerationOptions, TextGenerator};
use crate::prompt::PromptTemplate;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything here is immutable for the life of the process.
#[derive(Clone)]
pub struct AppState {
    /// The configured provider client, built once at startup.
    pub generator: Arc<dyn TextGenerator>,
    pub prompt: Arc<PromptTemplate>,
    pub generation: Arc<GenerationOptions>,
    /// Request body limit applied to `/tweak_resume` uploads.
    pub max_upload_bytes: usize,
}
