// Resume tweak pipeline: extracted text → prompt → text generation.
// Both request shapes (file uploads and raw JSON text) converge on `tweak_resume`.

pub mod handlers;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::AppError;
use crate::llm_client::{GenerationOptions, TextGenerator};
use crate::prompt::PromptTemplate;

/// Multipart field carrying the resume document.
pub const RESUME_FIELD: &str = "resume_file";
/// Multipart field carrying the job-description document.
pub const JD_FIELD: &str = "jd_file";

#[derive(Debug, Deserialize)]
pub struct TweakTextRequest {
    pub resume: String,
    pub job_description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TweakResponse {
    pub modified_resume: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListModelsResponse {
    pub available_models: Vec<String>,
}

/// Builds the prompt from both documents and returns the model's rewrite of the resume.
pub async fn tweak_resume(
    generator: &dyn TextGenerator,
    template: &PromptTemplate,
    options: &GenerationOptions,
    resume: &str,
    job_description: &str,
) -> Result<String, AppError> {
    ensure_text("resume", resume)?;
    ensure_text("job description", job_description)?;

    let prompt = template.render(resume, job_description);
    debug!(
        resume_chars = resume.chars().count(),
        jd_chars = job_description.chars().count(),
        prompt_chars = prompt.chars().count(),
        "Prompt built"
    );

    let modified = generator.generate(&prompt, options).await?;
    info!(
        provider = %generator.provider(),
        model = %options.model,
        output_chars = modified.chars().count(),
        "Resume tweaked"
    );
    Ok(modified)
}

fn ensure_text(label: &str, text: &str) -> Result<(), AppError> {
    if text.trim().is_empty() {
        return Err(AppError::Validation(format!(
            "{label} contains no extractable text"
        )));
    }
    Ok(())
}
