//! Axum route handlers for the resume tweak API.

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    Json,
};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::{extract_text_blocking, UploadedDocument};
use crate::state::AppState;
use crate::tweak::{
    tweak_resume, ListModelsResponse, TweakResponse, TweakTextRequest, JD_FIELD, RESUME_FIELD,
};

/// POST /tweak_resume
///
/// Accepts `multipart/form-data` with `resume_file` + `jd_file`, or
/// `application/json` with `resume` + `job_description`.
pub async fn handle_tweak_resume(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<TweakResponse>, AppError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let shape = if content_type.starts_with("multipart/form-data") {
        "multipart"
    } else {
        "json"
    };
    let span = info_span!("tweak_resume", request_id = %Uuid::new_v4(), shape);

    process_tweak(state, request, &content_type)
        .instrument(span)
        .await
}

async fn process_tweak(
    state: AppState,
    request: Request,
    content_type: &str,
) -> Result<Json<TweakResponse>, AppError> {
    let (resume, job_description) = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::from_rejection(e.status(), e.body_text()))?;
        let (resume_doc, jd_doc) = read_uploads(multipart).await?;
        tokio::try_join!(extract_text_blocking(resume_doc), extract_text_blocking(jd_doc))?
    } else if content_type.starts_with("application/json") {
        let Json(body) = Json::<TweakTextRequest>::from_request(request, &state)
            .await
            .map_err(|e| AppError::from_rejection(e.status(), e.body_text()))?;
        (body.resume, body.job_description)
    } else {
        return Err(AppError::Validation(format!(
            "expected multipart/form-data with '{RESUME_FIELD}' and '{JD_FIELD}', \
             or application/json with 'resume' and 'job_description'"
        )));
    };

    let modified_resume = tweak_resume(
        state.generator.as_ref(),
        &state.prompt,
        &state.generation,
        &resume,
        &job_description,
    )
    .await?;

    Ok(Json(TweakResponse { modified_resume }))
}

/// GET /list_models
///
/// Proxies the configured provider's model catalog.
pub async fn handle_list_models(
    State(state): State<AppState>,
) -> Result<Json<ListModelsResponse>, AppError> {
    let available_models = state.generator.list_models().await?;
    Ok(Json(ListModelsResponse { available_models }))
}

/// Pulls the two document uploads out of the form. Unknown fields are ignored.
async fn read_uploads(
    mut multipart: Multipart,
) -> Result<(UploadedDocument, UploadedDocument), AppError> {
    let mut resume = None;
    let mut job_description = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| {
            let message = format!("malformed multipart body: {}", e.body_text());
            AppError::from_rejection(e.status(), message)
        })?
    {
        let name = field.name().unwrap_or_default().to_string();
        let slot = match name.as_str() {
            RESUME_FIELD => &mut resume,
            JD_FIELD => &mut job_description,
            _ => continue,
        };

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation(format!("field '{name}' must be a file upload")))?;
        let data = field.bytes().await.map_err(|e| {
            let message = format!("failed to read '{name}': {}", e.body_text());
            AppError::from_rejection(e.status(), message)
        })?;

        *slot = Some(UploadedDocument::new(file_name, data));
    }

    let resume = resume
        .ok_or_else(|| AppError::Validation(format!("missing file field '{RESUME_FIELD}'")))?;
    let job_description = job_description
        .ok_or_else(|| AppError::Validation(format!("missing file field '{JD_FIELD}'")))?;
    Ok((resume, job_description))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::{body::Body, http::StatusCode, Router};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::extraction::pdf::fixtures::build_pdf;
    use crate::llm_client::{GenerationOptions, LlmError, Provider, TextGenerator};
    use crate::prompt::PromptTemplate;
    use crate::routes::build_router;
    use crate::state::AppState;

    const BOUNDARY: &str = "tweak-test-boundary";

    struct StubGenerator {
        reply: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl StubGenerator {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextGenerator for StubGenerator {
        fn provider(&self) -> Provider {
            Provider::Gemini
        }

        async fn generate(
            &self,
            prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(message) => Err(LlmError::Api {
                    status: 503,
                    message: message.clone(),
                }),
            }
        }

        async fn list_models(&self) -> Result<Vec<String>, LlmError> {
            Ok(vec!["stub-model".to_string()])
        }
    }

    fn app(generator: Arc<StubGenerator>) -> Router {
        let generator: Arc<dyn TextGenerator> = generator;
        build_router(AppState {
            generator,
            prompt: Arc::new(PromptTemplate::default()),
            generation: Arc::new(GenerationOptions::new("stub-model")),
            max_upload_bytes: 1024 * 1024,
        })
    }

    fn multipart_request(parts: &[(&str, &str, &str)]) -> axum::http::Request<Body> {
        let parts: Vec<(&str, &str, Vec<u8>)> = parts
            .iter()
            .map(|(field, file_name, data)| (*field, *file_name, data.as_bytes().to_vec()))
            .collect();
        multipart_bytes_request(&parts)
    }

    fn multipart_bytes_request(parts: &[(&str, &str, Vec<u8>)]) -> axum::http::Request<Body> {
        let mut body = Vec::new();
        for (field, file_name, data) in parts {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
                     filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        axum::http::Request::builder()
            .method("POST")
            .uri("/tweak_resume")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(body: Value) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method("POST")
            .uri("/tweak_resume")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: axum::http::Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_txt_uploads_return_modified_resume() {
        let generator = StubGenerator::replying("OK");
        let request = multipart_request(&[
            ("resume_file", "resume.txt", "Jane Doe, Engineer"),
            ("jd_file", "jd.txt", "Looking for a Python developer"),
        ]);

        let (status, body) = send(app(generator.clone()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"modified_resume": "OK"}));

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        let resume_at = prompts[0].find("Jane Doe, Engineer").unwrap();
        let jd_at = prompts[0].find("Looking for a Python developer").unwrap();
        assert!(resume_at < jd_at);
    }

    #[tokio::test]
    async fn test_pdf_and_docx_uploads_reach_the_prompt() {
        let generator = StubGenerator::replying("Tailored");
        let resume_pdf = build_pdf(&["Jane Doe", "", "Python"]);
        let jd_docx = build_docx(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body><w:p><w:r><w:t>Hiring a backend engineer</w:t></w:r></w:p></w:body></w:document>"#,
        );
        let request = multipart_bytes_request(&[
            ("resume_file", "resume.pdf", resume_pdf),
            ("jd_file", "jd.docx", jd_docx),
        ]);

        let (status, body) = send(app(generator.clone()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"modified_resume": "Tailored"}));
        let prompts = generator.prompts();
        assert!(prompts[0].contains("Jane Doe\nPython"));
        assert!(prompts[0].contains("Hiring a backend engineer"));
    }

    fn build_docx(document: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        std::io::Write::write_all(&mut writer, document.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[tokio::test]
    async fn test_json_body_returns_modified_resume() {
        let generator = StubGenerator::replying("Tailored");
        let request = json_request(json!({
            "resume": "Jane Doe, Engineer",
            "job_description": "Looking for a Python developer"
        }));

        let (status, body) = send(app(generator.clone()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["modified_resume"], "Tailored");
        assert!(generator.prompts()[0].contains("Looking for a Python developer"));
    }

    #[tokio::test]
    async fn test_generation_failure_is_500_with_error() {
        let generator = StubGenerator::failing("model overloaded");
        let request = json_request(json!({
            "resume": "Jane Doe",
            "job_description": "Python developer"
        }));

        let (status, body) = send(app(generator), request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "LLM_ERROR");
        let message = body["error"].as_str().unwrap();
        assert!(!message.is_empty());
        assert!(message.contains("model overloaded"));
    }

    #[tokio::test]
    async fn test_unsupported_upload_is_415_and_skips_generation() {
        let generator = StubGenerator::replying("OK");
        let request = multipart_request(&[
            ("resume_file", "resume.odt", "binary"),
            ("jd_file", "jd.txt", "Python developer"),
        ]);

        let (status, body) = send(app(generator.clone()), request).await;

        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["code"], "UNSUPPORTED_FORMAT");
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_broken_pdf_is_422() {
        let generator = StubGenerator::replying("OK");
        let request = multipart_request(&[
            ("resume_file", "resume.pdf", "definitely not a pdf"),
            ("jd_file", "jd.txt", "Python developer"),
        ]);

        let (status, body) = send(app(generator.clone()), request).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "EXTRACTION_ERROR");
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_missing_jd_file_is_400() {
        let request = multipart_request(&[("resume_file", "resume.txt", "Jane Doe")]);

        let (status, body) = send(app(StubGenerator::replying("OK")), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("jd_file"));
    }

    #[tokio::test]
    async fn test_empty_json_resume_is_400() {
        let request = json_request(json!({"resume": "   ", "job_description": "Python"}));

        let (status, body) = send(app(StubGenerator::replying("OK")), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_content_type_is_400() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/tweak_resume")
            .header("content-type", "text/plain")
            .body(Body::from("resume and jd"))
            .unwrap();

        let (status, body) = send(app(StubGenerator::replying("OK")), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("resume_file"));
    }

    #[tokio::test]
    async fn test_list_models_proxies_catalog() {
        let request = axum::http::Request::builder()
            .uri("/list_models")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(app(StubGenerator::replying("OK")), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"available_models": ["stub-model"]}));
    }
}
