//! Cohere Chat (v2) backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    ensure_success, http_client, non_empty, GenerationOptions, LlmError, Provider, TextGenerator,
};

pub const DEFAULT_BASE_URL: &str = "https://api.cohere.com";
pub const DEFAULT_MODEL: &str = "command-r-plus";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub message: Option<AssistantMessage>,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub billed_units: Option<BilledUnits>,
}

#[derive(Debug, Deserialize)]
pub struct BilledUnits {
    #[serde(default)]
    pub input_tokens: f64,
    #[serde(default)]
    pub output_tokens: f64,
}

impl ChatResponse {
    /// Concatenated text blocks of the assistant message.
    pub fn text(&self) -> Option<String> {
        let message = self.message.as_ref()?;
        Some(
            message
                .content
                .iter()
                .filter(|b| b.block_type == "text")
                .filter_map(|b| b.text.as_deref())
                .collect(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body).ok().map(|e| e.message)
}

#[derive(Clone)]
pub struct CohereClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl CohereClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TextGenerator for CohereClient {
    fn provider(&self) -> Provider {
        Provider::Cohere
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let request_body = ChatRequest {
            model: &options.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: options.temperature,
            max_tokens: options.max_output_tokens,
        };

        let response = self
            .client
            .post(format!("{}/v2/chat", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;
        let response = ensure_success(response, error_message).await?;

        let parsed: ChatResponse = serde_json::from_str(&response.text().await?)?;

        if let Some(units) = parsed.usage.as_ref().and_then(|u| u.billed_units.as_ref()) {
            debug!(
                "Cohere call succeeded: model={}, input_tokens={}, output_tokens={}, finish={:?}",
                options.model,
                units.input_tokens,
                units.output_tokens,
                parsed.finish_reason
            );
        }

        non_empty(parsed.text().unwrap_or_default())
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let response = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .bearer_auth(&self.api_key)
            .query(&[("endpoint", "chat"), ("page_size", "1000")])
            .send()
            .await?;
        let response = ensure_success(response, error_message).await?;

        let list: ModelList = serde_json::from_str(&response.text().await?)?;
        Ok(list.models.into_iter().map(|m| m.name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> CohereClient {
        CohereClient::new(
            "co-key".to_string(),
            server.uri(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_text_skips_non_text_blocks() {
        let parsed: ChatResponse = serde_json::from_value(json!({
            "message": {
                "role": "assistant",
                "content": [
                    {"type": "thinking", "thinking": "..."},
                    {"type": "text", "text": "Result"}
                ]
            },
            "finish_reason": "COMPLETE"
        }))
        .unwrap();
        assert_eq!(parsed.text().as_deref(), Some("Result"));
    }

    #[tokio::test]
    async fn test_generate_sends_chat_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/chat"))
            .and(header("authorization", "Bearer co-key"))
            .and(body_partial_json(json!({
                "model": "command-r-plus",
                "messages": [{"role": "user", "content": "PROMPT"}],
                "max_tokens": 800
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "abc",
                "finish_reason": "COMPLETE",
                "message": {
                    "role": "assistant",
                    "content": [{"type": "text", "text": " Tailored \n"}]
                },
                "usage": {"billed_units": {"input_tokens": 10, "output_tokens": 2}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut options = GenerationOptions::new(DEFAULT_MODEL);
        options.max_output_tokens = Some(800);
        let text = client(&server).generate("PROMPT", &options).await.unwrap();
        assert_eq!(text, "Tailored");
    }

    #[tokio::test]
    async fn test_generate_surfaces_api_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/chat"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "invalid api token"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .generate("PROMPT", &GenerationOptions::new(DEFAULT_MODEL))
            .await
            .unwrap_err();
        let LlmError::Api { status, message } = err else {
            panic!("expected an API error, got {err:?}");
        };
        assert_eq!(status, 401);
        assert_eq!(message, "invalid api token");
    }

    #[tokio::test]
    async fn test_missing_message_is_empty_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "abc"})))
            .mount(&server)
            .await;

        let err = client(&server)
            .generate("PROMPT", &GenerationOptions::new(DEFAULT_MODEL))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }

    #[tokio::test]
    async fn test_list_models_requests_chat_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .and(query_param("endpoint", "chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [
                    {"name": "command-r-plus", "endpoints": ["generate", "chat"]},
                    {"name": "command-r", "endpoints": ["chat"]}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let models = client(&server).list_models().await.unwrap();
        assert_eq!(models, vec!["command-r-plus", "command-r"]);
    }
}
