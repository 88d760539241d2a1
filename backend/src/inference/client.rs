use reqwest::Client as HttpClient;
use thiserror::Error;
use url::Url;

use crate::config::{ConfigError, UpstreamConfig};

use super::models::{ApiErrorBody, ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use super::prompt;
use super::request::{AnalysisRequest, ImagePayload};

/// Returned as the completion when no choice carries any text.
pub const EMPTY_COMPLETION: &str = "{}";

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
}

/// Client for an OpenAI-compatible chat-completion endpoint.
///
/// One call per analysis: no retries, and the HTTP client's default
/// timeouts apply.
#[derive(Clone)]
pub struct CompletionClient {
    http_client: HttpClient,
    endpoint: Url,
    api_key: String,
    model: String,
}

impl CompletionClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            http_client: HttpClient::new(),
            endpoint: config.completions_url()?,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends the image with the analysis prompt and returns the model's raw
    /// text. The image is validated before anything goes over the network.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<String, AnalysisError> {
        let image = ImagePayload::parse(&request.image_base64)?;

        if request.use_yolo {
            log::info!("Object detection requested but not available, sending the image as-is");
        }
        log::info!(
            "Sending {} image sha256:{} ({} bytes) to {}",
            image.mime_type(),
            image.short_digest(),
            image.byte_len(),
            self.model
        );

        self.complete(vec![prompt::user_message(&image)]).await
    }

    pub async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, AnalysisError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
        };

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(AnalysisError::Upstream {
                status: status.as_u16(),
                message: upstream_error_message(&text),
            });
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

        Ok(completion
            .first_text()
            .unwrap_or_else(|| EMPTY_COMPLETION.to_string()))
    }
}

fn upstream_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::prompt::ANALYSIS_PROMPT;
    use crate::test_support::{FakeUpstream, JPEG_BASE64, completion};
    use serde_json::json;

    #[actix_web::test]
    async fn sends_prompt_and_image_with_bearer_auth() {
        let upstream = FakeUpstream::start(200, completion("{\"severity\":\"低\"}")).await;
        let client = upstream.client();

        let raw = client
            .analyze(&AnalysisRequest::new(JPEG_BASE64, false))
            .await
            .unwrap();
        assert_eq!(raw, "{\"severity\":\"低\"}");

        let calls = upstream.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].authorization.as_deref(), Some("Bearer sk-test"));
        assert_eq!(calls[0].body["model"], "qwen-vl-test");
        let content = &calls[0].body["messages"][0]["content"];
        assert_eq!(content[0], json!({ "type": "text", "text": ANALYSIS_PROMPT }));
        assert_eq!(
            content[1]["image_url"]["url"],
            format!("data:image/jpeg;base64,{}", JPEG_BASE64)
        );
    }

    #[actix_web::test]
    async fn empty_image_is_rejected_without_a_call() {
        let upstream = FakeUpstream::start(200, completion("{}")).await;
        let client = upstream.client();

        let err = client
            .analyze(&AnalysisRequest::new("", false))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
        assert!(upstream.calls().is_empty());
    }

    #[actix_web::test]
    async fn missing_text_yields_placeholder() {
        let upstream = FakeUpstream::start(200, json!({ "choices": [] }).to_string()).await;
        let raw = upstream
            .client()
            .analyze(&AnalysisRequest::new(JPEG_BASE64, false))
            .await
            .unwrap();
        assert_eq!(raw, EMPTY_COMPLETION);
    }

    #[actix_web::test]
    async fn upstream_error_carries_its_message() {
        let body = json!({
            "error": {
                "message": "Incorrect API key provided.",
                "type": "invalid_request_error",
                "code": "invalid_api_key"
            }
        });
        let upstream = FakeUpstream::start(401, body.to_string()).await;

        let err = upstream
            .client()
            .analyze(&AnalysisRequest::new(JPEG_BASE64, false))
            .await
            .unwrap_err();
        match err {
            AnalysisError::Upstream { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[actix_web::test]
    async fn non_json_error_body_is_passed_through() {
        let upstream = FakeUpstream::start(502, "Bad Gateway").await;
        let err = upstream
            .client()
            .analyze(&AnalysisRequest::new(JPEG_BASE64, false))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "upstream returned 502: Bad Gateway");
    }

    #[actix_web::test]
    async fn success_without_choices_is_malformed() {
        let upstream = FakeUpstream::start(200, "{\"object\":\"list\"}").await;
        let err = upstream
            .client()
            .analyze(&AnalysisRequest::new(JPEG_BASE64, false))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }

    #[actix_web::test]
    async fn unreachable_upstream_is_an_http_error() {
        let config = UpstreamConfig::new("sk-test", "http://127.0.0.1:1/v1", "m").unwrap();
        let client = CompletionClient::new(&config).unwrap();
        let err = client
            .analyze(&AnalysisRequest::new(JPEG_BASE64, false))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Http(_)));
    }

    #[test]
    fn endpoint_is_resolved_once() {
        let config = UpstreamConfig::new("k", "https://api.openai.com/v1", "gpt-4o").unwrap();
        let client = CompletionClient::new(&config).unwrap();
        assert_eq!(client.endpoint().as_str(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(client.model(), "gpt-4o");
    }
}
