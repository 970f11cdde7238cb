use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::backend::{ChatMessage, ModelBackend, ModelRequest};
use super::response::ModelResponse;
use crate::error::{BackendError, Result};

/// OpenAI-compatible chat-completions backend.
///
/// Works against remote APIs, LiteLLM-style proxies, and local inference
/// servers exposing the `/chat/completions` surface; all three are
/// configured with nothing more than a base URL and an optional key.
pub struct OpenAiBackend {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormatHint>,
}

#[derive(Serialize)]
struct ResponseFormatHint {
    #[serde(rename = "type")]
    kind: &'static str,
}

impl OpenAiBackend {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    async fn send(&self, request: ModelRequest) -> Result<ModelResponse> {
        let body = CompletionBody {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request
                .json_response
                .then_some(ResponseFormatHint { kind: "json_object" }),
        };

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            json = request.json_response,
            "Sending completion request"
        );

        let mut builder = self
            .client
            .post(self.completions_url())
            .timeout(request.timeout)
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout
            } else if e.is_connect() {
                BackendError::Connect(self.base_url.clone())
            } else {
                BackendError::Other(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let parsed: ModelResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(parsed)
    }
}
