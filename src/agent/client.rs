use std::sync::Arc;
use std::time::Duration;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::backend::{ChatMessage, ModelBackend, ModelRequest};
use super::json_extract;
use super::response::ResponseExtractor;
use super::session::{AgentConfig, ResponseFormat};
use crate::error::{MatchError, Result};

/// Outcome of a shape-coerced model call.
///
/// Coercion failure is not an error by default: chatty or malformed output
/// degrades to the raw text so callers can apply their own recovery.
#[derive(Debug, Clone)]
pub enum Parsed<T> {
    Structured(T),
    Unstructured(String),
}

impl<T> Parsed<T> {
    pub fn structured(self) -> Option<T> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Unstructured(_) => None,
        }
    }
}

/// Sends one prompt to the backend and parses the response into a declared
/// result shape, tolerating free-form or malformed output.
///
/// No retries here; that is [`super::AgentSession`]'s job.
#[derive(Clone)]
pub struct StructuredModelClient {
    backend: Arc<dyn ModelBackend>,
    timeout: Duration,
}

impl StructuredModelClient {
    pub fn new(backend: Arc<dyn ModelBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    fn build_request(
        &self,
        agent: &AgentConfig,
        history: &[ChatMessage],
        prompt: &str,
        force_json: bool,
    ) -> ModelRequest {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(prompt));

        ModelRequest {
            model: agent.model.clone(),
            messages,
            temperature: agent.temperature,
            json_response: force_json || agent.response_format == ResponseFormat::JsonObject,
            max_tokens: agent.max_tokens,
            timeout: self.timeout,
        }
    }

    /// Send a prompt and return the response as best-effort text.
    pub async fn call(
        &self,
        agent: &AgentConfig,
        history: &[ChatMessage],
        prompt: &str,
    ) -> Result<String> {
        debug!(agent = %agent.name, prompt_len = prompt.len(), "Sending prompt");
        let request = self.build_request(agent, history, prompt, false);
        let response = self.backend.send(request).await?;
        Ok(ResponseExtractor::extract_text(&response))
    }

    /// Send a prompt and coerce the response into `T`.
    ///
    /// Extracts the first well-formed JSON object found anywhere in the
    /// response text; the whole response need not be JSON. On extraction or
    /// deserialization failure the raw text is returned unshaped.
    pub async fn call_structured<T>(
        &self,
        agent: &AgentConfig,
        history: &[ChatMessage],
        prompt: &str,
    ) -> Result<Parsed<T>>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let request = self.build_request(agent, history, prompt, true);
        let response = self.backend.send(request).await?;
        let text = ResponseExtractor::extract_text(&response);
        Ok(Self::coerce(agent, text))
    }

    /// Like [`Self::call_structured`] but a shaped result is mandatory:
    /// coercion failure raises a validation error carrying the raw text.
    pub async fn call_structured_strict<T>(
        &self,
        agent: &AgentConfig,
        history: &[ChatMessage],
        prompt: &str,
    ) -> Result<T>
    where
        T: DeserializeOwned + JsonSchema,
    {
        match self.call_structured(agent, history, prompt).await? {
            Parsed::Structured(value) => Ok(value),
            Parsed::Unstructured(raw) => Err(MatchError::Validation {
                message: format!(
                    "agent '{}' did not return a parseable {} object",
                    agent.name,
                    std::any::type_name::<T>()
                ),
                raw,
            }),
        }
    }

    fn coerce<T>(agent: &AgentConfig, text: String) -> Parsed<T>
    where
        T: DeserializeOwned,
    {
        let Some(object) = json_extract::first_object(&text) else {
            warn!(agent = %agent.name, "No JSON object found in response");
            return Parsed::Unstructured(text);
        };
        match serde_json::from_value::<T>(object) {
            Ok(value) => Parsed::Structured(value),
            Err(e) => {
                warn!(agent = %agent.name, error = %e, "Response failed shape validation");
                Parsed::Unstructured(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Shape {
        name: String,
        #[serde(default)]
        tags: Vec<String>,
    }

    fn test_agent() -> AgentConfig {
        AgentConfig::new("tester", "test-model")
    }

    #[test]
    fn coerce_accepts_wrapped_json() {
        let text = "Here you go: {\"name\": \"flu\"} hope that helps".to_string();
        let parsed: Parsed<Shape> = StructuredModelClient::coerce(&test_agent(), text);
        let shape = parsed.structured().unwrap();
        assert_eq!(shape.name, "flu");
        assert!(shape.tags.is_empty());
    }

    #[test]
    fn coerce_defaults_optional_fields() {
        let text = r#"{"name": "flu", "tags": ["viral"]}"#.to_string();
        let parsed: Parsed<Shape> = StructuredModelClient::coerce(&test_agent(), text);
        assert_eq!(parsed.structured().unwrap().tags, vec!["viral"]);
    }

    #[test]
    fn coerce_degrades_on_missing_required_field() {
        let text = r#"{"tags": ["viral"]}"#.to_string();
        let parsed: Parsed<Shape> = StructuredModelClient::coerce(&test_agent(), text.clone());
        match parsed {
            Parsed::Unstructured(raw) => assert_eq!(raw, text),
            Parsed::Structured(_) => panic!("required field was missing"),
        }
    }

    #[test]
    fn coerce_degrades_on_prose() {
        let parsed: Parsed<Shape> =
            StructuredModelClient::coerce(&test_agent(), "no json at all".to_string());
        assert!(matches!(parsed, Parsed::Unstructured(_)));
    }
}
