use serde::Deserialize;

/// Model responses arrive in several shapes depending on the backend:
/// chat-completion objects with a `choices` path, bare content objects, or
/// plain strings. The untagged enum absorbs all of them at deserialization
/// time so shape handling never leaks into business logic.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ModelResponse {
    Chat { choices: Vec<Choice> },
    Content { content: String },
    Raw(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl From<String> for ModelResponse {
    fn from(text: String) -> Self {
        Self::Content { content: text }
    }
}

impl From<&str> for ModelResponse {
    fn from(text: &str) -> Self {
        Self::Content {
            content: text.to_string(),
        }
    }
}

/// Best-effort text extraction from any response shape.
///
/// Ordered fallback chain: first choice message content, then a bare
/// content field, then a raw JSON string, then the stringified value.
pub struct ResponseExtractor;

impl ResponseExtractor {
    pub fn extract_text(response: &ModelResponse) -> String {
        match response {
            ModelResponse::Chat { choices } => choices
                .first()
                .and_then(|c| c.message.content.clone())
                .unwrap_or_default(),
            ModelResponse::Content { content } => content.clone(),
            ModelResponse::Raw(value) => match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }
    }
}
