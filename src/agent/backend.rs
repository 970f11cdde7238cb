use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::response::ModelResponse;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One fully-specified model call.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    /// Ask the backend for a JSON-object response when it supports the hint.
    pub json_response: bool,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

/// A language-model backend. Any implementation satisfying this trait is
/// interchangeable: remote API, local proxy, local inference server, or a
/// scripted mock in tests.
///
/// No retries at this layer; resilience belongs to the caller.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn send(&self, request: ModelRequest) -> Result<ModelResponse>;
}
