#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use trialmatch::agent::{ModelBackend, ModelRequest, ModelResponse};
use trialmatch::config::AgentDefaults;
use trialmatch::error::{BackendError, Result};

/// Scripted backend: replays queued replies in order and counts calls.
/// An error entry simulates one transport failure; an exhausted script
/// fails loudly so a test never passes on an unplanned extra call.
pub struct MockBackend {
    script: Mutex<VecDeque<Result<String>>>,
    calls: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.script.lock().push_back(Ok(text.into()));
        self
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .push_back(Err(BackendError::Connect(message.into()).into()));
        self
    }

    pub fn fail_status(self, status: u16, body: impl Into<String>) -> Self {
        self.script.lock().push_back(Err(BackendError::Status {
            status,
            body: body.into(),
        }
        .into()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    async fn send(&self, _request: ModelRequest) -> Result<ModelResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().pop_front() {
            Some(Ok(text)) => Ok(ModelResponse::from(text)),
            Some(Err(e)) => Err(e),
            None => Err(BackendError::Other("mock script exhausted".into()).into()),
        }
    }
}

/// Defaults tuned for tests: no backoff sleeping.
pub fn fast_defaults() -> AgentDefaults {
    AgentDefaults {
        base_delay_secs: 0.0,
        ..AgentDefaults::default()
    }
}
