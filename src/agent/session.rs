use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::RwLock;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use super::backend::{ChatMessage, ModelBackend};
use super::client::{Parsed, StructuredModelClient};
use crate::config::AgentDefaults;
use crate::error::{MatchError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    JsonObject,
}

/// Configuration for one named agent: model identity, sampling, and the
/// expected response shape. Set once at registration, reused per call.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub model: String,
    pub temperature: f32,
    pub description: String,
    pub response_format: ResponseFormat,
    pub max_tokens: Option<u32>,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            temperature: 0.7,
            description: String::new(),
            response_format: ResponseFormat::Text,
            max_tokens: None,
        }
    }

    pub fn from_defaults(name: impl Into<String>, defaults: &AgentDefaults) -> Self {
        Self {
            name: name.into(),
            model: defaults.model.clone(),
            temperature: defaults.temperature,
            description: String::new(),
            response_format: ResponseFormat::Text,
            max_tokens: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Retry settings shared by all calls through one session.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            base_delay,
        }
    }
}

impl From<&AgentDefaults> for RetryPolicy {
    fn from(defaults: &AgentDefaults) -> Self {
        Self::new(
            defaults.max_retries,
            Duration::from_secs_f64(defaults.base_delay_secs),
        )
    }
}

/// Delay before attempt `n` (1-indexed): linear in the attempt index,
/// `base * (n - 1)`, zero before the first attempt.
///
/// Linear, not exponential. Preserved deliberately from the reference
/// behavior; do not "improve" without flagging the change.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    policy.base_delay * attempt.saturating_sub(1)
}

struct AgentEntry {
    config: AgentConfig,
    history: Vec<ChatMessage>,
}

/// Registry of named agents plus the bounded-retry calling convention.
///
/// Scoped to one workflow run: constructed around each pipeline execution
/// and dropped afterwards, never a process-wide global. Retry state is local
/// to each call, so concurrent calls through one session never interfere.
pub struct AgentSession {
    client: StructuredModelClient,
    agents: RwLock<HashMap<String, AgentEntry>>,
    retry: RetryPolicy,
}

impl AgentSession {
    pub fn new(backend: Arc<dyn ModelBackend>, defaults: &AgentDefaults) -> Self {
        Self {
            client: StructuredModelClient::new(
                backend,
                Duration::from_secs(defaults.timeout_secs),
            ),
            agents: RwLock::new(HashMap::new()),
            retry: RetryPolicy::from(defaults),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Register an agent under its configured name. Re-registering an
    /// existing name replaces the configuration and clears its history.
    pub fn register(&self, config: AgentConfig) {
        let name = config.name.clone();
        let mut agents = self.agents.write();
        if agents.contains_key(&name) {
            warn!(agent = %name, "Replacing existing agent registration");
        }
        debug!(agent = %name, model = %config.model, "Agent registered");
        agents.insert(
            name,
            AgentEntry {
                config,
                history: Vec::new(),
            },
        );
    }

    pub fn agent_names(&self) -> Vec<String> {
        self.agents.read().keys().cloned().collect()
    }

    pub fn remove(&self, name: &str) -> bool {
        self.agents.write().remove(name).is_some()
    }

    pub fn clear_history(&self, name: &str) {
        if let Some(entry) = self.agents.write().get_mut(name) {
            entry.history.clear();
        }
    }

    fn lookup(&self, name: &str) -> Result<(AgentConfig, Vec<ChatMessage>)> {
        let agents = self.agents.read();
        let entry = agents
            .get(name)
            .ok_or_else(|| MatchError::AgentNotFound(name.to_string()))?;
        Ok((entry.config.clone(), entry.history.clone()))
    }

    fn record_exchange(&self, name: &str, prompt: &str, reply: &str) {
        if let Some(entry) = self.agents.write().get_mut(name) {
            entry.history.push(ChatMessage::user(prompt));
            entry.history.push(ChatMessage::assistant(reply));
        }
    }

    /// Send a prompt through a named agent, retrying transient failures
    /// with linear backoff. At most `max_retries` underlying calls are
    /// made; permanent errors surface immediately.
    pub async fn chat_with_retry(&self, agent_name: &str, prompt: &str) -> Result<String> {
        let (config, _) = self.lookup(agent_name)?;
        let reply = self
            .with_retry(agent_name, || self.client.call(&config, &[], prompt))
            .await?;
        Ok(reply)
    }

    /// Like [`Self::chat_with_retry`] but the agent's accumulated
    /// conversation history is prepended, and the exchange is recorded.
    pub async fn chat_with_history(&self, agent_name: &str, prompt: &str) -> Result<String> {
        let (config, history) = self.lookup(agent_name)?;
        let reply = self
            .with_retry(agent_name, || self.client.call(&config, &history, prompt))
            .await?;
        self.record_exchange(agent_name, prompt, &reply);
        Ok(reply)
    }

    /// Structured variant: the response is coerced into `T`, degrading to
    /// raw text when coercion fails. Transport failures still retry.
    pub async fn chat_structured_with_retry<T>(
        &self,
        agent_name: &str,
        prompt: &str,
    ) -> Result<Parsed<T>>
    where
        T: DeserializeOwned + JsonSchema + Send + 'static,
    {
        let (config, _) = self.lookup(agent_name)?;
        self.with_retry(agent_name, || {
            self.client.call_structured::<T>(&config, &[], prompt)
        })
        .await
    }

    /// Structured variant that demands a shaped result. Validation failures
    /// are retried too: a fresh sample may well parse where the last one
    /// did not.
    pub async fn chat_structured_strict<T>(&self, agent_name: &str, prompt: &str) -> Result<T>
    where
        T: DeserializeOwned + JsonSchema + Send + 'static,
    {
        let (config, _) = self.lookup(agent_name)?;
        self.with_retry(agent_name, || {
            self.client.call_structured_strict::<T>(&config, &[], prompt)
        })
        .await
    }

    /// Fire several independent agent calls concurrently and gather all of
    /// them. Partial failures are captured as per-call error values; the
    /// gather itself never aborts.
    pub async fn chat_many(&self, requests: Vec<(String, String)>) -> Vec<Result<String>> {
        let total = requests.len();
        debug!(requests = total, "Dispatching concurrent agent calls");
        let futures = requests
            .into_iter()
            .map(|(agent, prompt)| async move { self.chat_with_retry(&agent, &prompt).await });
        let results = join_all(futures).await;
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        info!(succeeded, total, "Concurrent agent calls completed");
        results
    }

    async fn with_retry<T, F, Fut>(&self, agent_name: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max = self.retry.max_retries;
        let mut last_error: Option<MatchError> = None;

        for attempt in 1..=max {
            let delay = backoff_delay(&self.retry, attempt);
            if !delay.is_zero() {
                debug!(
                    agent = %agent_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }

            match call().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(agent = %agent_name, attempt, "Agent call succeeded after retry");
                    }
                    return Ok(value);
                }
                // Transient transport failures and validation misses are
                // worth another sample; anything else fails right away
                // instead of burning the remaining attempts.
                Err(e) if e.is_transient() || matches!(e, MatchError::Validation { .. }) => {
                    warn!(
                        agent = %agent_name,
                        attempt,
                        max_attempts = max,
                        error = %e,
                        "Agent call failed"
                    );
                    last_error = Some(e);
                }
                Err(e) => {
                    error!(agent = %agent_name, attempt, error = %e, "Agent call failed permanently");
                    return Err(e);
                }
            }
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts were made".to_string());
        error!(agent = %agent_name, attempts = max, "Agent retries exhausted");
        Err(MatchError::AgentExhausted {
            agent: agent_name.to_string(),
            attempts: max,
            message,
        })
    }
}
