use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{MatchError, Result};

pub const DEFAULT_MODEL: &str = "mistral-small-latest";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub agent: AgentDefaults,
    pub registry: RegistryConfig,
    pub questions: QuestionConfig,
    pub explanation: ExplanationConfig,
    pub language: LanguageConfig,
    pub session: SessionStorageConfig,
}

impl MatchConfig {
    pub async fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join("config.toml");
        let config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).await?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, config_dir: &Path) -> Result<()> {
        self.validate()?;
        let config_path = config_dir.join("config.toml");
        let content =
            toml::to_string_pretty(self).map_err(|e| MatchError::Config(e.to_string()))?;
        fs::write(&config_path, content).await?;
        Ok(())
    }

    /// Validate configuration values for consistency and safety.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.agent.max_retries == 0 {
            errors.push("agent.max_retries must be greater than 0");
        }
        if self.agent.base_delay_secs < 0.0 {
            errors.push("agent.base_delay_secs must not be negative");
        }
        if self.agent.timeout_secs == 0 {
            errors.push("agent.timeout_secs must be greater than 0");
        }
        if self.agent.model.is_empty() {
            errors.push("agent.model must not be empty");
        }
        if !(0.0..=2.0).contains(&self.agent.temperature) {
            errors.push("agent.temperature must be between 0.0 and 2.0");
        }

        if self.registry.base_url.is_empty() {
            errors.push("registry.base_url must not be empty");
        }
        if self.registry.page_size_limit == 0 {
            errors.push("registry.page_size_limit must be greater than 0");
        }
        if self.registry.status_filter.is_empty() {
            errors.push("registry.status_filter must not be empty");
        }

        if self.questions.max_per_category == 0 {
            errors.push("questions.max_per_category must be greater than 0");
        }

        if self.explanation.max_attempts == 0 {
            errors.push("explanation.max_attempts must be greater than 0");
        }
        if self.explanation.min_comprehension_score > 100 {
            errors.push("explanation.min_comprehension_score must be at most 100");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(MatchError::Config(errors.join("; ")))
        }
    }
}

/// Calling convention shared by every registered agent unless overridden
/// at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentDefaults {
    pub model: String,
    pub temperature: f32,
    pub max_retries: u32,
    pub base_delay_secs: f64,
    pub timeout_secs: u64,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_retries: 3,
            base_delay_secs: 5.0,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub base_url: String,
    /// Hard page-size cap imposed by the upstream API.
    pub page_size_limit: usize,
    pub status_filter: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://clinicaltrials.gov/api/v2/studies".to_string(),
            page_size_limit: 100,
            status_filter: vec![
                "RECRUITING".to_string(),
                "NOT_YET_RECRUITING".to_string(),
                "ENROLLING_BY_INVITATION".to_string(),
                "ACTIVE_NOT_RECRUITING".to_string(),
            ],
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionConfig {
    pub max_per_category: usize,
    /// Pause between per-trial generation calls. Rate-limit courtesy toward
    /// the upstream model API; batch generation is strictly sequential.
    pub inter_trial_delay_ms: u64,
}

impl Default for QuestionConfig {
    fn default() -> Self {
        Self {
            max_per_category: 10,
            inter_trial_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplanationConfig {
    pub max_attempts: u32,
    pub min_comprehension_score: u32,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_comprehension_score: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Translate generated questions into the detected patient language.
    pub translate_questions: bool,
    /// Input prefix length sent to the detection prompt.
    pub detection_sample_chars: usize,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            translate_questions: false,
            detection_sample_chars: 500,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionStorageConfig {
    /// Directory for per-session state files. Falls back to the system
    /// temp directory when unset.
    pub data_dir: Option<PathBuf>,
}

impl SessionStorageConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}
