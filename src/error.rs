use thiserror::Error;

/// Low-level failure from the model backend.
///
/// Kept separate from [`MatchError`] so the retry layer can classify
/// transience without string matching on rendered messages.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode backend response: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Timeouts, connection failures, rate limits and server errors are
    /// worth retrying; everything else is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) | Self::Other(_) => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum MatchError {
    /// An agent name was referenced before registration. This is a wiring
    /// bug, never a runtime condition, and must not be silently recovered.
    #[error("Agent not registered: {0}")]
    AgentNotFound(String),

    #[error("Agent '{agent}' failed after {attempts} attempts: {message}")]
    AgentExhausted {
        agent: String,
        attempts: u32,
        message: String,
    },

    /// Model output could not be coerced into the expected structure.
    /// Carries the raw text for diagnostics.
    #[error("Structured response validation failed: {message}")]
    Validation { message: String, raw: String },

    #[error("No trials found for the given condition")]
    NoTrialsFound,

    #[error("No trials matched the illness keywords")]
    NoRelevantTrialsFound,

    #[error("Session state not found or expired")]
    SessionExpired,

    #[error("Question '{0}' does not belong to the current trial")]
    UnknownQuestion(String),

    #[error("Question '{0}' was already answered")]
    DuplicateAnswer(String),

    #[error("Trial registry error: {0}")]
    Registry(String),

    #[error("Model backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

impl MatchError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Backend(e) => e.is_transient(),
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, MatchError>;
