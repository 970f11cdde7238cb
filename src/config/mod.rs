mod settings;

pub use settings::{
    AgentDefaults, ExplanationConfig, LanguageConfig, MatchConfig, QuestionConfig, RegistryConfig,
    SessionStorageConfig,
};
