use trialmatch::config::MatchConfig;
use trialmatch::error::MatchError;

#[test]
fn test_default_config() {
    let config = MatchConfig::default();

    assert_eq!(config.agent.model, "mistral-small-latest");
    assert_eq!(config.agent.max_retries, 3);
    assert!((config.agent.base_delay_secs - 5.0).abs() < f64::EPSILON);
    assert_eq!(config.agent.timeout_secs, 30);

    assert_eq!(
        config.registry.base_url,
        "https://clinicaltrials.gov/api/v2/studies"
    );
    assert_eq!(config.registry.page_size_limit, 100);
    assert_eq!(config.registry.status_filter.len(), 4);
    assert!(config
        .registry
        .status_filter
        .contains(&"RECRUITING".to_string()));

    assert_eq!(config.questions.max_per_category, 10);
    assert_eq!(config.questions.inter_trial_delay_ms, 1000);

    assert_eq!(config.explanation.max_attempts, 3);
    assert_eq!(config.explanation.min_comprehension_score, 60);

    assert!(!config.language.translate_questions);
    assert_eq!(config.language.detection_sample_chars, 500);

    assert!(config.session.data_dir.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_validation_collects_all_violations() {
    let mut config = MatchConfig::default();
    config.agent.max_retries = 0;
    config.agent.model = String::new();
    config.registry.page_size_limit = 0;

    let err = config.validate().unwrap_err();
    let MatchError::Config(message) = err else {
        panic!("expected a config error");
    };
    assert!(message.contains("agent.max_retries"));
    assert!(message.contains("agent.model"));
    assert!(message.contains("registry.page_size_limit"));
}

#[test]
fn test_temperature_bounds_are_enforced() {
    let mut config = MatchConfig::default();
    config.agent.temperature = 2.5;
    assert!(config.validate().is_err());
    config.agent.temperature = 2.0;
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_toml_fills_remaining_defaults() {
    let config: MatchConfig = toml::from_str(
        r#"
        [agent]
        model = "mixtral"
        max_retries = 5

        [explanation]
        min_comprehension_score = 75
        "#,
    )
    .unwrap();

    assert_eq!(config.agent.model, "mixtral");
    assert_eq!(config.agent.max_retries, 5);
    // Untouched sections keep their defaults.
    assert_eq!(config.agent.timeout_secs, 30);
    assert_eq!(config.explanation.min_comprehension_score, 75);
    assert_eq!(config.explanation.max_attempts, 3);
    assert_eq!(config.registry.page_size_limit, 100);
}

#[tokio::test]
async fn test_config_round_trips_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = MatchConfig::default();
    config.agent.model = "custom-model".to_string();
    config.questions.max_per_category = 7;
    config.save(dir.path()).await.unwrap();

    let loaded = MatchConfig::load(dir.path()).await.unwrap();
    assert_eq!(loaded.agent.model, "custom-model");
    assert_eq!(loaded.questions.max_per_category, 7);
}

#[tokio::test]
async fn test_missing_config_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = MatchConfig::load(dir.path()).await.unwrap();
    assert_eq!(config.agent.model, "mistral-small-latest");
}

#[tokio::test]
async fn test_invalid_config_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(
        dir.path().join("config.toml"),
        "[agent]\nmax_retries = 0\n",
    )
    .await
    .unwrap();
    assert!(MatchConfig::load(dir.path()).await.is_err());
}

#[test]
fn test_session_dir_falls_back_to_temp() {
    let config = MatchConfig::default();
    assert_eq!(config.session.resolved_dir(), std::env::temp_dir());
}
