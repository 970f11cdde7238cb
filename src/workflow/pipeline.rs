use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::agent::{AgentSession, ModelBackend};
use crate::config::MatchConfig;
use crate::eligibility::{AnswerValue, NextStep, SessionState, StepOutcome, TrialMatchResult};
use crate::error::{MatchError, Result};
use crate::explanation::{ExplanationOutcome, ExplanationService};
use crate::filter;
use crate::illness::IllnessExtractor;
use crate::language::LanguageService;
use crate::questions::{QuestionGenerator, TrialQuestions};
use crate::registry::TrialRegistryClient;
use crate::session::SessionStore;

/// What a completed pipeline run produced, before any answers arrive.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub session_key: String,
    pub illness_name: String,
    pub language: String,
    pub trials_fetched: usize,
    pub trials_relevant: usize,
    pub trials_with_questions: usize,
    pub total_questions: usize,
}

/// Owns every pipeline stage and the session store. One instance serves many
/// concurrent patients; per-patient state lives entirely in the store.
pub struct MatchWorkflow {
    config: MatchConfig,
    registry: TrialRegistryClient,
    store: Arc<dyn SessionStore>,
    extractor: IllnessExtractor,
    questions: QuestionGenerator,
    language: LanguageService,
    explanations: ExplanationService,
}

impl MatchWorkflow {
    pub fn new(
        config: MatchConfig,
        backend: Arc<dyn ModelBackend>,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        config.validate()?;
        let session = Arc::new(AgentSession::new(backend, &config.agent));
        let registry = TrialRegistryClient::new(&config.registry)?;
        let extractor = IllnessExtractor::new(Arc::clone(&session), &config.agent);
        let questions =
            QuestionGenerator::new(Arc::clone(&session), &config.agent, &config.questions);
        let language = LanguageService::new(Arc::clone(&session), &config.agent, &config.language);
        let explanations =
            ExplanationService::new(Arc::clone(&session), &config.agent, &config.explanation);
        Ok(Self {
            config,
            registry,
            store,
            extractor,
            questions,
            language,
            explanations,
        })
    }

    /// Runs the full pre-interview pipeline and persists the resulting
    /// session state under a fresh key.
    pub async fn run(&self, description: &str, max_studies: usize) -> Result<WorkflowReport> {
        let language = if self.config.language.translate_questions {
            self.language.detect_language(description).await?
        } else {
            "en".to_string()
        };

        let profile = self.extractor.analyze(description).await?;
        info!(illness = %profile.illness_name, "Illness profile extracted");

        let fetched = self
            .registry
            .fetch(&profile.illness_name, max_studies)
            .await?;
        if fetched.is_empty() {
            return Err(MatchError::NoTrialsFound);
        }
        let trials_fetched = fetched.len();

        let scored = filter::filter_by_keywords(fetched, &profile);
        if scored.is_empty() {
            return Err(MatchError::NoRelevantTrialsFound);
        }
        let trials_relevant = scored.len();

        let candidates = filter::extract_eligibility(scored);
        let mut trials = self.questions.generate_for_all(&candidates).await;

        self.translate_trials(&mut trials, &language).await;

        let total_questions = trials.iter().map(|t| t.total()).sum();
        let trials_with_questions = trials.len();
        let state = SessionState::new(description.to_string(), language.clone(), trials);
        let session_key = self.store.initialize_key();
        self.store.save(&session_key, &state).await?;
        info!(
            session = %session_key,
            trials_fetched,
            trials_relevant,
            trials_with_questions,
            "Pipeline run complete"
        );

        Ok(WorkflowReport {
            session_key,
            illness_name: profile.illness_name,
            language,
            trials_fetched,
            trials_relevant,
            trials_with_questions,
            total_questions,
        })
    }

    /// Translates every trial's questions in place. A failed translation
    /// leaves that trial's wording in English rather than aborting the run.
    async fn translate_trials(&self, trials: &mut [TrialQuestions], language: &str) {
        if language == "en" {
            return;
        }
        for trial in trials {
            let translated = match self
                .language
                .translate_questions(&mut trial.inclusion, language)
                .await
            {
                Ok(()) => {
                    self.language
                        .translate_questions(&mut trial.exclusion, language)
                        .await
                }
                Err(e) => Err(e),
            };
            if let Err(error) = translated {
                warn!(
                    nct_id = %trial.nct_id,
                    %error,
                    "Translation failed, keeping English wording"
                );
            }
        }
    }

    /// The next question for a session, or the final results when the
    /// interview is over. Vacuous trials finalized on the way are persisted.
    pub async fn current_question(&self, session_key: &str) -> Result<NextStep> {
        let mut state = self.load(session_key).await?;
        let step = state.next_step();
        self.store.save(session_key, &state).await?;
        Ok(step)
    }

    /// Applies one answer to a session and persists the new state.
    pub async fn submit_answer(
        &self,
        session_key: &str,
        question_id: &str,
        answer: AnswerValue,
    ) -> Result<StepOutcome> {
        let mut state = self.load(session_key).await?;
        let outcome = state.submit_answer(question_id, answer)?;
        self.store.save(session_key, &state).await?;
        Ok(outcome)
    }

    /// Verdicts so far, best match first.
    pub async fn results(&self, session_key: &str) -> Result<Vec<TrialMatchResult>> {
        Ok(self.load(session_key).await?.ranked_results())
    }

    /// Plain-language explanation of one resolved trial's verdict.
    pub async fn explain(
        &self,
        session_key: &str,
        nct_id: &str,
    ) -> Result<ExplanationOutcome> {
        let state = self.load(session_key).await?;
        let result = state
            .result_for(nct_id)
            .ok_or_else(|| MatchError::Other(format!("No verdict yet for trial {nct_id}")))?;
        let trial = state
            .trials
            .iter()
            .find(|t| t.nct_id == nct_id)
            .ok_or_else(|| MatchError::Other(format!("Trial {nct_id} not in session")))?;
        self.explanations
            .explain(result, trial, state.answers_for(nct_id))
            .await
    }

    /// Drops a session's persisted state.
    pub async fn end_session(&self, session_key: &str) -> Result<()> {
        self.store.remove(session_key).await
    }

    async fn load(&self, session_key: &str) -> Result<SessionState> {
        match self.store.load(session_key).await? {
            Some(state) => Ok(state),
            None => {
                warn!(session = %session_key, "Unknown or expired session requested");
                Err(MatchError::SessionExpired)
            }
        }
    }
}
