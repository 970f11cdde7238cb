use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::agent::{AgentConfig, AgentSession, ResponseFormat};
use crate::config::{AgentDefaults, QuestionConfig};
use crate::error::Result;
use crate::registry::TrialCandidate;

use super::model::{assign_ids, QuestionCategory, QuestionSet, TrialQuestions};

const AGENT_NAME: &str = "question_generator";

/// Turns eligibility criteria text into patient-facing yes/no questions,
/// one model call per trial.
pub struct QuestionGenerator {
    session: Arc<AgentSession>,
    max_per_category: usize,
    inter_trial_delay: Duration,
}

impl QuestionGenerator {
    pub fn new(
        session: Arc<AgentSession>,
        defaults: &AgentDefaults,
        config: &QuestionConfig,
    ) -> Self {
        session.register(
            AgentConfig::from_defaults(AGENT_NAME, defaults)
                .with_description("Converts trial eligibility criteria into yes/no questions")
                .with_response_format(ResponseFormat::JsonObject),
        );
        Self {
            session,
            max_per_category: config.max_per_category,
            inter_trial_delay: Duration::from_millis(config.inter_trial_delay_ms),
        }
    }

    /// Generates and numbers questions for a single trial. The model must
    /// return the declared JSON shape; unparseable output exhausts retries
    /// and propagates as an error.
    pub async fn generate_for_trial(&self, candidate: &TrialCandidate) -> Result<TrialQuestions> {
        let prompt = build_generation_prompt(candidate, self.max_per_category);
        let set: QuestionSet = self
            .session
            .chat_structured_strict(AGENT_NAME, &prompt)
            .await?;

        let trial = TrialQuestions {
            nct_id: candidate.nct_id.clone(),
            title: candidate.title.clone(),
            num_keywords: candidate.num_keywords,
            total_occurrences: candidate.total_occurrences,
            inclusion: assign_ids(
                &candidate.nct_id,
                QuestionCategory::Inclusion,
                set.inclusion_questions,
                self.max_per_category,
            ),
            exclusion: assign_ids(
                &candidate.nct_id,
                QuestionCategory::Exclusion,
                set.exclusion_questions,
                self.max_per_category,
            ),
        };
        info!(
            nct_id = %trial.nct_id,
            inclusion = trial.inclusion.len(),
            exclusion = trial.exclusion.len(),
            "Generated questions"
        );
        Ok(trial)
    }

    /// Sequential batch generation with a courtesy pause between trials.
    /// Trials without usable criteria are skipped up front; a trial whose
    /// generation fails after retries is logged and skipped rather than
    /// failing the batch.
    pub async fn generate_for_all(&self, candidates: &[TrialCandidate]) -> Vec<TrialQuestions> {
        let mut results = Vec::new();
        let mut first = true;
        for candidate in candidates {
            if !candidate.eligibility.has_criteria() {
                info!(nct_id = %candidate.nct_id, "No eligibility criteria, skipping");
                continue;
            }
            if !first && !self.inter_trial_delay.is_zero() {
                tokio::time::sleep(self.inter_trial_delay).await;
            }
            first = false;
            match self.generate_for_trial(candidate).await {
                Ok(trial) => results.push(trial),
                Err(e) => {
                    warn!(nct_id = %candidate.nct_id, error = %e, "Question generation failed, skipping trial");
                }
            }
        }
        results
    }
}

fn build_generation_prompt(candidate: &TrialCandidate, max_per_category: usize) -> String {
    let elig = &candidate.eligibility;
    format!(
        "You are a clinical research coordinator. Convert the eligibility \
         criteria below into simple yes/no questions a patient can answer \
         about themselves, without medical jargon.\n\n\
         Trial: {title} ({nct_id})\n\
         Sex: {sex}\n\
         Minimum age: {min_age}\n\
         Maximum age: {max_age}\n\
         Accepts healthy volunteers: {healthy}\n\n\
         Eligibility criteria:\n{criteria}\n\n\
         Rules:\n\
         - Produce at most {max} inclusion questions and {max} exclusion questions.\n\
         - Inclusion questions come from inclusion criteria; answering yes \
           means the criterion is met.\n\
         - Exclusion questions come from exclusion criteria; answering yes \
           means the patient is excluded.\n\
         - Each question is a single yes/no question of 15 words or fewer, \
           phrased like \"Do you have...\", \"Have you ever...\", or \
           \"Are you...\".\n\
         - One criterion per question. Skip vague criteria and anything a \
           patient cannot self-assess (lab values, investigator judgment).\n\n\
         Respond with JSON only:\n\
         {{\"nct_id\": \"{nct_id}\", \"inclusion_questions\": [\"...\"], \
         \"exclusion_questions\": [\"...\"]}}",
        title = candidate.title,
        nct_id = candidate.nct_id,
        sex = elig.sex,
        min_age = elig.minimum_age,
        max_age = elig.maximum_age,
        healthy = elig.healthy_volunteers,
        criteria = elig.criteria,
        max = max_per_category,
    )
}
