use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{MatchError, Result};
use crate::questions::{QuestionCategory, TrialQuestions};

use super::answer::{format_score, AnswerValue, TrialMatchResult};

/// The question currently awaiting an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentQuestion {
    pub nct_id: String,
    pub trial_title: String,
    pub question_id: String,
    pub text: String,
    pub trial_index: usize,
    pub total_trials: usize,
    pub answered_in_trial: usize,
    pub questions_in_trial: usize,
}

/// What the interview should present next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NextStep {
    Question(CurrentQuestion),
    Finished(Vec<TrialMatchResult>),
}

/// Effect of one submitted answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StepOutcome {
    /// Answer recorded; the current trial still has open questions.
    Recorded,
    /// A yes on an exclusion question ended the current trial.
    TrialExcluded(TrialMatchResult),
    /// Every question of the current trial was answered.
    TrialResolved(TrialMatchResult),
    /// The resolved trial was the last one; all verdicts are in.
    AllResolved(Vec<TrialMatchResult>),
}

/// Per-patient interview state, serialized between requests.
///
/// Trials are interviewed strictly in ranked order. Each question is
/// answered exactly once; a repeated identifier is rejected rather than
/// overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub description: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub trials: Vec<TrialQuestions>,
    pub current_trial_index: usize,
    /// nct_id -> question_id -> answer.
    pub answers: HashMap<String, HashMap<String, AnswerValue>>,
    pub inclusion_scores: HashMap<String, f64>,
    pub results: Vec<TrialMatchResult>,
}

impl SessionState {
    pub fn new(description: String, language: String, trials: Vec<TrialQuestions>) -> Self {
        Self {
            description,
            language,
            created_at: Utc::now(),
            trials,
            current_trial_index: 0,
            answers: HashMap::new(),
            inclusion_scores: HashMap::new(),
            results: Vec::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.current_trial_index >= self.trials.len()
    }

    /// Advances to the next unanswered question, finalizing any trial that
    /// has nothing left to ask along the way. A trial with zero questions is
    /// vacuously eligible.
    pub fn next_step(&mut self) -> NextStep {
        while let Some(trial) = self.trials.get(self.current_trial_index) {
            let answered = self.answered_count(&trial.nct_id);
            if trial.total() == 0 || answered >= trial.total() {
                let result = self.finalize_current();
                debug!(nct_id = %result.nct_id, eligible = result.eligible, "Trial finalized without open questions");
                continue;
            }

            // Exclusion questions come first: an affirmative there ends the
            // trial before any inclusion question is asked.
            let trial = &self.trials[self.current_trial_index];
            let question = trial
                .exclusion
                .iter()
                .chain(trial.inclusion.iter())
                .find(|q| !self.is_answered(&trial.nct_id, &q.id))
                .expect("unanswered question exists below total");
            return NextStep::Question(CurrentQuestion {
                nct_id: trial.nct_id.clone(),
                trial_title: trial.title.clone(),
                question_id: question.id.clone(),
                text: question.text.clone(),
                trial_index: self.current_trial_index,
                total_trials: self.trials.len(),
                answered_in_trial: answered,
                questions_in_trial: trial.total(),
            });
        }
        NextStep::Finished(self.results.clone())
    }

    /// Records one answer against the current trial.
    ///
    /// A yes on an exclusion question excludes the trial immediately, before
    /// its remaining questions. Inclusion answers accumulate credit; the
    /// trial resolves once every question has an answer.
    pub fn submit_answer(&mut self, question_id: &str, answer: AnswerValue) -> Result<StepOutcome> {
        let trial = self
            .trials
            .get(self.current_trial_index)
            .ok_or_else(|| MatchError::UnknownQuestion(question_id.to_string()))?;
        let nct_id = trial.nct_id.clone();
        let category = trial
            .category_of(question_id)
            .ok_or_else(|| MatchError::UnknownQuestion(question_id.to_string()))?;
        if self.is_answered(&nct_id, question_id) {
            return Err(MatchError::DuplicateAnswer(question_id.to_string()));
        }

        self.answers
            .entry(nct_id.clone())
            .or_default()
            .insert(question_id.to_string(), answer);

        if category == QuestionCategory::Exclusion && answer.excludes() {
            let result = self.exclude_current();
            info!(nct_id = %result.nct_id, question = question_id, "Trial excluded");
            return Ok(self.wrap_resolution(result, true));
        }

        if category == QuestionCategory::Inclusion {
            *self.inclusion_scores.entry(nct_id.clone()).or_insert(0.0) +=
                answer.inclusion_credit();
        }

        let trial = &self.trials[self.current_trial_index];
        if self.answered_count(&nct_id) >= trial.total() {
            let result = self.finalize_current();
            info!(nct_id = %result.nct_id, eligible = result.eligible, "Trial resolved");
            return Ok(self.wrap_resolution(result, false));
        }
        Ok(StepOutcome::Recorded)
    }

    /// Results ordered best match first.
    pub fn ranked_results(&self) -> Vec<TrialMatchResult> {
        let mut ranked = self.results.clone();
        ranked.sort_by(|a, b| {
            b.inclusion_percentage
                .partial_cmp(&a.inclusion_percentage)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }

    pub fn result_for(&self, nct_id: &str) -> Option<&TrialMatchResult> {
        self.results.iter().find(|r| r.nct_id == nct_id)
    }

    pub fn answers_for(&self, nct_id: &str) -> Option<&HashMap<String, AnswerValue>> {
        self.answers.get(nct_id)
    }

    fn is_answered(&self, nct_id: &str, question_id: &str) -> bool {
        self.answers
            .get(nct_id)
            .is_some_and(|m| m.contains_key(question_id))
    }

    fn answered_count(&self, nct_id: &str) -> usize {
        self.answers.get(nct_id).map_or(0, HashMap::len)
    }

    fn wrap_resolution(&mut self, result: TrialMatchResult, excluded: bool) -> StepOutcome {
        if matches!(self.next_step(), NextStep::Finished(_)) {
            StepOutcome::AllResolved(self.results.clone())
        } else if excluded {
            StepOutcome::TrialExcluded(result)
        } else {
            StepOutcome::TrialResolved(result)
        }
    }

    fn exclude_current(&mut self) -> TrialMatchResult {
        let trial = &self.trials[self.current_trial_index];
        let result = TrialMatchResult {
            nct_id: trial.nct_id.clone(),
            title: trial.title.clone(),
            eligible: false,
            reason: "Excluded".to_string(),
            inclusion_score: 0.0,
            total_inclusion_questions: trial.inclusion.len(),
            inclusion_percentage: 0.0,
        };
        self.results.push(result.clone());
        self.current_trial_index += 1;
        result
    }

    /// Eligibility demands full credit on every inclusion question; any
    /// no or unsure answer leaves the trial a partial match.
    fn finalize_current(&mut self) -> TrialMatchResult {
        let trial = &self.trials[self.current_trial_index];
        let total = trial.inclusion.len();
        let score = self
            .inclusion_scores
            .get(&trial.nct_id)
            .copied()
            .unwrap_or(0.0);
        // Zero inclusion questions report 0%, not 100: a vacuous trial must
        // not outrank real partial matches.
        let percentage = if total > 0 {
            ((score / total as f64) * 1000.0).round() / 10.0
        } else {
            0.0
        };
        let eligible = score == total as f64;
        let reason = if eligible {
            "Eligible".to_string()
        } else {
            format!("Met {}/{} criteria", format_score(score), total)
        };
        let result = TrialMatchResult {
            nct_id: trial.nct_id.clone(),
            title: trial.title.clone(),
            eligible,
            reason,
            inclusion_score: score,
            total_inclusion_questions: total,
            inclusion_percentage: percentage,
        };
        self.results.push(result.clone());
        self.current_trial_index += 1;
        result
    }
}
