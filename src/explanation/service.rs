use std::collections::HashMap;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::agent::{AgentConfig, AgentSession, Parsed, ResponseFormat};
use crate::config::{AgentDefaults, ExplanationConfig};
use crate::eligibility::{AnswerValue, TrialMatchResult};
use crate::error::Result;
use crate::questions::TrialQuestions;

const EXPLAINER_AGENT: &str = "explainer";
const EVALUATOR_AGENT: &str = "comprehension_evaluator";

/// Evaluator verdict. Four axes scored 0-25 each; the total is what the
/// acceptance gate reads. Missing fields default rather than failing the
/// evaluation round.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExplanationEvaluation {
    #[serde(default)]
    pub comprehension_score: u32,
    #[serde(default)]
    pub is_acceptable: bool,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// The explanation finally handed to the caller, with provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationOutcome {
    pub explanation: String,
    pub comprehension_score: u32,
    pub attempts: u32,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub struct ExplanationService {
    session: Arc<AgentSession>,
    max_attempts: u32,
    min_score: u32,
}

impl ExplanationService {
    pub fn new(
        session: Arc<AgentSession>,
        defaults: &AgentDefaults,
        config: &ExplanationConfig,
    ) -> Self {
        session.register(
            AgentConfig::from_defaults(EXPLAINER_AGENT, defaults)
                .with_description("Explains trial match results in plain language"),
        );
        session.register(
            AgentConfig::from_defaults(EVALUATOR_AGENT, defaults)
                .with_description("Scores explanations for patient comprehension")
                .with_response_format(ResponseFormat::JsonObject)
                .with_temperature(0.0),
        );
        Self {
            session,
            max_attempts: config.max_attempts.max(1),
            min_score: config.min_comprehension_score,
        }
    }

    /// Produces an explanation of one trial verdict, looping through
    /// draft -> evaluate -> rewrite until accepted or attempts exhaust.
    pub async fn explain(
        &self,
        result: &TrialMatchResult,
        trial: &TrialQuestions,
        answers: Option<&HashMap<String, AnswerValue>>,
    ) -> Result<ExplanationOutcome> {
        let qa_summary = format_qa_summary(trial, answers);
        let mut explanation = self
            .session
            .chat_with_retry(EXPLAINER_AGENT, &draft_prompt(result, &qa_summary))
            .await?;

        let mut last_evaluation = ExplanationEvaluation::default();
        for attempt in 1..=self.max_attempts {
            let evaluation = self.evaluate(&explanation).await?;
            let accepted = evaluation.comprehension_score >= self.min_score;
            info!(
                nct_id = %result.nct_id,
                attempt,
                score = evaluation.comprehension_score,
                accepted,
                "Explanation evaluated"
            );
            if accepted {
                return Ok(ExplanationOutcome {
                    explanation,
                    comprehension_score: evaluation.comprehension_score,
                    attempts: attempt,
                    accepted: true,
                    warning: None,
                });
            }
            last_evaluation = evaluation;
            if attempt < self.max_attempts {
                explanation = self
                    .session
                    .chat_with_retry(
                        EXPLAINER_AGENT,
                        &rewrite_prompt(result, &qa_summary, &explanation, &last_evaluation),
                    )
                    .await?;
            }
        }

        warn!(
            nct_id = %result.nct_id,
            score = last_evaluation.comprehension_score,
            "Explanation never cleared the comprehension threshold"
        );
        Ok(ExplanationOutcome {
            explanation,
            comprehension_score: last_evaluation.comprehension_score,
            attempts: self.max_attempts,
            accepted: false,
            warning: Some(format!(
                "Explanation scored {} of a required {}; review before sharing",
                last_evaluation.comprehension_score, self.min_score
            )),
        })
    }

    /// An evaluator reply that cannot be shaped counts as a failed round,
    /// not an error: score zero forces a rewrite.
    async fn evaluate(&self, explanation: &str) -> Result<ExplanationEvaluation> {
        let parsed: Parsed<ExplanationEvaluation> = self
            .session
            .chat_structured_with_retry(EVALUATOR_AGENT, &evaluation_prompt(explanation))
            .await?;
        Ok(match parsed {
            Parsed::Structured(evaluation) => evaluation,
            Parsed::Unstructured(_) => ExplanationEvaluation {
                comprehension_score: 0,
                is_acceptable: false,
                issues: vec!["Evaluation response could not be parsed".to_string()],
                suggestions: Vec::new(),
            },
        })
    }
}

/// Renders the answered questions as a bullet list for the prompts.
/// Unanswered questions are left out.
fn format_qa_summary(
    trial: &TrialQuestions,
    answers: Option<&HashMap<String, AnswerValue>>,
) -> String {
    let Some(answers) = answers else {
        return String::new();
    };
    trial
        .inclusion
        .iter()
        .chain(trial.exclusion.iter())
        .filter_map(|q| {
            answers
                .get(&q.id)
                .map(|a| format!("- {}: {}", q.text, a.as_str()))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn draft_prompt(result: &TrialMatchResult, qa_summary: &str) -> String {
    format!(
        "Explain this clinical trial screening result to the patient in \
         plain, reassuring language at roughly an eighth-grade reading \
         level. Do not give medical advice; suggest discussing next steps \
         with their doctor.\n\n\
         Trial: {title} ({nct_id})\n\
         Verdict: {verdict}\n\
         Reason: {reason}\n\
         Inclusion criteria met: {score} of {total} ({pct}%)\n\n\
         Their answers:\n{qa}\n\n\
         Write 3-4 short paragraphs, 150-200 words total: what the result \
         means, which answers mattered most, and what to do next.",
        title = result.title,
        nct_id = result.nct_id,
        verdict = if result.eligible {
            "likely eligible"
        } else {
            "not eligible"
        },
        reason = result.reason,
        score = result.inclusion_score,
        total = result.total_inclusion_questions,
        pct = result.inclusion_percentage,
        qa = qa_summary,
    )
}

fn evaluation_prompt(explanation: &str) -> String {
    format!(
        "Score this patient-facing explanation on four axes, 0-25 points \
         each: clarity of language, logical structure, completeness of the \
         stated outcome, and empathy of tone. Sum them into \
         comprehension_score (0-100).\n\n\
         Explanation:\n{explanation}\n\n\
         Respond with JSON only:\n\
         {{\"comprehension_score\": 0, \"is_acceptable\": false, \
         \"issues\": [\"...\"], \"suggestions\": [\"...\"]}}"
    )
}

fn rewrite_prompt(
    result: &TrialMatchResult,
    qa_summary: &str,
    previous: &str,
    evaluation: &ExplanationEvaluation,
) -> String {
    let issues = if evaluation.issues.is_empty() {
        "- (none reported)".to_string()
    } else {
        evaluation
            .issues
            .iter()
            .map(|i| format!("- {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let suggestions = evaluation
        .suggestions
        .iter()
        .map(|s| format!("- {s}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Your previous explanation scored {score}/100 for patient \
         comprehension. Rewrite it, fixing the issues listed. Keep the \
         facts identical.\n\n\
         Trial: {title} ({nct_id})\nReason: {reason}\n\n\
         Their answers:\n{qa}\n\n\
         Previous explanation:\n{previous}\n\n\
         Issues:\n{issues}\n\nSuggestions:\n{suggestions}",
        score = evaluation.comprehension_score,
        title = result.title,
        nct_id = result.nct_id,
        reason = result.reason,
        qa = qa_summary,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questions::{assign_ids, QuestionCategory};

    fn sample_trial() -> TrialQuestions {
        TrialQuestions {
            nct_id: "NCT1".into(),
            title: "Study".into(),
            num_keywords: 0,
            total_occurrences: 0,
            inclusion: assign_ids(
                "NCT1",
                QuestionCategory::Inclusion,
                vec!["Are you over 18?".into(), "Do you have diabetes?".into()],
                10,
            ),
            exclusion: assign_ids(
                "NCT1",
                QuestionCategory::Exclusion,
                vec!["Are you pregnant?".into()],
                10,
            ),
        }
    }

    #[test]
    fn qa_summary_lists_only_answered_questions() {
        let trial = sample_trial();
        let mut answers = HashMap::new();
        answers.insert("NCT1_INC_001".to_string(), AnswerValue::Yes);
        answers.insert("NCT1_EXC_001".to_string(), AnswerValue::Unsure);
        let summary = format_qa_summary(&trial, Some(&answers));
        assert!(summary.contains("- Are you over 18?: Yes"));
        assert!(summary.contains("- Are you pregnant?: Unsure"));
        assert!(!summary.contains("diabetes"));
    }

    #[test]
    fn qa_summary_empty_without_answers() {
        assert!(format_qa_summary(&sample_trial(), None).is_empty());
    }

    #[test]
    fn evaluation_defaults_fill_missing_fields() {
        let parsed: ExplanationEvaluation =
            serde_json::from_str(r#"{"comprehension_score": 72}"#).unwrap();
        assert_eq!(parsed.comprehension_score, 72);
        assert!(!parsed.is_acceptable);
        assert!(parsed.issues.is_empty());
    }
}
