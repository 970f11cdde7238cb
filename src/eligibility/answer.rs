use serde::{Deserialize, Serialize};

/// A patient's answer to one screening question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerValue {
    Yes,
    No,
    Unsure,
}

impl AnswerValue {
    /// Whether this answer triggers exclusion on an exclusion question.
    /// Only a definite yes excludes; an unsure patient keeps going.
    pub fn excludes(self) -> bool {
        matches!(self, Self::Yes)
    }

    /// Credit toward the inclusion score. Unsure earns half credit so that
    /// a hesitant answer degrades the match percentage without zeroing it.
    pub fn inclusion_credit(self) -> f64 {
        match self {
            Self::Yes => 1.0,
            Self::No => 0.0,
            Self::Unsure => 0.5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
            Self::Unsure => "Unsure",
        }
    }
}

/// Final verdict for one trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialMatchResult {
    pub nct_id: String,
    pub title: String,
    pub eligible: bool,
    pub reason: String,
    pub inclusion_score: f64,
    pub total_inclusion_questions: usize,
    /// Inclusion score over question count, rounded to one decimal place.
    pub inclusion_percentage: f64,
}

/// Formats a score without a trailing `.0`: `2.0` as `2`, `2.5` as `2.5`.
pub(crate) fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{}", score as i64)
    } else {
        format!("{score:.1}")
    }
}
