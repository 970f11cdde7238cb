use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Raw model output for one trial: plain question strings, no identifiers
/// yet. Missing categories deserialize as empty lists rather than failing
/// the whole trial.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct QuestionSet {
    #[serde(default)]
    pub nct_id: String,
    #[serde(default)]
    pub inclusion_questions: Vec<String>,
    #[serde(default)]
    pub exclusion_questions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionCategory {
    Inclusion,
    Exclusion,
}

impl QuestionCategory {
    pub fn code(self) -> &'static str {
        match self {
            Self::Inclusion => "INC",
            Self::Exclusion => "EXC",
        }
    }
}

/// One identified question. `original_question` holds the pre-translation
/// wording when translation is enabled; scoring always keys on `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_question: Option<String>,
}

/// Fully prepared questions for one trial, ready for the interview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialQuestions {
    pub nct_id: String,
    pub title: String,
    pub num_keywords: usize,
    pub total_occurrences: usize,
    pub inclusion: Vec<Question>,
    pub exclusion: Vec<Question>,
}

impl TrialQuestions {
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.inclusion
            .iter()
            .chain(self.exclusion.iter())
            .find(|q| q.id == id)
    }

    pub fn category_of(&self, id: &str) -> Option<QuestionCategory> {
        if self.inclusion.iter().any(|q| q.id == id) {
            Some(QuestionCategory::Inclusion)
        } else if self.exclusion.iter().any(|q| q.id == id) {
            Some(QuestionCategory::Exclusion)
        } else {
            None
        }
    }

    pub fn total(&self) -> usize {
        self.inclusion.len() + self.exclusion.len()
    }
}

/// Assigns stable identifiers `{nct_id}_{INC|EXC}_{index:03}` with indices
/// starting at 1, independently per category, keeping at most
/// `max_per_category` questions. Identifiers are a pure function of trial
/// id, category, and position.
pub fn assign_ids(
    nct_id: &str,
    category: QuestionCategory,
    texts: Vec<String>,
    max_per_category: usize,
) -> Vec<Question> {
    texts
        .into_iter()
        .filter(|t| !t.trim().is_empty())
        .take(max_per_category)
        .enumerate()
        .map(|(idx, text)| Question {
            id: format!("{}_{}_{:03}", nct_id, category.code(), idx + 1),
            text,
            original_question: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_one_indexed_and_padded() {
        let questions = assign_ids(
            "NCT00000001",
            QuestionCategory::Inclusion,
            vec!["Are you over 18?".into(), "Do you have diabetes?".into()],
            10,
        );
        assert_eq!(questions[0].id, "NCT00000001_INC_001");
        assert_eq!(questions[1].id, "NCT00000001_INC_002");
    }

    #[test]
    fn categories_number_independently() {
        let inc = assign_ids("NCT1", QuestionCategory::Inclusion, vec!["a".into()], 10);
        let exc = assign_ids("NCT1", QuestionCategory::Exclusion, vec!["b".into()], 10);
        assert_eq!(inc[0].id, "NCT1_INC_001");
        assert_eq!(exc[0].id, "NCT1_EXC_001");
    }

    #[test]
    fn cap_is_enforced() {
        let texts: Vec<String> = (0..15).map(|i| format!("q{i}")).collect();
        let questions = assign_ids("NCT1", QuestionCategory::Exclusion, texts, 10);
        assert_eq!(questions.len(), 10);
        assert_eq!(questions.last().unwrap().id, "NCT1_EXC_010");
    }

    #[test]
    fn blank_questions_are_dropped_before_numbering() {
        let questions = assign_ids(
            "NCT1",
            QuestionCategory::Inclusion,
            vec!["  ".into(), "real".into()],
            10,
        );
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, "NCT1_INC_001");
    }

    #[test]
    fn lookup_by_id_spans_both_categories() {
        let trial = TrialQuestions {
            nct_id: "NCT1".into(),
            title: "T".into(),
            num_keywords: 0,
            total_occurrences: 0,
            inclusion: assign_ids("NCT1", QuestionCategory::Inclusion, vec!["a".into()], 10),
            exclusion: assign_ids("NCT1", QuestionCategory::Exclusion, vec!["b".into()], 10),
        };
        assert_eq!(
            trial.category_of("NCT1_EXC_001"),
            Some(QuestionCategory::Exclusion)
        );
        assert!(trial.question("NCT1_INC_999").is_none());
    }
}
