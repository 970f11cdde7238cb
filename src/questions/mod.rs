//! Yes/no screening questions derived from trial eligibility criteria.

mod generator;
mod model;

pub use generator::QuestionGenerator;
pub use model::{assign_ids, Question, QuestionCategory, QuestionSet, TrialQuestions};
