//! Answer-driven eligibility scoring: one trial at a time, exclusion
//! questions short-circuit, inclusion questions accumulate credit.

mod answer;
mod state;

pub use answer::{AnswerValue, TrialMatchResult};
pub use state::{CurrentQuestion, NextStep, SessionState, StepOutcome};
