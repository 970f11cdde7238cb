//! Patient-facing result explanations with a comprehension gate.
//!
//! Each explanation is drafted, scored by a second agent on four axes, and
//! rewritten against the reported issues until it clears the configured
//! threshold or attempts run out. Running out is a soft failure: the last
//! draft ships with a warning attached.

mod service;

pub use service::{ExplanationEvaluation, ExplanationOutcome, ExplanationService};
