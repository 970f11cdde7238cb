//! trialmatch: matches patient descriptions to recruiting clinical trials.
//!
//! The pipeline extracts a structured illness profile from free text,
//! fetches candidate studies from the clinicaltrials.gov v2 API, ranks them
//! by keyword relevance, generates yes/no screening questions from each
//! trial's eligibility criteria, and walks the patient through an
//! answer-driven interview that scores every trial. Resolved verdicts can
//! be turned into plain-language explanations gated on a comprehension
//! score.
//!
//! Entry point is [`workflow::MatchWorkflow`]; everything it needs is
//! injected: a [`agent::ModelBackend`] for model calls and a
//! [`session::SessionStore`] for interview state.

pub mod agent;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod explanation;
pub mod filter;
pub mod illness;
pub mod language;
pub mod questions;
pub mod registry;
pub mod session;
pub mod workflow;

pub use config::MatchConfig;
pub use error::{MatchError, Result};
pub use workflow::{MatchWorkflow, WorkflowReport};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs a global log subscriber. Call once, early; embedding
/// applications that bring their own subscriber should skip this.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("trialmatch=debug")
    } else {
        EnvFilter::new("trialmatch=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
