//! End-to-end pipeline: description in, ranked screening interview out.

mod pipeline;

pub use pipeline::{MatchWorkflow, WorkflowReport};
