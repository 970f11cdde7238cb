//! Read-only access to the public clinical-trial registry: fetching
//! candidate studies and extracting the fields the pipeline consumes.

mod client;
mod trial;

pub use client::TrialRegistryClient;
pub use trial::{EligibilityCriteria, Trial, TrialCandidate, NOT_AVAILABLE};
