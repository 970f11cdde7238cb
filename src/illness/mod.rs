//! Free-text patient description → normalized structured illness profile.

mod extractor;
mod profile;

pub use extractor::IllnessExtractor;
pub use profile::IllnessProfile;
