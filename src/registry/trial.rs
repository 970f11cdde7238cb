use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Marker the upstream registry data uses for absent fields.
pub const NOT_AVAILABLE: &str = "N/A";

/// One registry study record, kept as the opaque JSON the API returned.
/// The pipeline only ever reads it through the nested-lookup accessors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trial(pub Value);

impl Trial {
    fn protocol(&self) -> Option<&Value> {
        self.0.get("protocolSection")
    }

    fn identification(&self) -> Option<&Value> {
        self.protocol()?.get("identificationModule")
    }

    pub fn nct_id(&self) -> &str {
        self.identification()
            .and_then(|m| m.get("nctId"))
            .and_then(Value::as_str)
            .unwrap_or(NOT_AVAILABLE)
    }

    /// Official title, falling back to the brief title.
    pub fn title(&self) -> &str {
        let identification = self.identification();
        identification
            .and_then(|m| m.get("officialTitle"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| {
                identification
                    .and_then(|m| m.get("briefTitle"))
                    .and_then(Value::as_str)
            })
            .unwrap_or(NOT_AVAILABLE)
    }

    fn description_field(&self, field: &str) -> &str {
        self.protocol()
            .and_then(|p| p.get("descriptionModule"))
            .and_then(|m| m.get(field))
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn brief_summary(&self) -> &str {
        self.description_field("briefSummary")
    }

    pub fn detailed_description(&self) -> &str {
        self.description_field("detailedDescription")
    }

    /// Title plus both description texts, lower-cased, for keyword search.
    pub fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.title(),
            self.brief_summary(),
            self.detailed_description()
        )
        .to_lowercase()
    }

    fn eligibility_module(&self) -> Option<&Value> {
        self.protocol()?.get("eligibilityModule")
    }
}

/// Eligibility fields extracted once per trial, immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityCriteria {
    pub criteria: String,
    pub sex: String,
    pub minimum_age: String,
    pub maximum_age: String,
    pub healthy_volunteers: String,
}

impl EligibilityCriteria {
    pub fn from_trial(trial: &Trial) -> Self {
        let module = trial.eligibility_module();
        Self {
            criteria: eligibility_string(module, "eligibilityCriteria"),
            sex: eligibility_string(module, "sex"),
            minimum_age: eligibility_string(module, "minimumAge"),
            maximum_age: eligibility_string(module, "maximumAge"),
            healthy_volunteers: eligibility_string(module, "healthyVolunteers"),
        }
    }

    /// True when there is real criteria text to generate questions from.
    pub fn has_criteria(&self) -> bool {
        let trimmed = self.criteria.trim();
        !trimmed.is_empty() && trimmed != NOT_AVAILABLE
    }
}

fn eligibility_string(module: Option<&Value>, field: &str) -> String {
    match module.and_then(|m| m.get(field)) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// A trial that survived relevance filtering, carrying everything question
/// generation needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialCandidate {
    pub nct_id: String,
    pub title: String,
    pub num_keywords: usize,
    pub total_occurrences: usize,
    pub keywords_found: Vec<String>,
    pub eligibility: EligibilityCriteria,
}
