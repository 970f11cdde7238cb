use std::sync::Arc;

use tracing::{info, warn};

use super::profile::IllnessProfile;
use crate::agent::{json_extract, AgentConfig, AgentSession, ResponseFormat};
use crate::config::AgentDefaults;
use crate::error::Result;

const AGENT_NAME: &str = "illness_extractor";

/// Turns a free-text patient description into a normalized illness profile.
///
/// Malformed model output never surfaces as an error here: any parsing or
/// validation failure falls back to a minimal valid profile. Only transport
/// exhaustion propagates, since that invalidates the whole pipeline run.
pub struct IllnessExtractor {
    session: Arc<AgentSession>,
}

impl IllnessExtractor {
    pub fn new(session: Arc<AgentSession>, defaults: &AgentDefaults) -> Self {
        session.register(
            AgentConfig::from_defaults(AGENT_NAME, defaults)
                .with_description("Extracts structured illness profiles from patient text")
                .with_response_format(ResponseFormat::JsonObject),
        );
        Self { session }
    }

    pub async fn analyze(&self, description: &str) -> Result<IllnessProfile> {
        let description = description.trim();
        if description.is_empty() {
            return Ok(IllnessProfile::fallback(description));
        }

        info!(input_len = description.len(), "Analyzing patient description");

        let prompt = build_analysis_prompt(description);
        let reply = self.session.chat_with_retry(AGENT_NAME, &prompt).await?;

        let profile = match json_extract::first_object(&reply) {
            Some(data) => IllnessProfile::from_model_output(data),
            None => {
                // Plain-prose reply: treat the text itself as the illness
                // name and keep the original description as a keyword so
                // relevance filtering still has something to work with.
                warn!("Illness analysis reply carried no JSON object, using text fallback");
                let mut fallback = IllnessProfile::fallback(&reply);
                fallback.keywords = vec![description.to_string()];
                fallback
            }
        };

        info!(
            illness = %profile.illness_name,
            category = %profile.category,
            keywords = profile.keywords.len(),
            "Illness profile extracted"
        );
        Ok(profile)
    }
}

fn build_analysis_prompt(description: &str) -> String {
    format!(
        r#"The response MUST be in English.
Return ONLY a JSON object with the illness profile fields (no markdown, no extra text).

Patient input: {description}

CRITICAL TYPE RULES (MUST FOLLOW):
- anatomical_location MUST be either null OR a JSON array of strings. Example: ["thorax"] or null
- organ_touched MUST be either null OR a JSON array of strings. Example: ["lung"] or null
- affected_systems MUST be a JSON array of strings (can be empty list)
- keywords MUST be a JSON array of strings (can be empty list)
- category is REQUIRED. If unknown, set "unknown".

Rules:
- illness_name: general illness name only (no types, subtypes, stages, variants, or anatomical locations)
- type: specific type or subtype if mentioned, else null
- subtype: specific variant if mentioned, else null
- stage: disease stage if explicitly mentioned, else null
- severity: mild/moderate/severe if mentioned, else null
- keywords: include any types, stages, variants, organs, or other relevant terms
- confidence_score: optional float between 0 and 1 if you can estimate, else null

Normalization:
- All medical terms MUST be in canonical singular form
- "kidneys" becomes "kidney", "eyes" becomes "eye"
- Return valid JSON ONLY"#
    )
}
