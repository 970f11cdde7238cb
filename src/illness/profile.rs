use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::json_extract;

/// Normalized illness profile extracted from one patient description.
///
/// `illness_name` and `category` are never empty; list-typed optional
/// fields are either `None` or a non-empty list of non-empty strings.
/// Created once per workflow run, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IllnessProfile {
    pub illness_name: String,
    #[serde(rename = "type")]
    pub illness_type: Option<String>,
    pub subtype: Option<String>,
    pub stage: Option<String>,
    pub severity: Option<String>,
    pub anatomical_location: Option<Vec<String>>,
    pub organ_touched: Option<Vec<String>>,
    pub category: String,
    #[serde(default)]
    pub affected_systems: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub confidence_score: Option<f64>,
}

impl IllnessProfile {
    /// Minimal valid profile for when the model output is unusable.
    pub fn fallback(description: &str) -> Self {
        let trimmed = description.trim();
        Self {
            illness_name: if trimmed.is_empty() {
                "Unknown".to_string()
            } else {
                trimmed.to_string()
            },
            illness_type: None,
            subtype: None,
            stage: None,
            severity: None,
            anatomical_location: None,
            organ_touched: None,
            category: "unknown".to_string(),
            affected_systems: Vec::new(),
            keywords: Vec::new(),
            confidence_score: None,
        }
    }

    /// Build a profile from an arbitrary model-output JSON object, fixing
    /// every schema deviation the model is known to produce: strings where
    /// lists belong, comma-joined lists, blanks, JSON embedded inside
    /// string fields, and missing required fields.
    pub fn from_model_output(mut data: Value) -> Self {
        // A profile object sometimes arrives embedded in one of its own
        // string fields. Prefer the innermost object carrying illness_name.
        if let Some(embedded) = embedded_profile(&data) {
            data = embedded;
        }

        let illness_name = non_empty_string(data.get("illness_name"))
            .unwrap_or_else(|| "Unknown".to_string());
        let category =
            non_empty_string(data.get("category")).unwrap_or_else(|| "unknown".to_string());

        Self {
            illness_name,
            illness_type: non_empty_string(data.get("type")),
            subtype: non_empty_string(data.get("subtype")),
            stage: non_empty_string(data.get("stage")),
            severity: non_empty_string(data.get("severity")),
            anatomical_location: ensure_list_or_none(data.get("anatomical_location")),
            organ_touched: ensure_list_or_none(data.get("organ_touched")),
            category,
            affected_systems: ensure_list(data.get("affected_systems")),
            keywords: ensure_list(data.get("keywords")),
            confidence_score: data.get("confidence_score").and_then(Value::as_f64),
        }
    }
}

fn embedded_profile(data: &Value) -> Option<Value> {
    let obj = data.as_object()?;
    // illness_name itself may contain a serialized object, or any other
    // string field may carry the real payload.
    for (key, value) in obj {
        if let Value::String(s) = value {
            if let Some(inner) = json_extract::first_object(s) {
                if key == "illness_name" || inner.get("illness_name").is_some() {
                    return Some(inner);
                }
            }
        }
    }
    None
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Normalize to `Option<Vec<String>>`: null and blanks go to None, bare
/// strings become one-element lists, comma-joined strings are split.
fn ensure_list_or_none(value: Option<&Value>) -> Option<Vec<String>> {
    let items = ensure_list(value);
    (!items.is_empty()).then_some(items)
}

/// Normalize to `Vec<String>` (never blank entries).
fn ensure_list(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| non_empty_string(Some(item)))
            .collect(),
        Some(Value::String(s)) => split_clean(s),
        Some(other) => {
            let s = other.to_string();
            split_clean(&s)
        }
    }
}

fn split_clean(s: &str) -> Vec<String> {
    if s.contains(',') {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fallback_from_empty_description() {
        let profile = IllnessProfile::fallback("   ");
        assert_eq!(profile.illness_name, "Unknown");
        assert_eq!(profile.category, "unknown");
        assert!(profile.keywords.is_empty());
    }

    #[test]
    fn fallback_keeps_trimmed_description() {
        let profile = IllnessProfile::fallback("  chest pain  ");
        assert_eq!(profile.illness_name, "chest pain");
    }

    #[test]
    fn normalizes_string_list_fields() {
        let data = json!({
            "illness_name": "diabetes",
            "category": "chronic",
            "organ_touched": "kidney, eye",
            "anatomical_location": "abdomen",
            "affected_systems": ["endocrine", "  ", "renal"],
            "keywords": null
        });
        let profile = IllnessProfile::from_model_output(data);
        assert_eq!(
            profile.organ_touched,
            Some(vec!["kidney".to_string(), "eye".to_string()])
        );
        assert_eq!(profile.anatomical_location, Some(vec!["abdomen".to_string()]));
        assert_eq!(profile.affected_systems, vec!["endocrine", "renal"]);
        assert!(profile.keywords.is_empty());
    }

    #[test]
    fn blank_list_becomes_none_not_empty_some() {
        let data = json!({
            "illness_name": "asthma",
            "category": "chronic",
            "organ_touched": ["", "   "]
        });
        let profile = IllnessProfile::from_model_output(data);
        assert_eq!(profile.organ_touched, None);
    }

    #[test]
    fn missing_required_fields_get_defaults() {
        let profile = IllnessProfile::from_model_output(json!({"keywords": ["x"]}));
        assert_eq!(profile.illness_name, "Unknown");
        assert_eq!(profile.category, "unknown");
        assert_eq!(profile.keywords, vec!["x"]);
    }

    #[test]
    fn embedded_object_in_illness_name_wins() {
        let data = json!({
            "illness_name": r#"{"illness_name": "migraine", "category": "neurological"}"#,
            "category": "unknown"
        });
        let profile = IllnessProfile::from_model_output(data);
        assert_eq!(profile.illness_name, "migraine");
        assert_eq!(profile.category, "neurological");
    }

    #[test]
    fn embedded_object_in_other_field_needs_illness_name() {
        let data = json!({
            "illness_name": "flu",
            "category": "infectious",
            "stage": r#"{"unrelated": true}"#
        });
        let profile = IllnessProfile::from_model_output(data);
        assert_eq!(profile.illness_name, "flu");
    }
}
