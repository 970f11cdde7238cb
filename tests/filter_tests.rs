use serde_json::json;

use trialmatch::filter::{extract_eligibility, extract_keywords, filter_by_keywords};
use trialmatch::illness::IllnessProfile;
use trialmatch::registry::Trial;

fn trial(nct: &str, summary: &str, criteria: Option<&str>) -> Trial {
    let mut value = json!({
        "protocolSection": {
            "identificationModule": {"nctId": nct, "briefTitle": format!("Study {nct}")},
            "descriptionModule": {"briefSummary": summary}
        }
    });
    if let Some(criteria) = criteria {
        value["protocolSection"]["eligibilityModule"] = json!({
            "eligibilityCriteria": criteria,
            "sex": "ALL",
            "minimumAge": "18 Years",
            "maximumAge": "75 Years",
            "healthyVolunteers": false
        });
    }
    Trial(value)
}

fn profile(keywords: &[&str]) -> IllnessProfile {
    let mut profile = IllnessProfile::fallback("diabetic nephropathy");
    profile.keywords = keywords.iter().map(|s| s.to_string()).collect();
    profile
}

#[test]
fn test_profile_fields_feed_the_keyword_set() {
    let mut profile = profile(&["Nephropathy"]);
    profile.illness_type = Some("chronic".into());
    profile.organ_touched = Some(vec!["Kidney".into()]);
    profile.anatomical_location = Some(vec!["abdomen".into()]);
    profile.affected_systems = vec!["renal".into(), "kidney".into()];

    let keywords = extract_keywords(&profile);
    assert_eq!(
        keywords,
        vec!["nephropathy", "chronic", "kidney", "abdomen", "renal"]
    );
}

#[test]
fn test_universal_keywords_carry_no_signal() {
    let trials = vec![
        trial("NCT1", "A diabetes trial.", None),
        trial("NCT2", "Diabetes with kidney complications.", None),
        trial("NCT3", "Diabetes and eye complications.", None),
    ];
    let scored = filter_by_keywords(trials, &profile(&["diabetes", "kidney", "eye"]));

    // "diabetes" appears in every trial and is discarded; only the kidney
    // and eye trials survive.
    let ids: Vec<&str> = scored.iter().map(|s| s.trial.nct_id()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"NCT2"));
    assert!(ids.contains(&"NCT3"));
    for entry in &scored {
        assert!(!entry.score.keywords_found.contains(&"diabetes".to_string()));
    }
}

#[test]
fn test_ranking_is_coverage_first_then_occurrences() {
    let trials = vec![
        trial("NCT1", "kidney kidney kidney kidney", None),
        trial("NCT2", "kidney and eye and retina", None),
        trial("NCT3", "unrelated condition", None),
    ];
    let scored = filter_by_keywords(trials, &profile(&["kidney", "eye", "retina"]));
    let ids: Vec<&str> = scored.iter().map(|s| s.trial.nct_id()).collect();
    // NCT2 matches three keywords once each; NCT1 matches one keyword four
    // times. Coverage wins over raw occurrence counts.
    assert_eq!(ids, vec!["NCT2", "NCT1"]);
}

#[test]
fn test_empty_keyword_set_passes_everything_through() {
    let trials = vec![
        trial("NCT1", "first", None),
        trial("NCT2", "second", None),
        trial("NCT3", "third", None),
    ];
    let scored = filter_by_keywords(trials, &profile(&[]));
    let ids: Vec<&str> = scored.iter().map(|s| s.trial.nct_id()).collect();
    assert_eq!(ids, vec!["NCT1", "NCT2", "NCT3"]);
    assert!(scored.iter().all(|s| s.score.num_keywords == 0));
}

#[test]
fn test_candidates_carry_eligibility_criteria() {
    let trials = vec![
        trial("NCT1", "kidney trial", Some("Inclusion: adults with CKD.")),
        trial("NCT2", "kidney trial without criteria", None),
    ];
    let candidates = extract_eligibility(filter_by_keywords(trials, &profile(&["kidney"])));
    assert_eq!(candidates.len(), 2);

    let with = candidates.iter().find(|c| c.nct_id == "NCT1").unwrap();
    assert_eq!(with.eligibility.criteria, "Inclusion: adults with CKD.");
    assert_eq!(with.eligibility.maximum_age, "75 Years");
    assert!(with.eligibility.has_criteria());

    let without = candidates.iter().find(|c| c.nct_id == "NCT2").unwrap();
    assert_eq!(without.eligibility.criteria, "N/A");
    assert!(!without.eligibility.has_criteria());
}

#[test]
fn test_matching_is_case_insensitive_via_lowercasing() {
    let trials = vec![
        trial("NCT1", "Advanced KIDNEY Disease", None),
        trial("NCT2", "unrelated", None),
    ];
    let scored = filter_by_keywords(trials, &profile(&["Kidney"]));
    assert_eq!(scored.len(), 1);
    assert_eq!(scored[0].score.num_keywords, 1);
}
