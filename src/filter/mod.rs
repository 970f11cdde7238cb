//! Keyword relevance scoring over fetched trials.
//!
//! Keywords come from the structured illness profile. A keyword that appears
//! in every trial separates nothing and is removed before scoring; trials
//! matching at least one surviving keyword are ranked by keyword coverage,
//! then by total occurrence count.

use tracing::{debug, info};

use crate::illness::IllnessProfile;
use crate::registry::{EligibilityCriteria, Trial, TrialCandidate};

/// How strongly one trial matched the profile keywords.
#[derive(Debug, Clone, Default)]
pub struct RelevanceScore {
    pub num_keywords: usize,
    pub total_occurrences: usize,
    pub keywords_found: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ScoredTrial {
    pub trial: Trial,
    pub score: RelevanceScore,
}

/// Collects search keywords from the profile: explicit keywords first, then
/// the type, organ, location, and system fields. Lower-cased, first
/// occurrence wins.
pub fn extract_keywords(profile: &IllnessProfile) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    let mut push = |value: &str| {
        let value = value.trim().to_lowercase();
        if !value.is_empty() && !keywords.contains(&value) {
            keywords.push(value);
        }
    };

    for kw in &profile.keywords {
        push(kw);
    }
    if let Some(illness_type) = &profile.illness_type {
        push(illness_type);
    }
    for list in [
        &profile.organ_touched,
        &profile.anatomical_location,
    ]
    .into_iter()
    .flatten()
    {
        for item in list {
            push(item);
        }
    }
    for system in &profile.affected_systems {
        push(system);
    }
    keywords
}

fn score_text(text: &str, keywords: &[String]) -> RelevanceScore {
    let mut score = RelevanceScore::default();
    for keyword in keywords {
        let occurrences = text.matches(keyword.as_str()).count();
        if occurrences > 0 {
            score.num_keywords += 1;
            score.total_occurrences += occurrences;
            score.keywords_found.push(keyword.clone());
        }
    }
    score
}

/// Removes keywords present in every trial text. Such keywords carry no
/// ranking signal (they usually restate the search condition itself).
fn remove_universal(keywords: Vec<String>, texts: &[String]) -> Vec<String> {
    if texts.is_empty() {
        return keywords;
    }
    let (kept, dropped): (Vec<String>, Vec<String>) = keywords
        .into_iter()
        .partition(|kw| !texts.iter().all(|t| t.contains(kw.as_str())));
    if !dropped.is_empty() {
        debug!(?dropped, "removed universal keywords");
    }
    kept
}

/// Scores and ranks trials against the profile keywords.
///
/// Trials with no keyword match are dropped. When the profile yields no
/// keywords at all (or every keyword is universal) there is nothing to rank
/// on, so all trials pass through unscored in their original order.
pub fn filter_by_keywords(trials: Vec<Trial>, profile: &IllnessProfile) -> Vec<ScoredTrial> {
    let texts: Vec<String> = trials.iter().map(Trial::search_text).collect();
    let keywords = remove_universal(extract_keywords(profile), &texts);

    if keywords.is_empty() {
        info!(count = trials.len(), "no discriminating keywords, keeping all trials");
        return trials
            .into_iter()
            .map(|trial| ScoredTrial {
                trial,
                score: RelevanceScore::default(),
            })
            .collect();
    }

    let mut scored: Vec<ScoredTrial> = trials
        .into_iter()
        .zip(texts.iter())
        .filter_map(|(trial, text)| {
            let score = score_text(text, &keywords);
            (score.num_keywords > 0).then_some(ScoredTrial { trial, score })
        })
        .collect();

    scored.sort_by(|a, b| {
        (b.score.num_keywords, b.score.total_occurrences)
            .cmp(&(a.score.num_keywords, a.score.total_occurrences))
    });

    info!(relevant = scored.len(), keywords = keywords.len(), "filtered trials");
    scored
}

/// Turns ranked trials into candidates with eligibility criteria attached.
pub fn extract_eligibility(scored: Vec<ScoredTrial>) -> Vec<TrialCandidate> {
    scored
        .into_iter()
        .map(|entry| TrialCandidate {
            nct_id: entry.trial.nct_id().to_string(),
            title: entry.trial.title().to_string(),
            num_keywords: entry.score.num_keywords,
            total_occurrences: entry.score.total_occurrences,
            keywords_found: entry.score.keywords_found,
            eligibility: EligibilityCriteria::from_trial(&entry.trial),
        })
        .collect()
}
