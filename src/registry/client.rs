use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::RegistryConfig;
use crate::error::{MatchError, Result};

use super::Trial;

#[derive(Debug, Deserialize)]
struct StudiesPage {
    #[serde(default)]
    studies: Vec<serde_json::Value>,
}

/// Client for the clinicaltrials.gov v2 studies endpoint.
pub struct TrialRegistryClient {
    base_url: String,
    status_filter: String,
    page_size_limit: usize,
    client: reqwest::Client,
}

impl TrialRegistryClient {
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MatchError::Registry(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            status_filter: config.status_filter.join(","),
            page_size_limit: config.page_size_limit,
            client,
        })
    }

    /// Fetches up to `max_studies` recruiting-or-upcoming studies for a
    /// condition. The page size is capped at the API limit.
    pub async fn fetch(&self, condition: &str, max_studies: usize) -> Result<Vec<Trial>> {
        let condition = condition.trim();
        if condition.is_empty() {
            return Err(MatchError::Registry(
                "search condition must not be empty".into(),
            ));
        }
        if max_studies == 0 {
            return Err(MatchError::Registry(
                "requested study count must be positive".into(),
            ));
        }

        let page_size = max_studies.min(self.page_size_limit);
        debug!(condition, page_size, "querying trial registry");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("query.cond", condition),
                ("filter.overallStatus", self.status_filter.as_str()),
                ("pageSize", page_size.to_string().as_str()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MatchError::Registry("registry request timed out".into())
                } else if e.is_connect() {
                    MatchError::Registry(format!("cannot reach trial registry: {e}"))
                } else {
                    MatchError::Registry(format!("registry request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MatchError::Registry(format!(
                "registry returned {status}: {}",
                body.chars().take(300).collect::<String>()
            )));
        }

        let page: StudiesPage = response
            .json()
            .await
            .map_err(|e| MatchError::Registry(format!("invalid registry response: {e}")))?;

        let trials: Vec<Trial> = page.studies.into_iter().map(Trial).collect();
        info!(condition, count = trials.len(), "fetched studies");
        Ok(trials)
    }
}
