pub mod error;
pub mod types;

pub use error::{Result, SerpApiError};
pub use types::{LocalResult, MapsSearchRequest, MapsSearchResponse, Pagination};

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://serpapi.com";

/// Google Maps results advance in fixed steps of 20.
pub const RESULTS_PER_PAGE: u32 = 20;

/// SerpAPI answers "no results" as an error string inside the body.
const NO_RESULTS_MARKER: &str = "hasn't returned any results";

#[derive(Clone)]
pub struct SerpApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SerpApiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self::with_client(client, DEFAULT_BASE_URL, api_key))
    }

    /// Build on a shared `reqwest::Client` so callers can reuse one connection
    /// pool across tenants.
    pub fn with_client(client: reqwest::Client, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Run one `google_maps` search page.
    ///
    /// A body-level "no results" message is returned as an empty page; every
    /// other body-level error is classified into auth / rate-limit / api errors.
    pub async fn google_maps(&self, request: &MapsSearchRequest) -> Result<MapsSearchResponse> {
        let url = format!("{}/search.json", self.base_url);
        tracing::debug!(start = request.start, q_len = request.q.len(), "SerpAPI google_maps");

        let resp = self
            .client
            .get(&url)
            .query(&[("engine", "google_maps")])
            .query(request)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<MapsSearchResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or(body);
            return Err(SerpApiError::classify(status.as_u16(), message));
        }

        let parsed: MapsSearchResponse = serde_json::from_str(&body)?;
        if let Some(message) = parsed.error.clone() {
            if message.contains(NO_RESULTS_MARKER) {
                tracing::info!(start = request.start, "SerpAPI returned no results");
                return Ok(MapsSearchResponse {
                    local_results: Vec::new(),
                    serpapi_pagination: None,
                    error: None,
                });
            }
            return Err(SerpApiError::classify(status.as_u16(), message));
        }

        tracing::info!(
            start = request.start,
            count = parsed.local_results.len(),
            has_next = parsed.has_next_page(),
            "SerpAPI page fetched"
        );
        Ok(parsed)
    }
}
