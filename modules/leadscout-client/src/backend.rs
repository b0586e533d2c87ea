use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use leadscout_common::{Lead, LeadFilters, LeadPage, SearchPage, SortOption};

use crate::error::{ClientError, Result};

/// Search Proxy calls used by the session holder.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn create(&self, query: &str, location: &str) -> Result<SearchPage>;

    async fn fetch_more(&self, session_id: Uuid) -> Result<SearchPage>;
}

/// Leads library calls used by the library view.
#[async_trait]
pub trait LibraryBackend: Send + Sync {
    async fn query(&self, filters: &LeadFilters, sort: SortOption, page: u32) -> Result<LeadPage>;

    async fn set_favorite(&self, lead_id: Uuid, is_favorite: bool) -> Result<Lead>;

    async fn set_tags(&self, lead_id: Uuid, tags: &[String]) -> Result<Lead>;

    async fn delete_lead(&self, lead_id: Uuid) -> Result<()>;

    /// Returns the number of deleted leads.
    async fn clear_all(&self) -> Result<u64>;

    async fn tags(&self) -> Result<Vec<String>>;

    async fn categories(&self) -> Result<Vec<String>>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Deserialize)]
struct ClearedBody {
    deleted: u64,
}

fn sort_param(sort: SortOption) -> &'static str {
    match sort {
        SortOption::Newest => "newest",
        SortOption::Oldest => "oldest",
        SortOption::MostFound => "most_found",
        SortOption::HighestRating => "highest_rating",
        SortOption::Favorites => "favorites",
    }
}

/// Query string for a library page. Flags are only sent when set.
pub fn library_params(filters: &LeadFilters, sort: SortOption, page: u32) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    let text = [
        ("search", &filters.search),
        ("category", &filters.category),
        ("city", &filters.city),
    ];
    for (name, value) in text {
        if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            params.push((name, v.to_string()));
        }
    }
    if let Some(min) = filters.min_rating {
        params.push(("min_rating", min.to_string()));
    }
    let flags = [
        ("has_phone", filters.has_phone),
        ("has_whatsapp", filters.has_whatsapp),
        ("has_email", filters.has_email),
        ("is_favorite", filters.is_favorite),
    ];
    for (name, set) in flags {
        if set {
            params.push((name, "true".to_string()));
        }
    }
    if !filters.tags.is_empty() {
        params.push(("tags", filters.tags.join(",")));
    }
    params.push(("sort", sort_param(sort).to_string()));
    params.push(("page", page.to_string()));
    params
}

/// Both backends over the LeadScout HTTP API for one tenant.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    company_id: Uuid,
}

impl HttpBackend {
    pub fn new(base_url: &str, company_id: Uuid) -> Result<Self> {
        // A search page waits on the place provider and on presence checks.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self::with_client(client, base_url, company_id))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, company_id: Uuid) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            company_id,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/companies/{}{}", self.base_url, self.company_id, path)
    }

    /// Turn a response into `T`, or into `ClientError::Api` from the
    /// `{"error", "code"}` body on a non-2xx status.
    async fn read<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let body = Self::check(resp).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn check(resp: reqwest::Response) -> Result<String> {
        let status = resp.status();
        let body = resp.text().await?;
        if status.is_success() {
            return Ok(body);
        }

        let (code, message) = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(err) => (err.code.unwrap_or_else(|| "unknown".to_string()), err.error),
            Err(_) => ("unknown".to_string(), body),
        };
        tracing::warn!(status = status.as_u16(), %code, "LeadScout API request failed");
        Err(ClientError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }
}

#[async_trait]
impl SearchBackend for HttpBackend {
    async fn create(&self, query: &str, location: &str) -> Result<SearchPage> {
        let resp = self
            .client
            .post(self.url("/searches"))
            .json(&serde_json::json!({ "query": query, "location": location }))
            .send()
            .await?;
        Self::read(resp).await
    }

    async fn fetch_more(&self, session_id: Uuid) -> Result<SearchPage> {
        let resp = self
            .client
            .post(self.url(&format!("/searches/{session_id}/more")))
            .send()
            .await?;
        Self::read(resp).await
    }
}

#[async_trait]
impl LibraryBackend for HttpBackend {
    async fn query(&self, filters: &LeadFilters, sort: SortOption, page: u32) -> Result<LeadPage> {
        let resp = self
            .client
            .get(self.url("/leads"))
            .query(&library_params(filters, sort, page))
            .send()
            .await?;
        Self::read(resp).await
    }

    async fn set_favorite(&self, lead_id: Uuid, is_favorite: bool) -> Result<Lead> {
        let resp = self
            .client
            .put(self.url(&format!("/leads/{lead_id}/favorite")))
            .json(&serde_json::json!({ "is_favorite": is_favorite }))
            .send()
            .await?;
        Self::read(resp).await
    }

    async fn set_tags(&self, lead_id: Uuid, tags: &[String]) -> Result<Lead> {
        let resp = self
            .client
            .put(self.url(&format!("/leads/{lead_id}/tags")))
            .json(&serde_json::json!({ "tags": tags }))
            .send()
            .await?;
        Self::read(resp).await
    }

    async fn delete_lead(&self, lead_id: Uuid) -> Result<()> {
        let resp = self
            .client
            .delete(self.url(&format!("/leads/{lead_id}")))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn clear_all(&self) -> Result<u64> {
        let resp = self.client.delete(self.url("/leads")).send().await?;
        let cleared: ClearedBody = Self::read(resp).await?;
        Ok(cleared.deleted)
    }

    async fn tags(&self) -> Result<Vec<String>> {
        let resp = self.client.get(self.url("/leads/tags")).send().await?;
        Self::read(resp).await
    }

    async fn categories(&self) -> Result<Vec<String>> {
        let resp = self.client.get(self.url("/leads/categories")).send().await?;
        Self::read(resp).await
    }
}
