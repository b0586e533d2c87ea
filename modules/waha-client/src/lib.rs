pub mod error;
pub mod types;

pub use error::{Result, WahaError};
pub use types::{NumberExists, SessionInfo, SessionMe};

use std::time::Duration;

/// Client for a self-hosted WAHA instance, bound to one WhatsApp session.
#[derive(Clone)]
pub struct WahaClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    session: String,
}

impl WahaClient {
    pub fn new(base_url: &str, api_key: &str, session: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self::with_client(client, base_url, api_key, session))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, api_key: &str, session: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            session: session.to_string(),
        }
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    /// Ask WAHA whether `phone` (digits with country code) has a WhatsApp account.
    pub async fn check_exists(&self, phone: &str) -> Result<bool> {
        let url = format!("{}/api/contacts/check-exists", self.base_url);
        tracing::debug!(session = %self.session, digits = phone.len(), "WAHA check-exists");
        let resp = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .query(&[("phone", phone), ("session", self.session.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(WahaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: NumberExists = resp.json().await?;
        tracing::debug!(session = %self.session, exists = body.number_exists, "WAHA check-exists answered");
        Ok(body.number_exists)
    }

    /// Fetch the state of the configured session.
    pub async fn session_status(&self) -> Result<SessionInfo> {
        let url = format!("{}/api/sessions/{}", self.base_url, self.session);
        tracing::debug!(session = %self.session, "WAHA session status");
        let resp = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::warn!(session = %self.session, "WAHA session not found");
            return Err(WahaError::SessionNotFound(self.session.clone()));
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(WahaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let info: SessionInfo = resp.json().await?;
        tracing::debug!(session = %info.name, status = %info.status, "WAHA session status fetched");
        Ok(info)
    }
}
