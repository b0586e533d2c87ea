//! Production adapters: SerpAPI as a [`PlaceSource`], WAHA as a [`PresenceChecker`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serpapi_client::{LocalResult, MapsSearchRequest, SerpApiClient, RESULTS_PER_PAGE};
use tracing::debug;
use waha_client::{WahaClient, WahaError};

use leadscout_common::WahaSettings;

use crate::error::{Result, SearchError};
use crate::traits::{Place, PlacePage, PlaceSource, PresenceChecker, ProviderFactory, WhatsappStatus};

pub struct SerpApiPlaces {
    client: SerpApiClient,
}

impl SerpApiPlaces {
    pub fn new(client: SerpApiClient) -> Self {
        Self { client }
    }
}

impl From<LocalResult> for Place {
    fn from(r: LocalResult) -> Self {
        Place {
            title: r.title,
            address: r.address,
            phone: r.phone,
            website: r.website,
            email: None,
            rating: r.rating,
            reviews: r.reviews,
            place_type: r.place_type,
        }
    }
}

#[async_trait]
impl PlaceSource for SerpApiPlaces {
    async fn search(&self, query: &str, page: u32) -> Result<PlacePage> {
        let request = MapsSearchRequest::new(query, page * RESULTS_PER_PAGE);
        let response = self.client.google_maps(&request).await?;
        let has_more = response.has_next_page();

        debug!(
            query_len = query.len(),
            page,
            results = response.local_results.len(),
            has_more,
            "SerpAPI page fetched"
        );

        Ok(PlacePage {
            places: response.local_results.into_iter().map(Place::from).collect(),
            has_more,
        })
    }
}

pub struct WahaPresence {
    client: WahaClient,
}

impl WahaPresence {
    pub fn new(client: WahaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PresenceChecker for WahaPresence {
    async fn has_whatsapp(&self, phone: &str) -> Result<bool> {
        Ok(self.client.check_exists(phone).await?)
    }

    async fn status(&self) -> Result<WhatsappStatus> {
        match self.client.session_status().await {
            Ok(info) => Ok(WhatsappStatus {
                connected: info.is_working(),
                status: info.status,
                error: None,
            }),
            Err(WahaError::SessionNotFound(session)) => Ok(WhatsappStatus {
                connected: false,
                status: "NOT_FOUND".to_string(),
                error: Some(format!("Session '{session}' not found")),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Builds provider clients per tenant over one shared connection pool.
#[derive(Clone)]
pub struct HttpProviders {
    serpapi: reqwest::Client,
    waha: reqwest::Client,
    serpapi_base_url: String,
}

impl HttpProviders {
    pub fn new(serpapi_base_url: impl Into<String>) -> Result<Self> {
        let build = |timeout: u64| {
            reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout))
                .build()
                .map_err(|e| SearchError::ProviderUnavailable(e.to_string()))
        };
        Ok(Self {
            serpapi: build(30)?,
            waha: build(10)?,
            serpapi_base_url: serpapi_base_url.into(),
        })
    }
}

impl ProviderFactory for HttpProviders {
    fn place_source(&self, api_key: &str) -> Result<Arc<dyn PlaceSource>> {
        let client = SerpApiClient::with_client(self.serpapi.clone(), &self.serpapi_base_url, api_key);
        Ok(Arc::new(SerpApiPlaces::new(client)))
    }

    fn presence_checker(&self, waha: &WahaSettings) -> Result<Arc<dyn PresenceChecker>> {
        let client =
            WahaClient::with_client(self.waha.clone(), &waha.api_url, &waha.api_key, &waha.session);
        Ok(Arc::new(WahaPresence::new(client)))
    }
}
