// Trait boundaries of the search proxy.
//
// - PlaceSource: one page of places for a composed query (SerpAPI, demo data)
// - PresenceChecker: WhatsApp presence and session status (WAHA)
// - ProviderFactory: builds both from a tenant's credentials

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use leadscout_common::WahaSettings;

use crate::error::Result;

/// A place as returned by a place source, before dedup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Place {
    pub title: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub rating: Option<f64>,
    pub reviews: Option<i64>,
    pub place_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacePage {
    /// Places in provider order.
    pub places: Vec<Place>,
    pub has_more: bool,
}

#[async_trait]
pub trait PlaceSource: Send + Sync {
    /// Fetch page `page` (0-based) of `query`.
    async fn search(&self, query: &str, page: u32) -> Result<PlacePage>;

    /// Whether results come from the live provider.
    fn is_live(&self) -> bool {
        true
    }
}

/// Connection state of a tenant's WhatsApp gateway session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WhatsappStatus {
    pub connected: bool,
    pub status: String,
    pub error: Option<String>,
}

#[async_trait]
pub trait PresenceChecker: Send + Sync {
    /// `phone` is digits with country code.
    async fn has_whatsapp(&self, phone: &str) -> Result<bool>;

    async fn status(&self) -> Result<WhatsappStatus>;
}

pub trait ProviderFactory: Send + Sync {
    fn place_source(&self, api_key: &str) -> Result<Arc<dyn PlaceSource>>;

    fn presence_checker(&self, waha: &WahaSettings) -> Result<Arc<dyn PresenceChecker>>;
}
