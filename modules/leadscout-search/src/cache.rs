//! Per-tenant TTL cache of provider settings.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use uuid::Uuid;

use leadscout_common::CompanySettings;
use leadscout_store::LeadStore;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: Uuid,
    /// `None` caches the absence of a settings row.
    pub value: Option<CompanySettings>,
    pub fetched_at: Instant,
}

pub struct SettingsCache {
    ttl: Duration,
    entries: RwLock<HashMap<Uuid, CacheEntry>>,
}

impl SettingsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_fresh(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.fetched_at) < self.ttl
    }

    /// Cached settings for `company_id`, loading from the store when missing or stale.
    pub async fn get(
        &self,
        company_id: Uuid,
        store: &dyn LeadStore,
    ) -> Result<Option<CompanySettings>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.read().await.get(&company_id) {
            if self.is_fresh(entry, now) {
                return Ok(entry.value.clone());
            }
        }

        let value = store.get_settings(company_id).await?;
        self.entries.write().await.insert(
            company_id,
            CacheEntry {
                key: company_id,
                value: value.clone(),
                fetched_at: now,
            },
        );
        Ok(value)
    }

    pub async fn invalidate(&self, company_id: Uuid) {
        self.entries.write().await.remove(&company_id);
    }

    pub async fn reset(&self) {
        self.entries.write().await.clear();
    }
}
