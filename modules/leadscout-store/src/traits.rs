use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use leadscout_common::{
    CompanySettings, Lead, LeadDraft, LeadFilters, LeadPage, SearchResult, SearchSession,
    SessionStatus, SortOption,
};

use crate::error::Result;

/// One fetched provider page, ready to be committed against its session.
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub company_id: Uuid,
    pub session_id: Uuid,
    /// The page that was fetched. The session must still be at this page.
    pub page: i32,
    /// Drafts in provider order.
    pub drafts: Vec<LeadDraft>,
    /// Whether the provider reported another page.
    pub has_more: bool,
    pub seen_at: DateTime<Utc>,
}

/// Outcome of [`LeadStore::record_page`]: the advanced session and one result per draft.
#[derive(Debug, Clone)]
pub struct RecordedPage {
    pub session: SearchSession,
    pub results: Vec<SearchResult>,
    pub new_count: i32,
    pub duplicate_count: i32,
}

#[async_trait]
pub trait LeadStore: Send + Sync {
    // --- Tenant settings ---

    async fn get_settings(&self, company_id: Uuid) -> Result<Option<CompanySettings>>;

    async fn upsert_settings(&self, settings: &CompanySettings) -> Result<CompanySettings>;

    // --- Search sessions ---

    async fn create_session(
        &self,
        company_id: Uuid,
        query: &str,
        location: &str,
    ) -> Result<SearchSession>;

    async fn get_session(&self, company_id: Uuid, session_id: Uuid) -> Result<SearchSession>;

    /// Newest first.
    async fn list_sessions(
        &self,
        company_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SearchSession>>;

    /// Removes the history record only. Leads keep existing with `search_id` cleared.
    async fn delete_session(&self, company_id: Uuid, session_id: Uuid) -> Result<()>;

    async fn set_session_status(
        &self,
        company_id: Uuid,
        session_id: Uuid,
        status: SessionStatus,
    ) -> Result<()>;

    /// Upsert every draft and advance the session, all or nothing.
    ///
    /// Fails with `Conflict` when the session is no longer at `record.page`.
    async fn record_page(&self, record: PageRecord) -> Result<RecordedPage>;

    // --- Leads library ---

    async fn query_leads(
        &self,
        company_id: Uuid,
        filters: &LeadFilters,
        sort: SortOption,
        page: u32,
    ) -> Result<LeadPage>;

    async fn get_lead(&self, company_id: Uuid, lead_id: Uuid) -> Result<Lead>;

    async fn set_favorite(&self, company_id: Uuid, lead_id: Uuid, is_favorite: bool)
        -> Result<Lead>;

    async fn set_tags(&self, company_id: Uuid, lead_id: Uuid, tags: Vec<String>) -> Result<Lead>;

    async fn delete_lead(&self, company_id: Uuid, lead_id: Uuid) -> Result<()>;

    /// Returns how many leads were removed.
    async fn clear_leads(&self, company_id: Uuid) -> Result<u64>;

    /// Distinct tags in use, sorted.
    async fn lead_tags(&self, company_id: Uuid) -> Result<Vec<String>>;

    /// Distinct non-empty categories, sorted.
    async fn lead_categories(&self, company_id: Uuid) -> Result<Vec<String>>;
}

/// Map a persisted lead to the result row of a search page.
pub(crate) fn search_result(lead: &Lead, is_duplicate: bool) -> SearchResult {
    SearchResult {
        id: lead.id,
        name: lead.name.clone(),
        phone: lead.phone.clone(),
        address: lead.address.clone(),
        category: lead.category.clone(),
        rating: lead.rating,
        reviews_count: lead.reviews_count,
        website: lead.website.clone(),
        has_whatsapp: lead.has_whatsapp,
        is_duplicate,
        times_found: lead.times_found,
    }
}

/// Session status after a page: finished when the provider has nothing more.
pub(crate) fn status_after_page(has_more: bool) -> SessionStatus {
    if has_more {
        SessionStatus::Active
    } else {
        SessionStatus::Completed
    }
}

pub(crate) fn has_more_after(page: u32, total: i64) -> bool {
    (u64::from(page) + 1) * (leadscout_common::LEADS_PER_PAGE as u64) < total.max(0) as u64
}

pub(crate) fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}
