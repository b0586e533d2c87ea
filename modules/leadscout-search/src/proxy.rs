//! The search proxy: one provider page in, one persisted result page out.
//!
//! Per page: resolve the tenant's settings, fetch places, map them to drafts,
//! check WhatsApp presence, then upsert every draft and advance the session in
//! a single store call. Input is validated before any store or network call.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use leadscout_common::{
    validate_search_input, CompanySettings, LeadDraft, SearchInput, SearchPage, SearchSession,
    SessionStatus,
};
use leadscout_store::{LeadStore, PageRecord};

use crate::cache::SettingsCache;
use crate::demo::DemoSource;
use crate::error::{Result, SearchError};
use crate::presence::check_presence;
use crate::traits::{Place, PlaceSource, ProviderFactory, WhatsappStatus};

pub struct SearchProxy {
    store: Arc<dyn LeadStore>,
    providers: Arc<dyn ProviderFactory>,
    settings: Arc<SettingsCache>,
    presence_concurrency: usize,
    demo: Option<Arc<dyn PlaceSource>>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Map a provider place to a lead draft. Places without a name are dropped.
/// `type` becomes the category, falling back to the searched term.
pub fn place_to_draft(place: Place, fallback_category: &str) -> Option<LeadDraft> {
    let name = non_blank(place.title)?;
    Some(LeadDraft {
        name,
        phone: non_blank(place.phone),
        address: non_blank(place.address),
        category: non_blank(place.place_type).or_else(|| Some(fallback_category.to_string())),
        rating: place.rating,
        reviews_count: place
            .reviews
            .map(|r| r.clamp(0, i64::from(i32::MAX)) as i32)
            .unwrap_or(0),
        website: non_blank(place.website),
        email: non_blank(place.email),
        has_whatsapp: None,
    })
}

impl SearchProxy {
    pub fn new(
        store: Arc<dyn LeadStore>,
        providers: Arc<dyn ProviderFactory>,
        settings: Arc<SettingsCache>,
        presence_concurrency: usize,
    ) -> Self {
        Self {
            store,
            providers,
            settings,
            presence_concurrency: presence_concurrency.max(1),
            demo: None,
        }
    }

    /// Serve demo places to tenants without a SerpAPI key.
    pub fn with_demo_data(mut self, enabled: bool) -> Self {
        self.demo = enabled.then(|| Arc::new(DemoSource) as Arc<dyn PlaceSource>);
        self
    }

    pub fn settings_cache(&self) -> &Arc<SettingsCache> {
        &self.settings
    }

    /// Start a new search session and return its first page.
    ///
    /// Without a SerpAPI key (and without demo data) the page is empty,
    /// `used_real_api` is false and nothing is written.
    pub async fn start_search(
        &self,
        company_id: Uuid,
        query: &str,
        location: &str,
    ) -> Result<SearchPage> {
        let input = validate_search_input(query, location)?;
        let settings = self.settings.get(company_id, self.store.as_ref()).await?;

        let Some(source) = self.place_source(settings.as_ref())? else {
            info!(%company_id, "No SerpAPI key configured, returning an empty page");
            return Ok(empty_page());
        };

        let session = self
            .store
            .create_session(company_id, &input.query, &input.location)
            .await?;

        info!(
            %company_id,
            session_id = %session.id,
            query_len = input.query.len(),
            live = source.is_live(),
            "Search session started"
        );

        self.fetch_page(session, source, settings.as_ref()).await
    }

    /// Fetch the next page of an existing session.
    pub async fn fetch_more(&self, company_id: Uuid, session_id: Uuid) -> Result<SearchPage> {
        let session = self.store.get_session(company_id, session_id).await?;
        if session.status == SessionStatus::Completed || !session.has_more {
            return Err(SearchError::Conflict(format!(
                "Search session {session_id} has no more pages"
            )));
        }

        let settings = self.settings.get(company_id, self.store.as_ref()).await?;
        let source = self
            .place_source(settings.as_ref())?
            .ok_or_else(|| SearchError::ProviderNotConfigured("SerpAPI key".to_string()))?;

        self.fetch_page(session, source, settings.as_ref()).await
    }

    /// WAHA session status for the tenant's configured gateway.
    pub async fn whatsapp_status(&self, company_id: Uuid) -> Result<WhatsappStatus> {
        let settings = self.settings.get(company_id, self.store.as_ref()).await?;
        let waha = settings
            .as_ref()
            .and_then(CompanySettings::waha)
            .ok_or_else(|| SearchError::ProviderNotConfigured("WAHA".to_string()))?;

        let checker = self.providers.presence_checker(&waha)?;
        match checker.status().await {
            Ok(status) => Ok(status),
            Err(e) => {
                warn!(%company_id, error = %e, "WAHA status check failed");
                Ok(WhatsappStatus {
                    connected: false,
                    status: "UNREACHABLE".to_string(),
                    error: Some(e.to_string()),
                })
            }
        }
    }

    fn place_source(
        &self,
        settings: Option<&CompanySettings>,
    ) -> Result<Option<Arc<dyn PlaceSource>>> {
        match settings.and_then(CompanySettings::search_key) {
            Some(key) => self.providers.place_source(key).map(Some),
            None => Ok(self.demo.clone()),
        }
    }

    async fn fetch_page(
        &self,
        session: SearchSession,
        source: Arc<dyn PlaceSource>,
        settings: Option<&CompanySettings>,
    ) -> Result<SearchPage> {
        let page = session.current_page;
        let query = SearchInput {
            query: session.query.clone(),
            location: session.location.clone(),
        }
        .provider_query();

        let fetched = match source.search(&query, page.max(0) as u32).await {
            Ok(fetched) => fetched,
            Err(e) => {
                // A failed first page leaves no session the caller can resume.
                if page == 0 || e.is_terminal() {
                    if let Err(mark) = self
                        .store
                        .set_session_status(session.company_id, session.id, SessionStatus::Error)
                        .await
                    {
                        warn!(session_id = %session.id, error = %mark, "Failed to mark session as errored");
                    }
                }
                warn!(session_id = %session.id, page, error = %e, "Place search failed");
                return Err(e);
            }
        };

        let mut drafts: Vec<LeadDraft> = fetched
            .places
            .into_iter()
            .filter_map(|p| place_to_draft(p, &session.query))
            .collect();

        let waha = settings.and_then(CompanySettings::waha);
        if let (Some(waha), true) = (waha, source.is_live()) {
            let checker = self.providers.presence_checker(&waha)?;
            let phones: Vec<Option<String>> = drafts.iter().map(|d| d.phone.clone()).collect();
            let flags = check_presence(checker.as_ref(), &phones, self.presence_concurrency).await;
            for (draft, flag) in drafts.iter_mut().zip(flags) {
                draft.has_whatsapp = flag;
            }
        }

        let recorded = self
            .store
            .record_page(PageRecord {
                company_id: session.company_id,
                session_id: session.id,
                page,
                drafts,
                has_more: fetched.has_more,
                seen_at: Utc::now(),
            })
            .await?;

        info!(
            session_id = %session.id,
            page,
            new_count = recorded.new_count,
            duplicate_count = recorded.duplicate_count,
            has_more = recorded.session.has_more,
            "Search page recorded"
        );

        Ok(SearchPage {
            session_id: recorded.session.id,
            results: recorded.results,
            new_count: recorded.new_count,
            duplicate_count: recorded.duplicate_count,
            current_page: recorded.session.current_page,
            has_more: recorded.session.has_more,
            total_new: recorded.session.new_leads_count,
            total_duplicates: recorded.session.duplicate_leads_count,
            status: recorded.session.status,
            used_real_api: source.is_live(),
        })
    }
}

/// Page returned when no provider is available. Nothing was persisted.
fn empty_page() -> SearchPage {
    SearchPage {
        session_id: Uuid::nil(),
        results: Vec::new(),
        new_count: 0,
        duplicate_count: 0,
        current_page: 0,
        has_more: false,
        total_new: 0,
        total_duplicates: 0,
        status: SessionStatus::Completed,
        used_real_api: false,
    }
}
