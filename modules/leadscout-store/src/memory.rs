//! In-process `LeadStore` with the same semantics as Postgres. One mutex
//! guards all state, so a recorded page is atomic like the SQL transaction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use leadscout_common::{
    normalize_tags, CompanySettings, Lead, LeadFilters, LeadPage, SearchSession, SessionStatus,
    Sighting, SortOption, LEADS_PER_PAGE, MAX_SIGHTINGS,
};

use crate::error::{Result, StoreError};
use crate::traits::{
    has_more_after, non_empty, search_result, status_after_page, LeadStore, PageRecord,
    RecordedPage,
};

#[derive(Default)]
struct State {
    settings: HashMap<Uuid, CompanySettings>,
    sessions: HashMap<Uuid, SearchSession>,
    /// Insertion order doubles as the unique (company_id, fingerprint) index.
    leads: Vec<Lead>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutating calls made so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Every lead of a company, in insertion order.
    pub async fn leads(&self, company_id: Uuid) -> Vec<Lead> {
        let state = self.state.lock().await;
        state
            .leads
            .iter()
            .filter(|l| l.company_id == company_id)
            .cloned()
            .collect()
    }

    /// Seed a lead directly, bypassing search sessions.
    pub async fn insert_lead(&self, lead: Lead) {
        self.state.lock().await.leads.push(lead);
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn session_not_found(id: Uuid) -> StoreError {
    StoreError::NotFound(format!("Search session {id}"))
}

fn lead_not_found(id: Uuid) -> StoreError {
    StoreError::NotFound(format!("Lead {id}"))
}

fn lead_mut(state: &mut State, company_id: Uuid, lead_id: Uuid) -> Result<&mut Lead> {
    state
        .leads
        .iter_mut()
        .find(|l| l.id == lead_id && l.company_id == company_id)
        .ok_or_else(|| lead_not_found(lead_id))
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn get_settings(&self, company_id: Uuid) -> Result<Option<CompanySettings>> {
        Ok(self.state.lock().await.settings.get(&company_id).cloned())
    }

    async fn upsert_settings(&self, settings: &CompanySettings) -> Result<CompanySettings> {
        self.wrote();
        let mut state = self.state.lock().await;
        state.settings.insert(settings.company_id, settings.clone());
        Ok(settings.clone())
    }

    async fn create_session(
        &self,
        company_id: Uuid,
        query: &str,
        location: &str,
    ) -> Result<SearchSession> {
        self.wrote();
        let now = Utc::now();
        let session = SearchSession {
            id: Uuid::new_v4(),
            company_id,
            query: query.to_string(),
            location: location.to_string(),
            current_page: 0,
            new_leads_count: 0,
            duplicate_leads_count: 0,
            total_results_found: 0,
            status: SessionStatus::Active,
            has_more: true,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, company_id: Uuid, session_id: Uuid) -> Result<SearchSession> {
        let state = self.state.lock().await;
        state
            .sessions
            .get(&session_id)
            .filter(|s| s.company_id == company_id)
            .cloned()
            .ok_or_else(|| session_not_found(session_id))
    }

    async fn list_sessions(
        &self,
        company_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SearchSession>> {
        let state = self.state.lock().await;
        let mut sessions: Vec<SearchSession> = state
            .sessions
            .values()
            .filter(|s| s.company_id == company_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(sessions
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn delete_session(&self, company_id: Uuid, session_id: Uuid) -> Result<()> {
        self.wrote();
        let mut state = self.state.lock().await;
        match state.sessions.get(&session_id) {
            Some(s) if s.company_id == company_id => {}
            _ => return Err(session_not_found(session_id)),
        }
        state.sessions.remove(&session_id);
        for lead in state.leads.iter_mut().filter(|l| l.search_id == Some(session_id)) {
            lead.search_id = None;
        }
        Ok(())
    }

    async fn set_session_status(
        &self,
        company_id: Uuid,
        session_id: Uuid,
        status: SessionStatus,
    ) -> Result<()> {
        self.wrote();
        let mut state = self.state.lock().await;
        let session = state
            .sessions
            .get_mut(&session_id)
            .filter(|s| s.company_id == company_id)
            .ok_or_else(|| session_not_found(session_id))?;
        session.status = status;
        session.updated_at = Utc::now();
        Ok(())
    }

    async fn record_page(&self, record: PageRecord) -> Result<RecordedPage> {
        self.wrote();
        let mut state = self.state.lock().await;

        let session = state
            .sessions
            .get(&record.session_id)
            .filter(|s| s.company_id == record.company_id)
            .cloned()
            .ok_or_else(|| session_not_found(record.session_id))?;

        if session.current_page != record.page {
            return Err(StoreError::Conflict(format!(
                "session {} is at page {}, not {}",
                record.session_id, session.current_page, record.page
            )));
        }

        let sighting = Sighting {
            found_at: record.seen_at,
            query: session.query.clone(),
            location: session.location.clone(),
        };

        let mut results = Vec::with_capacity(record.drafts.len());
        let (mut new_count, mut duplicate_count) = (0i32, 0i32);

        for draft in &record.drafts {
            let fingerprint = draft.fingerprint();
            let existing = state
                .leads
                .iter()
                .position(|l| l.company_id == record.company_id && l.fingerprint == fingerprint);

            let (lead, is_duplicate) = match existing {
                Some(idx) => {
                    let lead = &mut state.leads[idx];
                    lead.times_found += 1;
                    lead.last_seen_at = record.seen_at;
                    lead.sources.push(sighting.clone());
                    if lead.sources.len() > MAX_SIGHTINGS {
                        let excess = lead.sources.len() - MAX_SIGHTINGS;
                        lead.sources.drain(..excess);
                    }
                    if let Some(known) = draft.has_whatsapp {
                        lead.has_whatsapp = known;
                    }
                    if draft.phone.is_some() {
                        lead.phone = draft.phone.clone();
                    }
                    if lead.email.is_none() {
                        lead.email = draft.email.clone();
                    }
                    lead.has_email = lead.has_email || non_empty(&draft.email);
                    if draft.rating.is_some() {
                        lead.rating = draft.rating;
                    }
                    lead.reviews_count = lead.reviews_count.max(draft.reviews_count);
                    if draft.website.is_some() {
                        lead.website = draft.website.clone();
                    }
                    if lead.category.is_none() {
                        lead.category = draft.category.clone();
                    }
                    (lead.clone(), true)
                }
                None => {
                    let lead = Lead {
                        id: Uuid::new_v4(),
                        company_id: record.company_id,
                        fingerprint,
                        name: draft.name.clone(),
                        phone: draft.phone.clone(),
                        has_whatsapp: draft.has_whatsapp.unwrap_or(false),
                        email: draft.email.clone(),
                        has_email: non_empty(&draft.email),
                        address: draft.address.clone(),
                        category: draft.category.clone(),
                        rating: draft.rating,
                        reviews_count: draft.reviews_count,
                        website: draft.website.clone(),
                        tags: Vec::new(),
                        is_favorite: false,
                        times_found: 1,
                        first_seen_at: record.seen_at,
                        last_seen_at: record.seen_at,
                        created_at: record.seen_at,
                        search_id: Some(record.session_id),
                        sources: vec![sighting.clone()],
                    };
                    state.leads.push(lead.clone());
                    (lead, false)
                }
            };

            if is_duplicate {
                duplicate_count += 1;
            } else {
                new_count += 1;
            }
            results.push(search_result(&lead, is_duplicate));
        }

        let session = state
            .sessions
            .get_mut(&record.session_id)
            .ok_or_else(|| session_not_found(record.session_id))?;
        session.current_page += 1;
        session.new_leads_count += new_count;
        session.duplicate_leads_count += duplicate_count;
        session.total_results_found += results.len() as i32;
        session.has_more = record.has_more;
        session.status = status_after_page(record.has_more);
        session.updated_at = record.seen_at;

        Ok(RecordedPage {
            session: session.clone(),
            results,
            new_count,
            duplicate_count,
        })
    }

    async fn query_leads(
        &self,
        company_id: Uuid,
        filters: &LeadFilters,
        sort: SortOption,
        page: u32,
    ) -> Result<LeadPage> {
        let state = self.state.lock().await;
        let mut matching: Vec<Lead> = state
            .leads
            .iter()
            .filter(|l| l.company_id == company_id && filters.matches(l))
            .cloned()
            .collect();
        matching.sort_by(|a, b| sort.compare(a, b));

        let total_count = matching.len() as i64;
        let leads = matching
            .into_iter()
            .skip(page as usize * LEADS_PER_PAGE)
            .take(LEADS_PER_PAGE)
            .collect();

        Ok(LeadPage {
            leads,
            total_count,
            page,
            has_more: has_more_after(page, total_count),
        })
    }

    async fn get_lead(&self, company_id: Uuid, lead_id: Uuid) -> Result<Lead> {
        let mut state = self.state.lock().await;
        lead_mut(&mut state, company_id, lead_id).map(|l| l.clone())
    }

    async fn set_favorite(
        &self,
        company_id: Uuid,
        lead_id: Uuid,
        is_favorite: bool,
    ) -> Result<Lead> {
        self.wrote();
        let mut state = self.state.lock().await;
        let lead = lead_mut(&mut state, company_id, lead_id)?;
        lead.is_favorite = is_favorite;
        Ok(lead.clone())
    }

    async fn set_tags(&self, company_id: Uuid, lead_id: Uuid, tags: Vec<String>) -> Result<Lead> {
        self.wrote();
        let mut state = self.state.lock().await;
        let lead = lead_mut(&mut state, company_id, lead_id)?;
        lead.tags = normalize_tags(tags);
        Ok(lead.clone())
    }

    async fn delete_lead(&self, company_id: Uuid, lead_id: Uuid) -> Result<()> {
        self.wrote();
        let mut state = self.state.lock().await;
        let before = state.leads.len();
        state
            .leads
            .retain(|l| !(l.id == lead_id && l.company_id == company_id));
        if state.leads.len() == before {
            return Err(lead_not_found(lead_id));
        }
        Ok(())
    }

    async fn clear_leads(&self, company_id: Uuid) -> Result<u64> {
        self.wrote();
        let mut state = self.state.lock().await;
        let before = state.leads.len();
        state.leads.retain(|l| l.company_id != company_id);
        Ok((before - state.leads.len()) as u64)
    }

    async fn lead_tags(&self, company_id: Uuid) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        let mut tags: Vec<String> = state
            .leads
            .iter()
            .filter(|l| l.company_id == company_id)
            .flat_map(|l| l.tags.iter().cloned())
            .collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }

    async fn lead_categories(&self, company_id: Uuid) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        let mut categories: Vec<String> = state
            .leads
            .iter()
            .filter(|l| l.company_id == company_id)
            .filter_map(|l| l.category.clone())
            .filter(|c| !c.trim().is_empty())
            .collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }
}
