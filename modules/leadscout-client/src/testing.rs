// Test mocks for the client backends.
//
// - MockSearchBackend (SearchBackend): scripted pages in call order, optional gates
// - MockLibraryBackend (LibraryBackend): in-memory leads, switchable write failures

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use uuid::Uuid;

use leadscout_common::{
    normalize_tags, Lead, LeadFilters, LeadPage, SearchPage, SearchResult, SessionStatus,
    SortOption,
};

use crate::backend::{LibraryBackend, SearchBackend};
use crate::error::{ClientError, Result};

/// A result row with the given name.
pub fn result(name: &str, is_duplicate: bool, times_found: i32) -> SearchResult {
    SearchResult {
        id: Uuid::new_v4(),
        name: name.to_string(),
        phone: None,
        address: Some("Rua Augusta, 1000".to_string()),
        category: Some("Pizzaria".to_string()),
        rating: Some(4.5),
        reviews_count: 10,
        website: None,
        has_whatsapp: false,
        is_duplicate,
        times_found,
    }
}

/// A page whose counts are derived from `results`; totals equal the page counts.
pub fn page(session_id: Uuid, current_page: i32, results: Vec<SearchResult>, has_more: bool) -> SearchPage {
    let duplicate_count = results.iter().filter(|r| r.is_duplicate).count() as i32;
    let new_count = results.len() as i32 - duplicate_count;
    SearchPage {
        session_id,
        results,
        new_count,
        duplicate_count,
        current_page,
        has_more,
        total_new: new_count,
        total_duplicates: duplicate_count,
        status: if has_more {
            SessionStatus::Active
        } else {
            SessionStatus::Completed
        },
        used_real_api: true,
    }
}

pub fn api_error(status: u16, code: &str) -> ClientError {
    ClientError::Api {
        status,
        code: code.to_string(),
        message: format!("{code} ({status})"),
    }
}

// ---------------------------------------------------------------------------
// MockSearchBackend
// ---------------------------------------------------------------------------

struct Scripted {
    outcome: Result<SearchPage>,
    gate: Option<Arc<Notify>>,
}

/// Answers each call with the next scripted outcome for that operation.
/// Unscripted calls fail with a 500.
#[derive(Default)]
pub struct MockSearchBackend {
    creates: Mutex<VecDeque<Scripted>>,
    mores: Mutex<VecDeque<Scripted>>,
    create_calls: AtomicUsize,
    fetch_more_calls: AtomicUsize,
    fetched_sessions: Mutex<Vec<Uuid>>,
}

impl MockSearchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_create(self, outcome: Result<SearchPage>) -> Self {
        push(&self.creates, outcome, None);
        self
    }

    pub fn on_fetch_more(self, outcome: Result<SearchPage>) -> Self {
        push(&self.mores, outcome, None);
        self
    }

    /// The next create waits until the returned gate is notified.
    pub fn gated_create(&self, outcome: Result<SearchPage>) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        push(&self.creates, outcome, Some(gate.clone()));
        gate
    }

    /// The next fetch_more waits until the returned gate is notified.
    pub fn gated_fetch_more(&self, outcome: Result<SearchPage>) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        push(&self.mores, outcome, Some(gate.clone()));
        gate
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_more_calls(&self) -> usize {
        self.fetch_more_calls.load(Ordering::SeqCst)
    }

    pub fn fetched_sessions(&self) -> Vec<Uuid> {
        self.fetched_sessions.lock().unwrap().clone()
    }
}

fn push(queue: &Mutex<VecDeque<Scripted>>, outcome: Result<SearchPage>, gate: Option<Arc<Notify>>) {
    queue.lock().unwrap().push_back(Scripted { outcome, gate });
}

async fn answer(queue: &Mutex<VecDeque<Scripted>>) -> Result<SearchPage> {
    let next = queue.lock().unwrap().pop_front();
    let Some(scripted) = next else {
        return Err(api_error(500, "storage"));
    };
    if let Some(gate) = scripted.gate {
        gate.notified().await;
    }
    scripted.outcome
}

#[async_trait]
impl SearchBackend for MockSearchBackend {
    async fn create(&self, _query: &str, _location: &str) -> Result<SearchPage> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        answer(&self.creates).await
    }

    async fn fetch_more(&self, session_id: Uuid) -> Result<SearchPage> {
        self.fetch_more_calls.fetch_add(1, Ordering::SeqCst);
        self.fetched_sessions.lock().unwrap().push(session_id);
        answer(&self.mores).await
    }
}

// ---------------------------------------------------------------------------
// MockLibraryBackend
// ---------------------------------------------------------------------------

/// Serves leads from memory with the server's filter, sort and page rules.
pub struct MockLibraryBackend {
    leads: Mutex<Vec<Lead>>,
    per_page: usize,
    fail_writes: AtomicBool,
    queries: Mutex<Vec<(LeadFilters, SortOption, u32)>>,
}

impl MockLibraryBackend {
    pub fn new(leads: Vec<Lead>, per_page: usize) -> Self {
        Self {
            leads: Mutex::new(leads),
            per_page,
            fail_writes: AtomicBool::new(false),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Make every following write fail with a 500.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn queries(&self) -> Vec<(LeadFilters, SortOption, u32)> {
        self.queries.lock().unwrap().clone()
    }

    pub fn stored(&self) -> Vec<Lead> {
        self.leads.lock().unwrap().clone()
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(api_error(500, "storage"));
        }
        Ok(())
    }

    fn update(&self, lead_id: Uuid, mutate: impl FnOnce(&mut Lead)) -> Result<Lead> {
        self.check_write()?;
        let mut leads = self.leads.lock().unwrap();
        let lead = leads
            .iter_mut()
            .find(|l| l.id == lead_id)
            .ok_or_else(|| api_error(404, "not_found"))?;
        mutate(lead);
        Ok(lead.clone())
    }
}

#[async_trait]
impl LibraryBackend for MockLibraryBackend {
    async fn query(&self, filters: &LeadFilters, sort: SortOption, page: u32) -> Result<LeadPage> {
        self.queries
            .lock()
            .unwrap()
            .push((filters.clone(), sort, page));

        let mut matching: Vec<Lead> = self
            .leads
            .lock()
            .unwrap()
            .iter()
            .filter(|l| filters.matches(l))
            .cloned()
            .collect();
        matching.sort_by(|a, b| sort.compare(a, b));

        let start = page as usize * self.per_page;
        let leads: Vec<Lead> = matching.iter().skip(start).take(self.per_page).cloned().collect();
        Ok(LeadPage {
            has_more: start + leads.len() < matching.len(),
            total_count: matching.len() as i64,
            leads,
            page,
        })
    }

    async fn set_favorite(&self, lead_id: Uuid, is_favorite: bool) -> Result<Lead> {
        self.update(lead_id, |lead| lead.is_favorite = is_favorite)
    }

    async fn set_tags(&self, lead_id: Uuid, tags: &[String]) -> Result<Lead> {
        let tags = normalize_tags(tags.to_vec());
        self.update(lead_id, |lead| lead.tags = tags)
    }

    async fn delete_lead(&self, lead_id: Uuid) -> Result<()> {
        self.check_write()?;
        let mut leads = self.leads.lock().unwrap();
        let before = leads.len();
        leads.retain(|l| l.id != lead_id);
        if leads.len() == before {
            return Err(api_error(404, "not_found"));
        }
        Ok(())
    }

    async fn clear_all(&self) -> Result<u64> {
        self.check_write()?;
        let mut leads = self.leads.lock().unwrap();
        let deleted = leads.len() as u64;
        leads.clear();
        Ok(deleted)
    }

    async fn tags(&self) -> Result<Vec<String>> {
        let mut tags: Vec<String> = self
            .leads
            .lock()
            .unwrap()
            .iter()
            .flat_map(|l| l.tags.iter().cloned())
            .collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }

    async fn categories(&self) -> Result<Vec<String>> {
        let mut categories: Vec<String> = self
            .leads
            .lock()
            .unwrap()
            .iter()
            .filter_map(|l| l.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }
}
