//! Client-side state of an in-progress multi-page search.
//!
//! The holder is cheap to clone; every clone sees the same state. The lock
//! is only taken between awaits, never across a backend call.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};
use uuid::Uuid;

use leadscout_common::{validate_search_input, SearchPage, SearchResult, SessionStatus};

use crate::backend::SearchBackend;
use crate::error::{ClientError, Result};

/// What the client knows about the live search session.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub id: Uuid,
    pub query: String,
    pub location: String,
    pub current_page: i32,
    pub new_leads_count: i32,
    pub duplicate_leads_count: i32,
    pub total_results_found: i32,
    pub status: SessionStatus,
    pub has_more: bool,
    pub used_real_api: bool,
}

impl ActiveSession {
    fn from_page(query: String, location: String, page: &SearchPage) -> Self {
        let mut session = Self {
            id: page.session_id,
            query,
            location,
            current_page: 0,
            new_leads_count: 0,
            duplicate_leads_count: 0,
            total_results_found: 0,
            status: SessionStatus::Active,
            has_more: false,
            used_real_api: page.used_real_api,
        };
        session.apply(page);
        session
    }

    /// Running totals come from the server, which counts across all pages.
    fn apply(&mut self, page: &SearchPage) {
        self.current_page = page.current_page;
        self.new_leads_count = page.total_new;
        self.duplicate_leads_count = page.total_duplicates;
        self.total_results_found = page.total_new + page.total_duplicates;
        self.status = page.status;
        self.has_more = page.has_more;
    }
}

#[derive(Default)]
struct State {
    session: Option<ActiveSession>,
    results: Vec<SearchResult>,
    error: Option<String>,
    is_searching: bool,
    /// Bumped by every start and reset; responses tagged with an older
    /// generation are dropped.
    generation: u64,
}

#[derive(Clone)]
pub struct SearchSessionState {
    backend: Arc<dyn SearchBackend>,
    state: Arc<Mutex<State>>,
}

impl SearchSessionState {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // State is plain data; a panic elsewhere cannot leave it half-written.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a new search and load its first page.
    ///
    /// Blank input is rejected without a backend call. A search started
    /// later supersedes this one: if that happens before the response
    /// arrives, the response is returned but not applied.
    pub async fn start_search(&self, query: &str, location: &str) -> Result<SearchPage> {
        if let Err(e) = validate_search_input(query, location) {
            let err = ClientError::InvalidInput(e.to_string());
            self.lock().error = Some(err.to_string());
            return Err(err);
        }

        let generation = {
            let mut state = self.lock();
            state.generation += 1;
            state.results.clear();
            state.error = None;
            state.is_searching = true;
            state.generation
        };

        let outcome = self.backend.create(query, location).await;

        let mut state = self.lock();
        if state.generation != generation {
            debug!(generation, "Discarding superseded search response");
            return outcome;
        }
        state.is_searching = false;

        match outcome {
            Ok(page) => {
                info!(
                    session_id = %page.session_id,
                    new = page.new_count,
                    duplicates = page.duplicate_count,
                    has_more = page.has_more,
                    "Search started"
                );
                state.session = Some(ActiveSession::from_page(
                    query.trim().to_string(),
                    location.trim().to_string(),
                    &page,
                ));
                state.results = page.results.clone();
                Ok(page)
            }
            Err(e) => {
                warn!(error = %e, "Search failed");
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Load the next page of the live session.
    ///
    /// `Ok(None)` without a backend call when there is no session, the session
    /// is completed or has no further page, or a request is already in flight.
    /// Also `Ok(None)` when the session changed while the request was out.
    pub async fn fetch_more(&self) -> Result<Option<SearchPage>> {
        let (generation, session_id) = {
            let mut state = self.lock();
            let Some(session) = state.session.as_ref() else {
                return Ok(None);
            };
            if session.status == SessionStatus::Completed || !session.has_more {
                debug!(session_id = %session.id, "Session has no more pages");
                return Ok(None);
            }
            if state.is_searching {
                return Ok(None);
            }
            let session_id = session.id;
            state.is_searching = true;
            state.error = None;
            (state.generation, session_id)
        };

        let outcome = self.backend.fetch_more(session_id).await;

        let mut state = self.lock();
        let live = state.generation == generation
            && state.session.as_ref().map(|s| s.id) == Some(session_id);
        if !live {
            debug!(%session_id, "Discarding page for a superseded session");
            return Ok(None);
        }
        state.is_searching = false;

        match outcome {
            Ok(page) => {
                if let Some(session) = state.session.as_mut() {
                    session.apply(&page);
                }
                state.results.extend(page.results.iter().cloned());
                Ok(Some(page))
            }
            Err(e) => {
                warn!(%session_id, error = %e, "Fetching more results failed");
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Back to the initial empty state. Responses still in flight are dropped.
    pub fn reset_search(&self) {
        let mut state = self.lock();
        let generation = state.generation + 1;
        *state = State {
            generation,
            ..State::default()
        };
    }

    pub fn session(&self) -> Option<ActiveSession> {
        self.lock().session.clone()
    }

    pub fn results(&self) -> Vec<SearchResult> {
        self.lock().results.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn is_searching(&self) -> bool {
        self.lock().is_searching
    }

    pub fn has_more(&self) -> bool {
        self.lock().session.as_ref().is_some_and(|s| s.has_more)
    }

    pub fn is_completed(&self) -> bool {
        self.lock()
            .session
            .as_ref()
            .is_some_and(|s| s.status == SessionStatus::Completed)
    }
}
