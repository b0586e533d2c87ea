//! Paged, filtered view of a tenant's leads library.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};
use uuid::Uuid;

use leadscout_common::{normalize_tags, Lead, LeadFilters, SortOption};

use crate::backend::LibraryBackend;
use crate::error::{ClientError, Result};

#[derive(Default)]
struct State {
    leads: Vec<Lead>,
    /// Next page to load.
    page: u32,
    has_more: bool,
    total_count: i64,
    is_loading: bool,
    filters: LeadFilters,
    sort: SortOption,
    error: Option<String>,
    /// Bumped whenever the list is reset; pages for an older view are dropped.
    generation: u64,
}

#[derive(Clone)]
pub struct LeadsLibrary {
    backend: Arc<dyn LibraryBackend>,
    state: Arc<Mutex<State>>,
}

impl LeadsLibrary {
    pub fn new(backend: Arc<dyn LibraryBackend>) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(State {
                has_more: true,
                ..State::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reload page 0, replacing the list.
    pub async fn refresh(&self) -> Result<()> {
        let (generation, filters, sort) = {
            let mut state = self.lock();
            state.generation += 1;
            state.is_loading = true;
            state.error = None;
            (state.generation, state.filters.clone(), state.sort)
        };
        self.load(generation, filters, sort, 0).await
    }

    /// Append the next page. No-op when nothing is left or a load is running.
    pub async fn fetch_more(&self) -> Result<()> {
        let (generation, filters, sort, page) = {
            let mut state = self.lock();
            if !state.has_more || state.is_loading {
                return Ok(());
            }
            state.is_loading = true;
            state.error = None;
            (state.generation, state.filters.clone(), state.sort, state.page)
        };
        self.load(generation, filters, sort, page).await
    }

    async fn load(&self, generation: u64, filters: LeadFilters, sort: SortOption, page: u32) -> Result<()> {
        let outcome = self.backend.query(&filters, sort, page).await;

        let mut state = self.lock();
        if state.generation != generation {
            debug!(page, "Discarding leads page for a superseded view");
            return Ok(());
        }
        state.is_loading = false;

        match outcome {
            Ok(result) => {
                if page == 0 {
                    state.leads = result.leads;
                } else {
                    state.leads.extend(result.leads);
                }
                state.page = page + 1;
                state.has_more = result.has_more;
                state.total_count = result.total_count;
                Ok(())
            }
            Err(e) => {
                warn!(page, error = %e, "Loading leads failed");
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn reset_view(&self, update: impl FnOnce(&mut State)) {
        let mut state = self.lock();
        update(&mut state);
        state.page = 0;
        state.leads.clear();
        state.has_more = true;
        state.total_count = 0;
    }

    /// Replace the filters, clear the list and load page 0.
    pub async fn apply_filters(&self, filters: LeadFilters) -> Result<()> {
        self.reset_view(|state| state.filters = filters);
        self.refresh().await
    }

    /// Replace the sort order, clear the list and load page 0.
    pub async fn change_sort(&self, sort: SortOption) -> Result<()> {
        self.reset_view(|state| state.sort = sort);
        self.refresh().await
    }

    /// Apply `mutate` to the loaded lead and return the pre-mutation snapshot.
    fn apply_local(&self, lead_id: Uuid, mutate: impl FnOnce(&mut Lead)) -> Result<Lead> {
        let mut state = self.lock();
        let lead = state
            .leads
            .iter_mut()
            .find(|l| l.id == lead_id)
            .ok_or_else(|| ClientError::InvalidInput(format!("Lead {lead_id} is not loaded")))?;
        let snapshot = lead.clone();
        mutate(lead);
        Ok(snapshot)
    }

    /// Put `lead` back in place if it is still listed.
    fn replace_local(&self, lead: Lead) {
        let mut state = self.lock();
        if let Some(slot) = state.leads.iter_mut().find(|l| l.id == lead.id) {
            *slot = lead;
        }
    }

    /// Flip the favorite flag. Shown immediately; restored if saving fails.
    pub async fn toggle_favorite(&self, lead_id: Uuid) -> Result<bool> {
        let snapshot = self.apply_local(lead_id, |lead| lead.is_favorite = !lead.is_favorite)?;
        let is_favorite = !snapshot.is_favorite;

        match self.backend.set_favorite(lead_id, is_favorite).await {
            Ok(saved) => {
                self.replace_local(saved);
                Ok(is_favorite)
            }
            Err(e) => {
                warn!(%lead_id, error = %e, "Saving favorite failed, rolling back");
                self.replace_local(snapshot);
                self.lock().error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Replace the lead's tags. Shown immediately; restored if saving fails.
    pub async fn update_tags(&self, lead_id: Uuid, tags: Vec<String>) -> Result<()> {
        let tags = normalize_tags(tags);
        let local = tags.clone();
        let snapshot = self.apply_local(lead_id, move |lead| lead.tags = local)?;

        match self.backend.set_tags(lead_id, &tags).await {
            Ok(saved) => {
                self.replace_local(saved);
                Ok(())
            }
            Err(e) => {
                warn!(%lead_id, error = %e, "Saving tags failed, rolling back");
                self.replace_local(snapshot);
                self.lock().error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Delete from the store, then from the list.
    pub async fn delete_lead(&self, lead_id: Uuid) -> Result<()> {
        if let Err(e) = self.backend.delete_lead(lead_id).await {
            self.lock().error = Some(e.to_string());
            return Err(e);
        }

        let mut state = self.lock();
        let before = state.leads.len();
        state.leads.retain(|l| l.id != lead_id);
        if state.leads.len() < before {
            state.total_count = (state.total_count - 1).max(0);
        }
        Ok(())
    }

    /// Delete every lead of the tenant.
    pub async fn clear_all(&self) -> Result<u64> {
        let deleted = match self.backend.clear_all().await {
            Ok(deleted) => deleted,
            Err(e) => {
                self.lock().error = Some(e.to_string());
                return Err(e);
            }
        };

        let mut state = self.lock();
        state.generation += 1;
        state.leads.clear();
        state.total_count = 0;
        state.page = 0;
        state.has_more = false;
        state.is_loading = false;
        Ok(deleted)
    }

    pub async fn available_tags(&self) -> Result<Vec<String>> {
        self.backend.tags().await
    }

    pub async fn available_categories(&self) -> Result<Vec<String>> {
        self.backend.categories().await
    }

    pub fn leads(&self) -> Vec<Lead> {
        self.lock().leads.clone()
    }

    pub fn total_count(&self) -> i64 {
        self.lock().total_count
    }

    pub fn has_more(&self) -> bool {
        self.lock().has_more
    }

    pub fn is_loading(&self) -> bool {
        self.lock().is_loading
    }

    pub fn page(&self) -> u32 {
        self.lock().page
    }

    pub fn filters(&self) -> LeadFilters {
        self.lock().filters.clone()
    }

    pub fn sort(&self) -> SortOption {
        self.lock().sort
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }
}
