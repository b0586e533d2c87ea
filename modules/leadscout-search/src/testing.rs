// Test mocks for the search proxy.
//
// - MockPlaceSource (PlaceSource): (query, page) -> PlacePage, call log
// - MockPresence (PresenceChecker): number -> bool, failing numbers, in-flight gauge
// - MockProviders (ProviderFactory): hands out the two mocks, records keys

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use leadscout_common::WahaSettings;

use crate::error::{Result, SearchError};
use crate::traits::{Place, PlacePage, PlaceSource, PresenceChecker, ProviderFactory, WhatsappStatus};

/// Shorthand for a place with a title, address and phone.
pub fn place(title: &str, address: &str, phone: Option<&str>) -> Place {
    Place {
        title: Some(title.to_string()),
        address: Some(address.to_string()),
        phone: phone.map(str::to_string),
        rating: Some(4.5),
        reviews: Some(120),
        place_type: Some("Pizzaria".to_string()),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// MockPlaceSource
// ---------------------------------------------------------------------------

type ErrorFactory = Box<dyn Fn() -> SearchError + Send + Sync>;

/// Returns registered pages; unregistered pages are empty with no further page.
#[derive(Default)]
pub struct MockPlaceSource {
    pages: HashMap<(String, u32), PlacePage>,
    failure: Option<ErrorFactory>,
    requests: Mutex<Vec<(String, u32)>>,
}

impl MockPlaceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_page(mut self, query: &str, page: u32, places: Vec<Place>, has_more: bool) -> Self {
        self.pages
            .insert((query.to_string(), page), PlacePage { places, has_more });
        self
    }

    /// Every search fails with the error built by `make`.
    pub fn failing(mut self, make: impl Fn() -> SearchError + Send + Sync + 'static) -> Self {
        self.failure = Some(Box::new(make));
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<(String, u32)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlaceSource for MockPlaceSource {
    async fn search(&self, query: &str, page: u32) -> Result<PlacePage> {
        self.requests.lock().unwrap().push((query.to_string(), page));
        if let Some(make) = &self.failure {
            return Err(make());
        }
        Ok(self
            .pages
            .get(&(query.to_string(), page))
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// MockPresence
// ---------------------------------------------------------------------------

/// Unregistered numbers are reported as not on WhatsApp.
#[derive(Default)]
pub struct MockPresence {
    numbers: HashMap<String, bool>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    status: Option<WhatsappStatus>,
}

impl MockPresence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_number(mut self, number: &str, exists: bool) -> Self {
        self.numbers.insert(number.to_string(), exists);
        self
    }

    /// Checks for `number` fail as if the gateway were unreachable.
    pub fn failing(mut self, number: &str) -> Self {
        self.failing.insert(number.to_string());
        self
    }

    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay = Some(Duration::from_millis(ms));
        self
    }

    pub fn with_status(mut self, status: WhatsappStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PresenceChecker for MockPresence {
    async fn has_whatsapp(&self, phone: &str) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(phone) {
            return Err(SearchError::ProviderUnavailable(
                "connection refused".to_string(),
            ));
        }
        Ok(self.numbers.get(phone).copied().unwrap_or(false))
    }

    async fn status(&self) -> Result<WhatsappStatus> {
        Ok(self.status.clone().unwrap_or(WhatsappStatus {
            connected: true,
            status: "WORKING".to_string(),
            error: None,
        }))
    }
}

// ---------------------------------------------------------------------------
// MockProviders
// ---------------------------------------------------------------------------

pub struct MockProviders {
    places: Arc<MockPlaceSource>,
    presence: Arc<MockPresence>,
    api_keys: Mutex<Vec<String>>,
    waha_sessions: Mutex<Vec<String>>,
}

impl MockProviders {
    pub fn new(places: Arc<MockPlaceSource>, presence: Arc<MockPresence>) -> Self {
        Self {
            places,
            presence,
            api_keys: Mutex::new(Vec::new()),
            waha_sessions: Mutex::new(Vec::new()),
        }
    }

    /// SerpAPI keys the proxy built place sources for, in order.
    pub fn api_keys(&self) -> Vec<String> {
        self.api_keys.lock().unwrap().clone()
    }

    pub fn waha_sessions(&self) -> Vec<String> {
        self.waha_sessions.lock().unwrap().clone()
    }
}

impl ProviderFactory for MockProviders {
    fn place_source(&self, api_key: &str) -> Result<Arc<dyn PlaceSource>> {
        self.api_keys.lock().unwrap().push(api_key.to_string());
        Ok(self.places.clone())
    }

    fn presence_checker(&self, waha: &WahaSettings) -> Result<Arc<dyn PresenceChecker>> {
        self.waha_sessions.lock().unwrap().push(waha.session.clone());
        Ok(self.presence.clone())
    }
}
