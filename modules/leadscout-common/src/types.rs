use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fingerprint::fingerprint;

/// Page size of the leads library.
pub const LEADS_PER_PAGE: usize = 50;

/// WAHA session name used when a tenant does not set one.
pub const DEFAULT_WAHA_SESSION: &str = "default";

/// Sightings kept per lead; older ones are dropped first.
pub const MAX_SIGHTINGS: usize = 50;

// --- Leads ---

/// One sighting of a lead by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sighting {
    pub found_at: DateTime<Utc>,
    pub query: String,
    pub location: String,
}

/// A place mapped from the search provider, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadDraft {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category: Option<String>,
    pub rating: Option<f64>,
    pub reviews_count: i32,
    pub website: Option<String>,
    pub email: Option<String>,
    /// `None` when WhatsApp presence is unknown (not checked, or the check failed).
    pub has_whatsapp: Option<bool>,
}

impl LeadDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: None,
            address: None,
            category: None,
            rating: None,
            reviews_count: 0,
            website: None,
            email: None,
            has_whatsapp: None,
        }
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.name, self.address.as_deref(), self.phone.as_deref())
    }
}

/// A deduplicated lead row. At most one per (company, fingerprint).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub company_id: Uuid,
    pub fingerprint: String,
    pub name: String,
    pub phone: Option<String>,
    pub has_whatsapp: bool,
    pub email: Option<String>,
    pub has_email: bool,
    pub address: Option<String>,
    pub category: Option<String>,
    pub rating: Option<f64>,
    pub reviews_count: i32,
    pub website: Option<String>,
    pub tags: Vec<String>,
    pub is_favorite: bool,
    pub times_found: i32,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Session that first found this lead. Cleared when that session is deleted.
    pub search_id: Option<Uuid>,
    pub sources: Vec<Sighting>,
}

/// Trim, drop empties, de-duplicate preserving first occurrence.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

// --- Search sessions ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SessionStatus::Active),
            "completed" => Some(SessionStatus::Completed),
            "error" => Some(SessionStatus::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A multi-page search. Persisted; doubles as the search history record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSession {
    pub id: Uuid,
    pub company_id: Uuid,
    pub query: String,
    pub location: String,
    /// Number of provider pages consumed so far. The next page fetched is this one.
    pub current_page: i32,
    pub new_leads_count: i32,
    pub duplicate_leads_count: i32,
    pub total_results_found: i32,
    pub status: SessionStatus,
    pub has_more: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of a search result page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category: Option<String>,
    pub rating: Option<f64>,
    pub reviews_count: i32,
    pub website: Option<String>,
    pub has_whatsapp: bool,
    pub is_duplicate: bool,
    pub times_found: i32,
}

/// Body returned by the search proxy for every page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub session_id: Uuid,
    pub results: Vec<SearchResult>,
    pub new_count: i32,
    pub duplicate_count: i32,
    pub current_page: i32,
    pub has_more: bool,
    pub total_new: i32,
    pub total_duplicates: i32,
    pub status: SessionStatus,
    pub used_real_api: bool,
}

// --- Library queries ---

/// AND-composed library filters. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadFilters {
    /// Case-insensitive substring over name, address and category.
    pub search: Option<String>,
    pub category: Option<String>,
    /// Case-insensitive substring over the address.
    pub city: Option<String>,
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub has_phone: bool,
    #[serde(default)]
    pub has_whatsapp: bool,
    #[serde(default)]
    pub has_email: bool,
    #[serde(default)]
    pub is_favorite: bool,
    /// Any-of tag membership.
    #[serde(default)]
    pub tags: Vec<String>,
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}

fn present(field: Option<&str>) -> bool {
    field.is_some_and(|v| !v.trim().is_empty())
}

impl LeadFilters {
    pub fn matches(&self, lead: &Lead) -> bool {
        if let Some(term) = self.search.as_deref().filter(|t| !t.is_empty()) {
            let hit = contains_ci(Some(&lead.name), term)
                || contains_ci(lead.address.as_deref(), term)
                || contains_ci(lead.category.as_deref(), term);
            if !hit {
                return false;
            }
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            if !contains_ci(lead.category.as_deref(), category) {
                return false;
            }
        }
        if let Some(city) = self.city.as_deref().filter(|c| !c.is_empty()) {
            if !contains_ci(lead.address.as_deref(), city) {
                return false;
            }
        }
        if let Some(min) = self.min_rating {
            if !lead.rating.is_some_and(|r| r >= min) {
                return false;
            }
        }
        if self.has_phone && !present(lead.phone.as_deref()) {
            return false;
        }
        if self.has_whatsapp && !lead.has_whatsapp {
            return false;
        }
        if self.has_email && !present(lead.email.as_deref()) {
            return false;
        }
        if self.is_favorite && !lead.is_favorite {
            return false;
        }
        if !self.tags.is_empty() && !lead.tags.iter().any(|t| self.tags.contains(t)) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    /// Most recently seen first.
    #[default]
    Newest,
    /// First discovered first.
    Oldest,
    MostFound,
    /// Best rated first, unrated last.
    HighestRating,
    /// Favorites first, then newest.
    Favorites,
}

impl SortOption {
    /// Total order used by in-memory views. Ties fall back to id for stable paging.
    pub fn compare(&self, a: &Lead, b: &Lead) -> Ordering {
        let primary = match self {
            SortOption::Newest => b.last_seen_at.cmp(&a.last_seen_at),
            SortOption::Oldest => a.first_seen_at.cmp(&b.first_seen_at),
            SortOption::MostFound => b.times_found.cmp(&a.times_found),
            SortOption::HighestRating => match (a.rating, b.rating) {
                (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortOption::Favorites => b
                .is_favorite
                .cmp(&a.is_favorite)
                .then_with(|| b.last_seen_at.cmp(&a.last_seen_at)),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// One page of the leads library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadPage {
    pub leads: Vec<Lead>,
    pub total_count: i64,
    pub page: u32,
    pub has_more: bool,
}

// --- Tenant settings ---

/// Per-company provider credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySettings {
    pub company_id: Uuid,
    pub serpapi_key: Option<String>,
    pub waha_api_url: Option<String>,
    pub waha_api_key: Option<String>,
    pub waha_session: String,
    pub updated_at: DateTime<Utc>,
}

/// WAHA connection details, available only when url, key and session are all set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WahaSettings {
    pub api_url: String,
    pub api_key: String,
    pub session: String,
}

impl CompanySettings {
    pub fn empty(company_id: Uuid) -> Self {
        Self {
            company_id,
            serpapi_key: None,
            waha_api_url: None,
            waha_api_key: None,
            waha_session: DEFAULT_WAHA_SESSION.to_string(),
            updated_at: Utc::now(),
        }
    }

    pub fn search_key(&self) -> Option<&str> {
        self.serpapi_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn waha(&self) -> Option<WahaSettings> {
        let api_url = self.waha_api_url.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
        let api_key = self.waha_api_key.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
        let session = self.waha_session.trim();
        if session.is_empty() {
            return None;
        }
        Some(WahaSettings {
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            session: session.to_string(),
        })
    }

    /// Public view: secrets replaced by presence flags and a short hint.
    pub fn masked(&self) -> SettingsView {
        SettingsView {
            company_id: self.company_id,
            has_serpapi_key: self.search_key().is_some(),
            serpapi_key_hint: self.search_key().map(mask_secret),
            waha_api_url: self.waha_api_url.clone(),
            has_waha_api_key: present(self.waha_api_key.as_deref()),
            waha_session: self.waha_session.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// Partial update of tenant settings. `Some("")` clears a value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub serpapi_key: Option<String>,
    pub waha_api_url: Option<String>,
    pub waha_api_key: Option<String>,
    pub waha_session: Option<String>,
}

impl SettingsUpdate {
    pub fn apply(self, mut settings: CompanySettings, now: DateTime<Utc>) -> CompanySettings {
        fn merge(slot: &mut Option<String>, value: Option<String>) {
            if let Some(v) = value {
                let v = v.trim().to_string();
                *slot = (!v.is_empty()).then_some(v);
            }
        }
        merge(&mut settings.serpapi_key, self.serpapi_key);
        merge(&mut settings.waha_api_url, self.waha_api_url);
        merge(&mut settings.waha_api_key, self.waha_api_key);
        if let Some(session) = self.waha_session {
            let session = session.trim();
            settings.waha_session = if session.is_empty() {
                DEFAULT_WAHA_SESSION.to_string()
            } else {
                session.to_string()
            };
        }
        settings.updated_at = now;
        settings
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsView {
    pub company_id: Uuid,
    pub has_serpapi_key: bool,
    pub serpapi_key_hint: Option<String>,
    pub waha_api_url: Option<String>,
    pub has_waha_api_key: bool,
    pub waha_session: String,
    pub updated_at: DateTime<Utc>,
}

/// `"••••" + last four characters`; short secrets are fully masked.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "••••".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("••••{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn lead(name: &str) -> Lead {
        let now = Utc::now();
        Lead {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            fingerprint: fingerprint(name, None, None),
            name: name.to_string(),
            phone: None,
            has_whatsapp: false,
            email: None,
            has_email: false,
            address: None,
            category: None,
            rating: None,
            reviews_count: 0,
            website: None,
            tags: Vec::new(),
            is_favorite: false,
            times_found: 1,
            first_seen_at: now,
            last_seen_at: now,
            created_at: now,
            search_id: None,
            sources: Vec::new(),
        }
    }

    #[test]
    fn filters_are_and_composed() {
        let mut good = lead("Pizzaria Bella");
        good.rating = Some(4.5);
        good.has_whatsapp = true;

        let mut no_whatsapp = lead("Forno Nonna");
        no_whatsapp.rating = Some(4.8);

        let mut low_rating = lead("Pizza Rápida");
        low_rating.rating = Some(3.9);
        low_rating.has_whatsapp = true;

        let unrated = {
            let mut l = lead("Sem Nota");
            l.has_whatsapp = true;
            l
        };

        let filters = LeadFilters {
            min_rating: Some(4.0),
            has_whatsapp: true,
            ..Default::default()
        };

        assert!(filters.matches(&good));
        assert!(!filters.matches(&no_whatsapp));
        assert!(!filters.matches(&low_rating));
        assert!(!filters.matches(&unrated));
    }

    #[test]
    fn text_search_spans_name_address_category() {
        let mut l = lead("Bella");
        l.address = Some("Rua Augusta, 1000 - São Paulo".into());
        l.category = Some("Pizzaria".into());

        for term in ["bella", "AUGUSTA", "pizza"] {
            let f = LeadFilters {
                search: Some(term.into()),
                ..Default::default()
            };
            assert!(f.matches(&l), "term {term} should match");
        }

        let f = LeadFilters {
            search: Some("sushi".into()),
            ..Default::default()
        };
        assert!(!f.matches(&l));
    }

    #[test]
    fn tags_match_any_of() {
        let mut l = lead("Bella");
        l.tags = vec!["quente".into(), "retornar".into()];

        let f = LeadFilters {
            tags: vec!["frio".into(), "quente".into()],
            ..Default::default()
        };
        assert!(f.matches(&l));

        let f = LeadFilters {
            tags: vec!["frio".into()],
            ..Default::default()
        };
        assert!(!f.matches(&l));
    }

    #[test]
    fn highest_rating_puts_unrated_last() {
        let mut a = lead("a");
        a.rating = Some(4.1);
        let mut b = lead("b");
        b.rating = Some(4.9);
        let c = lead("c");

        let mut leads = vec![c.clone(), a.clone(), b.clone()];
        leads.sort_by(|x, y| SortOption::HighestRating.compare(x, y));
        let names: Vec<_> = leads.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn newest_oldest_and_favorites_orders() {
        let base = Utc::now();
        let mut old = lead("old");
        old.first_seen_at = base - Duration::days(10);
        old.last_seen_at = base;
        let mut recent = lead("recent");
        recent.first_seen_at = base - Duration::days(1);
        recent.last_seen_at = base - Duration::hours(1);
        recent.is_favorite = true;

        assert_eq!(SortOption::Newest.compare(&old, &recent), Ordering::Less);
        assert_eq!(SortOption::Oldest.compare(&old, &recent), Ordering::Less);
        assert_eq!(SortOption::Favorites.compare(&recent, &old), Ordering::Less);
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let tags = normalize_tags(vec![" quente ".into(), "".into(), "quente".into(), "frio".into()]);
        assert_eq!(tags, vec!["quente".to_string(), "frio".to_string()]);
    }

    #[test]
    fn settings_expose_waha_only_when_complete() {
        let mut s = CompanySettings::empty(Uuid::new_v4());
        assert!(s.waha().is_none());
        assert!(s.search_key().is_none());

        s.waha_api_url = Some("http://waha:3000".into());
        assert!(s.waha().is_none());

        s.waha_api_key = Some("secret".into());
        let waha = s.waha().unwrap();
        assert_eq!(waha.session, DEFAULT_WAHA_SESSION);
    }

    #[test]
    fn settings_update_merges_and_clears() {
        let s = CompanySettings::empty(Uuid::new_v4());
        let s = SettingsUpdate {
            serpapi_key: Some("  abcdef1234567890 ".into()),
            waha_session: Some(" vendas ".into()),
            ..Default::default()
        }
        .apply(s, Utc::now());
        assert_eq!(s.search_key(), Some("abcdef1234567890"));
        assert_eq!(s.waha_session, "vendas");

        let s = SettingsUpdate {
            serpapi_key: Some(String::new()),
            ..Default::default()
        }
        .apply(s, Utc::now());
        assert!(s.serpapi_key.is_none());
        assert_eq!(s.waha_session, "vendas");
    }

    #[test]
    fn masked_view_hides_secrets() {
        let mut s = CompanySettings::empty(Uuid::new_v4());
        s.serpapi_key = Some("abcdef1234567890".into());
        let view = s.masked();
        assert!(view.has_serpapi_key);
        assert_eq!(view.serpapi_key_hint.as_deref(), Some("••••7890"));
        assert_eq!(mask_secret("short"), "••••");
    }
}
