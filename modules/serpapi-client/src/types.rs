use serde::{Deserialize, Serialize};

/// Query parameters for the `google_maps` engine.
#[derive(Debug, Clone, Serialize)]
pub struct MapsSearchRequest {
    pub q: String,
    /// Interface language, e.g. `pt-br`.
    pub hl: String,
    /// Country, e.g. `br`.
    pub gl: String,
    /// Result offset. Google Maps pages advance 20 at a time.
    pub start: u32,
}

impl MapsSearchRequest {
    pub fn new(q: impl Into<String>, start: u32) -> Self {
        Self {
            q: q.into(),
            hl: "pt-br".to_string(),
            gl: "br".to_string(),
            start,
        }
    }

    pub fn with_locale(mut self, hl: &str, gl: &str) -> Self {
        self.hl = hl.to_string();
        self.gl = gl.to_string();
        self
    }
}

/// Raw body of a `google_maps` search. Only the fields we consume.
#[derive(Debug, Clone, Deserialize)]
pub struct MapsSearchResponse {
    #[serde(default)]
    pub local_results: Vec<LocalResult>,
    pub serpapi_pagination: Option<Pagination>,
    /// Present when SerpAPI reports a failure inside a 200 body.
    pub error: Option<String>,
}

impl MapsSearchResponse {
    /// True when SerpAPI advertises a further page.
    pub fn has_next_page(&self) -> bool {
        self.serpapi_pagination
            .as_ref()
            .and_then(|p| p.next.as_deref())
            .is_some_and(|next| !next.is_empty())
    }
}

/// A single place from `local_results`.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalResult {
    pub position: Option<u32>,
    pub place_id: Option<String>,
    pub title: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub rating: Option<f64>,
    pub reviews: Option<i64>,
    #[serde(rename = "type")]
    pub place_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    pub current: Option<u32>,
    pub next: Option<String>,
}
