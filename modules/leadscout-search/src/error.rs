use leadscout_common::LeadScoutError;
use leadscout_store::StoreError;
use serpapi_client::SerpApiError;
use waha_client::WahaError;

pub type Result<T> = std::result::Result<T, SearchError>;

/// Failures of the search proxy. Each variant maps to one HTTP status and
/// machine code at the API boundary.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0} is not configured")]
    ProviderNotConfigured(String),

    #[error("Provider rejected credentials: {0}")]
    ProviderAuth(String),

    #[error("Provider rate limit reached: {0}")]
    RateLimited(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl SearchError {
    /// Machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            SearchError::InvalidInput(_) => "invalid_input",
            SearchError::NotFound(_) => "not_found",
            SearchError::Conflict(_) => "conflict",
            SearchError::ProviderNotConfigured(_) => "provider_not_configured",
            SearchError::ProviderAuth(_) => "provider_auth",
            SearchError::RateLimited(_) => "rate_limited",
            SearchError::ProviderUnavailable(_) => "provider_unavailable",
            SearchError::Storage(_) => "storage",
        }
    }

    /// Failures after which retrying the same session cannot succeed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SearchError::ProviderAuth(_))
    }
}

impl From<StoreError> for SearchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => SearchError::NotFound(what),
            StoreError::Conflict(msg) => SearchError::Conflict(msg),
            other => SearchError::Storage(other.to_string()),
        }
    }
}

impl From<LeadScoutError> for SearchError {
    fn from(err: LeadScoutError) -> Self {
        match err {
            LeadScoutError::Validation(msg) => SearchError::InvalidInput(msg),
            LeadScoutError::Config(msg) => SearchError::ProviderUnavailable(msg),
        }
    }
}

impl From<SerpApiError> for SearchError {
    fn from(err: SerpApiError) -> Self {
        match err {
            SerpApiError::Auth(msg) => SearchError::ProviderAuth(msg),
            SerpApiError::RateLimited(msg) => SearchError::RateLimited(msg),
            other => SearchError::ProviderUnavailable(other.to_string()),
        }
    }
}

impl From<WahaError> for SearchError {
    fn from(err: WahaError) -> Self {
        match err {
            WahaError::SessionNotFound(session) => {
                SearchError::NotFound(format!("WhatsApp session {session}"))
            }
            WahaError::Api { status, message } if status == 401 || status == 403 => {
                SearchError::ProviderAuth(message)
            }
            other => SearchError::ProviderUnavailable(other.to_string()),
        }
    }
}
