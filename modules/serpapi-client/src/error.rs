use thiserror::Error;

pub type Result<T> = std::result::Result<T, SerpApiError>;

#[derive(Debug, Error)]
pub enum SerpApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Body-level phrases SerpAPI uses for a bad or missing key.
const AUTH_PHRASES: &[&str] = &["invalid api key", "missing api key", "api key is required"];

/// Body-level phrases SerpAPI uses when the plan or hourly quota is exhausted.
const THROTTLE_PHRASES: &[&str] = &["run out of searches", "rate limit", "too many requests"];

impl SerpApiError {
    /// Classify an error reported by SerpAPI, either as an HTTP status or as
    /// the `error` field of an otherwise successful JSON body. The status wins;
    /// the message is only consulted for known SerpAPI phrases.
    pub fn classify(status: u16, message: String) -> Self {
        match status {
            401 | 403 => return SerpApiError::Auth(message),
            429 => return SerpApiError::RateLimited(message),
            _ => {}
        }

        let lower = message.to_lowercase();
        if AUTH_PHRASES.iter().any(|p| lower.contains(p)) {
            SerpApiError::Auth(message)
        } else if THROTTLE_PHRASES.iter().any(|p| lower.contains(p)) {
            SerpApiError::RateLimited(message)
        } else {
            SerpApiError::Api { status, message }
        }
    }
}

impl From<reqwest::Error> for SerpApiError {
    fn from(err: reqwest::Error) -> Self {
        SerpApiError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SerpApiError {
    fn from(err: serde_json::Error) -> Self {
        SerpApiError::Parse(err.to_string())
    }
}
