pub mod leads;
pub mod searches;
pub mod settings;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::error;

use leadscout_search::SearchError;
use leadscout_store::StoreError;

pub fn status_for(err: &SearchError) -> StatusCode {
    match err {
        SearchError::InvalidInput(_) | SearchError::ProviderNotConfigured(_) => {
            StatusCode::BAD_REQUEST
        }
        SearchError::NotFound(_) => StatusCode::NOT_FOUND,
        SearchError::Conflict(_) => StatusCode::CONFLICT,
        SearchError::ProviderAuth(_) => StatusCode::BAD_GATEWAY,
        SearchError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        SearchError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        SearchError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `{"error": ..., "code": ...}` with the matching status.
pub fn error_response(err: SearchError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        error!(code = err.code(), error = %err, "Request failed");
    }
    (
        status,
        Json(serde_json::json!({"error": err.to_string(), "code": err.code()})),
    )
        .into_response()
}

pub fn store_error_response(err: StoreError) -> Response {
    error_response(err.into())
}

pub fn bad_request(message: impl Into<String>) -> Response {
    error_response(SearchError::InvalidInput(message.into()))
}
