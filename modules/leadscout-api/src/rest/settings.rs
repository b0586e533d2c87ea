use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use leadscout_common::{CompanySettings, SettingsUpdate};

use super::{bad_request, error_response, store_error_response};
use crate::AppState;

/// Blank clears the value; anything else must be an http(s) URL.
fn validate_waha_url(raw: &str) -> Result<(), Response> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(());
    }
    let parsed = url::Url::parse(raw).map_err(|_| bad_request("Invalid WAHA URL"))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(bad_request("WAHA URL must use http or https scheme"));
    }
    Ok(())
}

pub async fn api_get_settings(
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.store.get_settings(company_id).await {
        Ok(settings) => {
            let settings = settings.unwrap_or_else(|| CompanySettings::empty(company_id));
            Json(settings.masked()).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

pub async fn api_put_settings(
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<Uuid>,
    body: Result<Json<SettingsUpdate>, JsonRejection>,
) -> impl IntoResponse {
    let Json(update) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    if let Some(url) = update.waha_api_url.as_deref() {
        if let Err(response) = validate_waha_url(url) {
            return response;
        }
    }

    let current = match state.store.get_settings(company_id).await {
        Ok(settings) => settings.unwrap_or_else(|| CompanySettings::empty(company_id)),
        Err(e) => return store_error_response(e),
    };
    let updated = update.apply(current, Utc::now());

    match state.store.upsert_settings(&updated).await {
        Ok(saved) => {
            state.proxy.settings_cache().invalidate(company_id).await;
            info!(%company_id, "Company settings updated");
            Json(saved.masked()).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

pub async fn api_whatsapp_status(
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.proxy.whatsapp_status(company_id).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => error_response(e),
    }
}
