use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use uuid::Uuid;

use super::{bad_request, error_response, store_error_response};
use crate::AppState;

#[derive(Deserialize)]
pub struct StartSearchRequest {
    #[serde(default)]
    query: String,
    #[serde(default)]
    location: String,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

const DEFAULT_HISTORY_LIMIT: i64 = 20;
const MAX_HISTORY_LIMIT: i64 = 100;

pub async fn api_start_search(
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<Uuid>,
    body: Result<Json<StartSearchRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match state
        .proxy
        .start_search(company_id, &body.query, &body.location)
        .await
    {
        Ok(page) => Json(page).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn api_fetch_more(
    State(state): State<Arc<AppState>>,
    Path((company_id, session_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    match state.proxy.fetch_more(company_id, session_id).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn api_list_searches(
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<Uuid>,
    params: Result<Query<HistoryQuery>, QueryRejection>,
) -> impl IntoResponse {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    match state.store.list_sessions(company_id, limit, offset).await {
        Ok(sessions) => Json(sessions).into_response(),
        Err(e) => store_error_response(e),
    }
}

pub async fn api_get_search(
    State(state): State<Arc<AppState>>,
    Path((company_id, session_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    match state.store.get_session(company_id, session_id).await {
        Ok(session) => Json(session).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// Removes the history entry. Leads found by it stay in the library.
pub async fn api_delete_search(
    State(state): State<Arc<AppState>>,
    Path((company_id, session_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    match state.store.delete_session(company_id, session_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => store_error_response(e),
    }
}
