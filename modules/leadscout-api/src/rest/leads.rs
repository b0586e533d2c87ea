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

use leadscout_common::{LeadFilters, SortOption};

use super::{bad_request, store_error_response};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LeadsQuery {
    search: Option<String>,
    category: Option<String>,
    city: Option<String>,
    min_rating: Option<f64>,
    has_phone: Option<bool>,
    has_whatsapp: Option<bool>,
    has_email: Option<bool>,
    is_favorite: Option<bool>,
    /// Comma-separated, any-of.
    tags: Option<String>,
    sort: Option<SortOption>,
    page: Option<u32>,
}

impl LeadsQuery {
    fn filters(&self) -> LeadFilters {
        let text = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        LeadFilters {
            search: text(&self.search),
            category: text(&self.category),
            city: text(&self.city),
            min_rating: self.min_rating,
            has_phone: self.has_phone.unwrap_or(false),
            has_whatsapp: self.has_whatsapp.unwrap_or(false),
            has_email: self.has_email.unwrap_or(false),
            is_favorite: self.is_favorite.unwrap_or(false),
            tags: self
                .tags
                .as_deref()
                .map(|t| {
                    t.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
pub struct FavoriteRequest {
    is_favorite: bool,
}

#[derive(Deserialize)]
pub struct TagsRequest {
    tags: Vec<String>,
}

pub async fn api_leads(
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<Uuid>,
    params: Result<Query<LeadsQuery>, QueryRejection>,
) -> impl IntoResponse {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    let filters = params.filters();
    let sort = params.sort.unwrap_or_default();
    let page = params.page.unwrap_or(0);

    match state.store.query_leads(company_id, &filters, sort, page).await {
        Ok(leads) => Json(leads).into_response(),
        Err(e) => store_error_response(e),
    }
}

pub async fn api_set_favorite(
    State(state): State<Arc<AppState>>,
    Path((company_id, lead_id)): Path<(Uuid, Uuid)>,
    body: Result<Json<FavoriteRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match state
        .store
        .set_favorite(company_id, lead_id, body.is_favorite)
        .await
    {
        Ok(lead) => Json(lead).into_response(),
        Err(e) => store_error_response(e),
    }
}

pub async fn api_set_tags(
    State(state): State<Arc<AppState>>,
    Path((company_id, lead_id)): Path<(Uuid, Uuid)>,
    body: Result<Json<TagsRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match state.store.set_tags(company_id, lead_id, body.tags).await {
        Ok(lead) => Json(lead).into_response(),
        Err(e) => store_error_response(e),
    }
}

pub async fn api_delete_lead(
    State(state): State<Arc<AppState>>,
    Path((company_id, lead_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    match state.store.delete_lead(company_id, lead_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => store_error_response(e),
    }
}

pub async fn api_clear_leads(
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.store.clear_leads(company_id).await {
        Ok(deleted) => Json(serde_json::json!({ "deleted": deleted })).into_response(),
        Err(e) => store_error_response(e),
    }
}

pub async fn api_lead_tags(
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.store.lead_tags(company_id).await {
        Ok(tags) => Json(tags).into_response(),
        Err(e) => store_error_response(e),
    }
}

pub async fn api_lead_categories(
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.store.lead_categories(company_id).await {
        Ok(categories) => Json(categories).into_response(),
        Err(e) => store_error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_separated_tags_are_split_and_trimmed() {
        let query = LeadsQuery {
            tags: Some(" quente, ,retornar ".into()),
            search: Some("   ".into()),
            has_whatsapp: Some(true),
            ..Default::default()
        };
        let filters = query.filters();
        assert_eq!(filters.tags, vec!["quente".to_string(), "retornar".to_string()]);
        assert_eq!(filters.search, None);
        assert!(filters.has_whatsapp);
        assert!(!filters.has_phone);
    }
}
