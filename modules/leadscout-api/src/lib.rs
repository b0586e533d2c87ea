//! HTTP surface of the search proxy and the leads library.

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::{get, post, put},
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

use leadscout_search::SearchProxy;
use leadscout_store::LeadStore;

pub mod rest;

pub struct AppState {
    pub store: Arc<dyn LeadStore>,
    pub proxy: SearchProxy,
}

impl AppState {
    pub fn new(store: Arc<dyn LeadStore>, proxy: SearchProxy) -> Self {
        Self { store, proxy }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Search proxy
        .route(
            "/api/companies/{company_id}/searches",
            post(rest::searches::api_start_search).get(rest::searches::api_list_searches),
        )
        .route(
            "/api/companies/{company_id}/searches/{session_id}",
            get(rest::searches::api_get_search).delete(rest::searches::api_delete_search),
        )
        .route(
            "/api/companies/{company_id}/searches/{session_id}/more",
            post(rest::searches::api_fetch_more),
        )
        // Leads library
        .route(
            "/api/companies/{company_id}/leads",
            get(rest::leads::api_leads).delete(rest::leads::api_clear_leads),
        )
        .route(
            "/api/companies/{company_id}/leads/tags",
            get(rest::leads::api_lead_tags),
        )
        .route(
            "/api/companies/{company_id}/leads/categories",
            get(rest::leads::api_lead_categories),
        )
        .route(
            "/api/companies/{company_id}/leads/{lead_id}",
            axum::routing::delete(rest::leads::api_delete_lead),
        )
        .route(
            "/api/companies/{company_id}/leads/{lead_id}/favorite",
            put(rest::leads::api_set_favorite),
        )
        .route(
            "/api/companies/{company_id}/leads/{lead_id}/tags",
            put(rest::leads::api_set_tags),
        )
        // Tenant settings
        .route(
            "/api/companies/{company_id}/settings",
            get(rest::settings::api_get_settings).put(rest::settings::api_put_settings),
        )
        .route(
            "/api/companies/{company_id}/whatsapp/status",
            get(rest::settings::api_whatsapp_status),
        )
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Lead data is tenant-private: never cache
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Logging layer: method + path only (query strings carry search terms)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
