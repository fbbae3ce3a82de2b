//! HTTP transport: public content routes and the admin JSON API.

pub mod api;
pub mod middleware;
pub mod public;

pub use api::ApiState;

use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    middleware as axum_middleware,
    routing::get,
};

use crate::application::content::ContentService;
use crate::infra::db::PostgresRepositories;
use crate::infra::uploads::UploadStorage;

/// State for the public content routes.
#[derive(Clone)]
pub struct HttpState {
    pub content: Arc<ContentService>,
    pub db: Arc<PostgresRepositories>,
    pub upload_storage: Arc<UploadStorage>,
}

/// Combined router state.
#[derive(Clone)]
pub struct RouterState {
    pub http: HttpState,
    pub api: ApiState,
}

impl FromRef<RouterState> for HttpState {
    fn from_ref(state: &RouterState) -> Self {
        state.http.clone()
    }
}

impl FromRef<RouterState> for ApiState {
    fn from_ref(state: &RouterState) -> Self {
        state.api.clone()
    }
}

/// Assemble the full application router.
pub fn build_router(state: RouterState, upload_body_limit: usize) -> Router {
    let public = Router::new()
        .route("/healthz", get(public::health))
        .route("/api/direct-categories", get(public::direct_categories))
        .route("/api/direct-projects", get(public::direct_projects))
        .route("/api/direct-pages", get(public::direct_pages))
        .route("/api/navigation", get(public::navigation))
        .route("/uploads/{*path}", get(public::serve_upload));

    Router::new()
        .merge(public)
        .merge(api::build_api_router(upload_body_limit))
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
        .with_state(state)
}
