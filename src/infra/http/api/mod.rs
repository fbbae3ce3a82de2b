pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::infra::http::RouterState;

pub fn build_api_router(upload_body_limit: usize) -> Router<RouterState> {
    Router::new()
        .route(
            "/api/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/api/categories/parent-options",
            get(handlers::list_parent_options),
        )
        .route("/api/categories/tree", get(handlers::category_tree))
        .route(
            "/api/categories/{id}",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        )
        .route(
            "/api/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route(
            "/api/projects/{id}",
            get(handlers::get_project)
                .put(handlers::update_project)
                .delete(handlers::delete_project),
        )
        .route(
            "/api/projects/{id}/publish",
            post(handlers::update_project_published),
        )
        .route(
            "/api/projects/{id}/images",
            get(handlers::list_project_images).put(handlers::replace_project_images),
        )
        .route(
            "/api/pages",
            get(handlers::list_pages).post(handlers::create_page),
        )
        .route(
            "/api/pages/{id}",
            get(handlers::get_page)
                .put(handlers::update_page)
                .delete(handlers::delete_page),
        )
        .route(
            "/api/upload",
            post(handlers::upload_file).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route("/api/pages/tree", get(handlers::page_tree))
        .route("/api/audit", get(handlers::list_audit_logs))
}
