//! Public content handlers.
//!
//! Every read here flows through the content cache and degrades to fallback
//! data on store failure; these routes never answer 5xx for content reads.

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::warn;

use crate::application::content::NavigationData;
use crate::domain::entities::{CategoryRecord, PageRecord, ProjectRecord};
use crate::infra::uploads::UploadStorageError;

use super::HttpState;

pub async fn direct_categories(State(state): State<HttpState>) -> Json<Vec<CategoryRecord>> {
    Json(state.content.categories().await)
}

pub async fn direct_projects(State(state): State<HttpState>) -> Json<Vec<ProjectRecord>> {
    Json(state.content.published_projects().await)
}

pub async fn direct_pages(State(state): State<HttpState>) -> Json<Vec<PageRecord>> {
    Json(state.content.published_pages().await)
}

pub async fn navigation(State(state): State<HttpState>) -> Json<NavigationData> {
    Json(state.content.navigation().await)
}

pub async fn health(State(state): State<HttpState>) -> Response {
    match state.db.health_check().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response(),
        Err(error) => {
            warn!(
                target = "atelier::http::health",
                error = %error,
                "database health check failed"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded" })),
            )
                .into_response()
        }
    }
}

pub async fn serve_upload(
    State(state): State<HttpState>,
    Path(path): Path<String>,
) -> Response {
    match state.upload_storage.read(&path).await {
        Ok(data) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                data,
            )
                .into_response()
        }
        Err(UploadStorageError::InvalidPath) => StatusCode::BAD_REQUEST.into_response(),
        Err(UploadStorageError::Io(error)) if error.kind() == std::io::ErrorKind::NotFound => {
            StatusCode::NOT_FOUND.into_response()
        }
        Err(error) => {
            warn!(
                target = "atelier::http::uploads",
                error = %error,
                path = path,
                "failed to serve stored upload"
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
