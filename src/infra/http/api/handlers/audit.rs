//! Audit log handler.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;

use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::AuditListQuery;
use crate::infra::http::api::state::ApiState;

use super::repo_to_api;

pub async fn list_audit_logs(
    State(state): State<ApiState>,
    Query(query): Query<AuditListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let records = state
        .audit
        .list_recent(query.limit)
        .await
        .map_err(repo_to_api)?;
    Ok(Json(records))
}
