//! Page handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::admin::pages::{CreatePageCommand, UpdatePageCommand};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{PageCreateRequest, PageUpdateRequest};
use crate::infra::http::api::state::ApiState;

use super::{ACTOR, page_to_api};

pub async fn list_pages(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let pages = state.pages.list().await.map_err(page_to_api)?;
    Ok(Json(pages))
}

pub async fn page_tree(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let tree = state.pages.tree().await.map_err(page_to_api)?;
    Ok(Json(tree))
}

pub async fn get_page(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.pages.find_by_id(id).await.map_err(page_to_api)?;

    match page {
        Some(page) => Ok(Json(page)),
        None => Err(ApiError::not_found("page not found")),
    }
}

pub async fn create_page(
    State(state): State<ApiState>,
    Json(payload): Json<PageCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreatePageCommand {
        title: payload.title,
        slug: payload.slug,
        content: payload.content,
        published: payload.published,
        sort_order: payload.sort_order,
        parent_id: payload.parent_id,
    };

    let page = state
        .pages
        .create_page(ACTOR, command)
        .await
        .map_err(page_to_api)?;

    Ok((StatusCode::CREATED, Json(page)))
}

pub async fn update_page(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PageUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdatePageCommand {
        id,
        title: payload.title,
        slug: payload.slug,
        content: payload.content,
        published: payload.published,
        sort_order: payload.sort_order,
        parent_id: payload.parent_id,
    };

    let page = state
        .pages
        .update_page(ACTOR, command)
        .await
        .map_err(page_to_api)?;

    Ok(Json(page))
}

pub async fn delete_page(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .pages
        .delete_page(ACTOR, id)
        .await
        .map_err(page_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}
