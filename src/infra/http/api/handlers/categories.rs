//! Category handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::admin::categories::{CreateCategoryCommand, UpdateCategoryCommand};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{
    CategoryCreateRequest, CategoryUpdateRequest, ParentOptionsQuery,
};
use crate::infra::http::api::state::ApiState;

use super::{ACTOR, category_to_api};

pub async fn list_categories(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let categories = state.categories.list().await.map_err(category_to_api)?;
    Ok(Json(categories))
}

pub async fn category_tree(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let tree = state.categories.tree().await.map_err(category_to_api)?;
    Ok(Json(tree))
}

pub async fn list_parent_options(
    State(state): State<ApiState>,
    Query(query): Query<ParentOptionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let options = state
        .categories
        .list_parent_options(query.exclude)
        .await
        .map_err(category_to_api)?;
    Ok(Json(options))
}

pub async fn get_category(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .categories
        .find_by_id(id)
        .await
        .map_err(category_to_api)?;

    match category {
        Some(category) => Ok(Json(category)),
        None => Err(ApiError::not_found("category not found")),
    }
}

pub async fn create_category(
    State(state): State<ApiState>,
    Json(payload): Json<CategoryCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreateCategoryCommand {
        name: payload.name,
        parent_id: payload.parent_id,
    };

    let category = state
        .categories
        .create_category(ACTOR, command)
        .await
        .map_err(category_to_api)?;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdateCategoryCommand {
        id,
        name: payload.name,
        parent_id: payload.parent_id,
    };

    let category = state
        .categories
        .update_category(ACTOR, command)
        .await
        .map_err(category_to_api)?;

    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .categories
        .delete_category(ACTOR, id)
        .await
        .map_err(category_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}
