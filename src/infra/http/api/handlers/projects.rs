//! Project handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::admin::projects::{CreateProjectCommand, UpdateProjectCommand};
use crate::application::repos::NewProjectImage;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{
    ProjectCreateRequest, ProjectImagesRequest, ProjectListQuery, ProjectPublishRequest,
    ProjectUpdateRequest,
};
use crate::infra::http::api::state::ApiState;

use super::{ACTOR, project_to_api};

pub async fn list_projects(
    State(state): State<ApiState>,
    Query(query): Query<ProjectListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let projects = state
        .projects
        .list(query.published)
        .await
        .map_err(project_to_api)?;
    Ok(Json(projects))
}

pub async fn get_project(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let project = state
        .projects
        .find_by_id(id)
        .await
        .map_err(project_to_api)?;

    match project {
        Some(project) => Ok(Json(project)),
        None => Err(ApiError::not_found("project not found")),
    }
}

pub async fn create_project(
    State(state): State<ApiState>,
    Json(payload): Json<ProjectCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreateProjectCommand {
        title: payload.title,
        slug: payload.slug,
        description: payload.description,
        content: payload.content,
        featured_image: payload.featured_image,
        main_image_url: payload.main_image_url,
        gallery_image_urls: payload.gallery_image_urls,
        category_id: payload.category_id,
        published: payload.published,
    };

    let project = state
        .projects
        .create_project(ACTOR, command)
        .await
        .map_err(project_to_api)?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn update_project(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProjectUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdateProjectCommand {
        id,
        title: payload.title,
        slug: payload.slug,
        description: payload.description,
        content: payload.content,
        featured_image: payload.featured_image,
        main_image_url: payload.main_image_url,
        gallery_image_urls: payload.gallery_image_urls,
        category_id: payload.category_id,
        published: payload.published,
    };

    let project = state
        .projects
        .update_project(ACTOR, command)
        .await
        .map_err(project_to_api)?;

    Ok(Json(project))
}

pub async fn update_project_published(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProjectPublishRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let project = state
        .projects
        .update_published(ACTOR, id, payload.published)
        .await
        .map_err(project_to_api)?;

    Ok(Json(project))
}

pub async fn delete_project(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .projects
        .delete_project(ACTOR, id)
        .await
        .map_err(project_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_project_images(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let images = state
        .projects
        .list_images(id)
        .await
        .map_err(project_to_api)?;
    Ok(Json(images))
}

pub async fn replace_project_images(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProjectImagesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let images = payload
        .images
        .into_iter()
        .map(|image| NewProjectImage {
            url: image.url,
            alt: image.alt,
        })
        .collect();

    let records = state
        .projects
        .replace_images(ACTOR, id, images)
        .await
        .map_err(project_to_api)?;

    Ok(Json(records))
}
