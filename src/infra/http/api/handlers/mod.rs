//! Admin API handlers.

mod audit;
mod categories;
mod pages;
mod projects;
mod uploads;

pub use audit::list_audit_logs;
pub use categories::{
    category_tree, create_category, delete_category, get_category, list_categories,
    list_parent_options, update_category,
};
pub use pages::{create_page, delete_page, get_page, list_pages, page_tree, update_page};
pub use projects::{
    create_project, delete_project, get_project, list_project_images, list_projects,
    replace_project_images, update_project, update_project_published,
};
pub use uploads::upload_file;

use crate::application::admin::categories::AdminCategoryError;
use crate::application::admin::pages::AdminPageError;
use crate::application::admin::projects::AdminProjectError;
use crate::application::admin::uploads::AdminUploadError;
use crate::application::repos::RepoError;
use crate::infra::http::api::error::{ApiError, codes};
use axum::http::StatusCode;

/// Actor label recorded in the audit log. Authentication is out of scope;
/// the admin surface is expected to sit behind the deployment's own access
/// control.
pub(crate) const ACTOR: &str = "admin";

pub(crate) fn repo_to_api(error: RepoError) -> ApiError {
    match error {
        RepoError::NotFound => ApiError::not_found("resource not found"),
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "A record with this value already exists.",
            Some(format!("unique constraint `{constraint}`")),
        ),
        RepoError::InvalidInput { message } => ApiError::invalid_input(message),
        RepoError::Integrity { message } => {
            ApiError::new(StatusCode::CONFLICT, codes::INTEGRITY, message, None)
        }
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "The database took too long to answer.",
            None,
        ),
        RepoError::Persistence(message) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Storage backend failed.",
            Some(message),
        ),
    }
}

pub(crate) fn category_to_api(error: AdminCategoryError) -> ApiError {
    match error {
        AdminCategoryError::ConstraintViolation(field) => {
            ApiError::invalid_input(format!("invalid value for `{field}`"))
        }
        AdminCategoryError::NotFound => ApiError::not_found("category not found"),
        AdminCategoryError::ParentNotFound => ApiError::invalid_input("parent category not found"),
        err @ (AdminCategoryError::ParentNotRoot
        | AdminCategoryError::SelfParent
        | AdminCategoryError::NestedChildren) => ApiError::invalid_input(err.to_string()),
        err @ (AdminCategoryError::HasChildren { .. } | AdminCategoryError::InUse { .. }) => {
            ApiError::conflict(err.to_string())
        }
        AdminCategoryError::Repo(repo) => repo_to_api(repo),
    }
}

pub(crate) fn project_to_api(error: AdminProjectError) -> ApiError {
    match error {
        AdminProjectError::ConstraintViolation(field) => {
            ApiError::invalid_input(format!("invalid value for `{field}`"))
        }
        AdminProjectError::NotFound => ApiError::not_found("project not found"),
        AdminProjectError::CategoryNotFound => ApiError::invalid_input("category not found"),
        err @ AdminProjectError::SlugTaken { .. } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            err.to_string(),
            None,
        ),
        AdminProjectError::Repo(repo) => repo_to_api(repo),
    }
}

pub(crate) fn page_to_api(error: AdminPageError) -> ApiError {
    match error {
        AdminPageError::ConstraintViolation(field) => {
            ApiError::invalid_input(format!("invalid value for `{field}`"))
        }
        AdminPageError::NotFound => ApiError::not_found("page not found"),
        AdminPageError::ParentNotFound => ApiError::invalid_input("parent page not found"),
        err @ AdminPageError::SelfParent => ApiError::invalid_input(err.to_string()),
        err @ AdminPageError::SlugTaken { .. } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            err.to_string(),
            None,
        ),
        AdminPageError::Repo(repo) => repo_to_api(repo),
    }
}

pub(crate) fn upload_to_api(error: AdminUploadError) -> ApiError {
    match error {
        AdminUploadError::ConstraintViolation(field) => {
            ApiError::invalid_input(format!("invalid value for `{field}`"))
        }
        AdminUploadError::Storage(storage) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::UPLOAD,
            "Upload could not be stored.",
            Some(storage.to_string()),
        ),
        AdminUploadError::Repo(repo) => repo_to_api(repo),
    }
}
