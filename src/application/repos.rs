//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{
    AuditLogRecord, CategoryRecord, PageRecord, ProjectImageRecord, ProjectRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which projects a listing should expose.
#[derive(Debug, Clone, Copy)]
pub enum ProjectListScope {
    /// Published projects only, newest first.
    Public,
    /// Every project, optionally filtered by published state.
    Admin { published: Option<bool> },
}

#[derive(Debug, Clone)]
pub struct CreateCategoryParams {
    pub slug: String,
    pub name: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct UpdateCategoryParams {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub parent_id: Option<Uuid>,
}

/// Result of the transactional category delete.
///
/// The reference checks and the delete run under one transaction so another
/// admin session cannot slip a child or project in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryDeleteOutcome {
    Deleted,
    NotFound,
    BlockedByChildren { count: u64 },
    BlockedByProjects { count: u64 },
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    /// All categories ordered by name.
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError>;

    async fn count_children(&self, id: Uuid) -> Result<u64, RepoError>;

    async fn count_projects(&self, id: Uuid) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait CategoriesWriteRepo: Send + Sync {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError>;

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<CategoryRecord, RepoError>;

    /// Delete `id` unless children or projects still reference it; the check
    /// and the delete share a transaction.
    async fn delete_category(&self, id: Uuid) -> Result<CategoryDeleteOutcome, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateProjectParams {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub featured_image: Option<String>,
    pub main_image_url: Option<String>,
    pub gallery_image_urls: Vec<String>,
    pub category_id: Option<Uuid>,
    pub published: bool,
}

#[derive(Debug, Clone)]
pub struct UpdateProjectParams {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub featured_image: Option<String>,
    pub main_image_url: Option<String>,
    pub gallery_image_urls: Vec<String>,
    pub category_id: Option<Uuid>,
    pub published: bool,
}

#[async_trait]
pub trait ProjectsRepo: Send + Sync {
    async fn list_projects(&self, scope: ProjectListScope)
    -> Result<Vec<ProjectRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProjectRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<ProjectRecord>, RepoError>;
}

#[async_trait]
pub trait ProjectsWriteRepo: Send + Sync {
    async fn create_project(&self, params: CreateProjectParams)
    -> Result<ProjectRecord, RepoError>;

    async fn update_project(&self, params: UpdateProjectParams)
    -> Result<ProjectRecord, RepoError>;

    async fn update_project_published(
        &self,
        id: Uuid,
        published: bool,
    ) -> Result<ProjectRecord, RepoError>;

    async fn delete_project(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct NewProjectImage {
    pub url: String,
    pub alt: String,
}

#[async_trait]
pub trait ProjectImagesRepo: Send + Sync {
    /// Gallery rows for a project ordered by position.
    async fn list_for_project(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<ProjectImageRecord>, RepoError>;

    /// Replace a project's gallery rows; positions follow input order.
    async fn replace_for_project(
        &self,
        project_id: Uuid,
        images: Vec<NewProjectImage>,
    ) -> Result<Vec<ProjectImageRecord>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreatePageParams {
    pub slug: String,
    pub title: String,
    pub content: String,
    pub published: bool,
    pub sort_order: i32,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct UpdatePageParams {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub published: bool,
    pub sort_order: i32,
    pub parent_id: Option<Uuid>,
}

#[async_trait]
pub trait PagesRepo: Send + Sync {
    /// Pages ordered by sort order, optionally restricted to published ones.
    async fn list_pages(&self, published_only: bool) -> Result<Vec<PageRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PageRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PageRecord>, RepoError>;
}

#[async_trait]
pub trait PagesWriteRepo: Send + Sync {
    async fn create_page(&self, params: CreatePageParams) -> Result<PageRecord, RepoError>;

    async fn update_page(&self, params: UpdatePageParams) -> Result<PageRecord, RepoError>;

    async fn delete_page(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait AuditRepo: Send + Sync {
    async fn append_log(&self, record: AuditLogRecord) -> Result<(), RepoError>;

    async fn list_recent(&self, limit: u32) -> Result<Vec<AuditLogRecord>, RepoError>;
}
