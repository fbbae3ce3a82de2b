//! Postgres-backed repository implementations.

mod audit;
mod categories;
mod pages;
mod project_images;
mod projects;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{
    Postgres, Transaction,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::content::ContentSource;
use crate::application::repos::{PagesRepo, ProjectListScope, ProjectsRepo, RepoError};
use crate::domain::entities::{CategoryRecord, PageRecord, ProjectRecord};

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }
}

#[async_trait]
impl ContentSource for PostgresRepositories {
    async fn load_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        use crate::application::repos::CategoriesRepo;
        self.list_categories().await
    }

    async fn load_published_projects(&self) -> Result<Vec<ProjectRecord>, RepoError> {
        self.list_projects(ProjectListScope::Public).await
    }

    async fn load_published_pages(&self) -> Result<Vec<PageRecord>, RepoError> {
        self.list_pages(true).await
    }
}
