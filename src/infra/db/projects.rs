use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CreateProjectParams, ProjectListScope, ProjectsRepo, ProjectsWriteRepo, RepoError,
    UpdateProjectParams,
};
use crate::domain::entities::ProjectRecord;
use crate::domain::gallery::{gallery_urls_to_value, normalize_gallery_urls};

use super::{PostgresRepositories, map_sqlx_error};

const PROJECT_COLUMNS: &str = "id, title, slug, description, content, featured_image, \
     main_image_url, gallery_image_urls, category_id, published, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    title: String,
    slug: String,
    description: String,
    content: String,
    featured_image: Option<String>,
    main_image_url: Option<String>,
    gallery_image_urls: serde_json::Value,
    category_id: Option<Uuid>,
    published: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ProjectRow> for ProjectRecord {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            description: row.description,
            content: row.content,
            featured_image: row.featured_image,
            main_image_url: row.main_image_url,
            // Historical rows may hold a JSON-encoded string rather than an
            // array; normalize on every read.
            gallery_image_urls: normalize_gallery_urls(&row.gallery_image_urls),
            category_id: row.category_id,
            published: row.published,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ProjectsRepo for PostgresRepositories {
    async fn list_projects(
        &self,
        scope: ProjectListScope,
    ) -> Result<Vec<ProjectRecord>, RepoError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE 1=1 "));

        match scope {
            ProjectListScope::Public => {
                qb.push(" AND published = TRUE");
            }
            ProjectListScope::Admin { published } => {
                if let Some(published) = published {
                    qb.push(" AND published = ");
                    qb.push_bind(published);
                }
            }
        }

        qb.push(" ORDER BY created_at DESC, id DESC");

        let rows = qb
            .build_query_as::<ProjectRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ProjectRecord::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProjectRecord>, RepoError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ProjectRecord::from))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<ProjectRecord>, RepoError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ProjectRecord::from))
    }
}

#[async_trait]
impl ProjectsWriteRepo for PostgresRepositories {
    async fn create_project(
        &self,
        params: CreateProjectParams,
    ) -> Result<ProjectRecord, RepoError> {
        let CreateProjectParams {
            slug,
            title,
            description,
            content,
            featured_image,
            main_image_url,
            gallery_image_urls,
            category_id,
            published,
        } = params;

        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "INSERT INTO projects ( \
                 id, title, slug, description, content, featured_image, \
                 main_image_url, gallery_image_urls, category_id, published, \
                 created_at, updated_at \
             ) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11) \
             RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(id)
        .bind(title)
        .bind(slug)
        .bind(description)
        .bind(content)
        .bind(featured_image)
        .bind(main_image_url)
        .bind(gallery_urls_to_value(&gallery_image_urls))
        .bind(category_id)
        .bind(published)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ProjectRecord::from(row))
    }

    async fn update_project(
        &self,
        params: UpdateProjectParams,
    ) -> Result<ProjectRecord, RepoError> {
        let UpdateProjectParams {
            id,
            slug,
            title,
            description,
            content,
            featured_image,
            main_image_url,
            gallery_image_urls,
            category_id,
            published,
        } = params;

        let now = OffsetDateTime::now_utc();

        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "UPDATE projects \
             SET title = $2, slug = $3, description = $4, content = $5, \
                 featured_image = $6, main_image_url = $7, gallery_image_urls = $8, \
                 category_id = $9, published = $10, updated_at = $11 \
             WHERE id = $1 \
             RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(id)
        .bind(title)
        .bind(slug)
        .bind(description)
        .bind(content)
        .bind(featured_image)
        .bind(main_image_url)
        .bind(gallery_urls_to_value(&gallery_image_urls))
        .bind(category_id)
        .bind(published)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ProjectRecord::from(row))
    }

    async fn update_project_published(
        &self,
        id: Uuid,
        published: bool,
    ) -> Result<ProjectRecord, RepoError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "UPDATE projects \
             SET published = $2, updated_at = now() \
             WHERE id = $1 \
             RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(id)
        .bind(published)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ProjectRecord::from(row))
    }

    async fn delete_project(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}
