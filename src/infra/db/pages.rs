use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CreatePageParams, PagesRepo, PagesWriteRepo, RepoError, UpdatePageParams,
};
use crate::domain::entities::PageRecord;

use super::{PostgresRepositories, map_sqlx_error};

const PAGE_COLUMNS: &str =
    "id, title, slug, content, published, sort_order, parent_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PageRow {
    id: Uuid,
    title: String,
    slug: String,
    content: String,
    published: bool,
    sort_order: i32,
    parent_id: Option<Uuid>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<PageRow> for PageRecord {
    fn from(row: PageRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            content: row.content,
            published: row.published,
            sort_order: row.sort_order,
            parent_id: row.parent_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl PagesRepo for PostgresRepositories {
    async fn list_pages(&self, published_only: bool) -> Result<Vec<PageRecord>, RepoError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {PAGE_COLUMNS} FROM pages WHERE 1=1 "));

        if published_only {
            qb.push(" AND published = TRUE");
        }

        qb.push(" ORDER BY sort_order, title, id");

        let rows = qb
            .build_query_as::<PageRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PageRecord::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PageRecord>, RepoError> {
        let row = sqlx::query_as::<_, PageRow>(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PageRecord::from))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PageRecord>, RepoError> {
        let row = sqlx::query_as::<_, PageRow>(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PageRecord::from))
    }
}

#[async_trait]
impl PagesWriteRepo for PostgresRepositories {
    async fn create_page(&self, params: CreatePageParams) -> Result<PageRecord, RepoError> {
        let CreatePageParams {
            slug,
            title,
            content,
            published,
            sort_order,
            parent_id,
        } = params;

        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let row = sqlx::query_as::<_, PageRow>(&format!(
            "INSERT INTO pages ( \
                 id, title, slug, content, published, sort_order, parent_id, \
                 created_at, updated_at \
             ) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
             RETURNING {PAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(title)
        .bind(slug)
        .bind(content)
        .bind(published)
        .bind(sort_order)
        .bind(parent_id)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(PageRecord::from(row))
    }

    async fn update_page(&self, params: UpdatePageParams) -> Result<PageRecord, RepoError> {
        let UpdatePageParams {
            id,
            slug,
            title,
            content,
            published,
            sort_order,
            parent_id,
        } = params;

        let now = OffsetDateTime::now_utc();

        let row = sqlx::query_as::<_, PageRow>(&format!(
            "UPDATE pages \
             SET title = $2, slug = $3, content = $4, published = $5, \
                 sort_order = $6, parent_id = $7, updated_at = $8 \
             WHERE id = $1 \
             RETURNING {PAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(title)
        .bind(slug)
        .bind(content)
        .bind(published)
        .bind(sort_order)
        .bind(parent_id)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(PageRecord::from(row))
    }

    async fn delete_page(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM pages WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}
