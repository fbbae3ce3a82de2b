use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{NewProjectImage, ProjectImagesRepo, RepoError};
use crate::domain::entities::ProjectImageRecord;

use super::{PostgresRepositories, map_sqlx_error};

const IMAGE_COLUMNS: &str = "id, project_id, url, alt, position, created_at";

#[derive(sqlx::FromRow)]
struct ProjectImageRow {
    id: Uuid,
    project_id: Uuid,
    url: String,
    alt: String,
    position: i32,
    created_at: OffsetDateTime,
}

impl From<ProjectImageRow> for ProjectImageRecord {
    fn from(row: ProjectImageRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            url: row.url,
            alt: row.alt,
            position: row.position,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ProjectImagesRepo for PostgresRepositories {
    async fn list_for_project(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<ProjectImageRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ProjectImageRow>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM project_images \
             WHERE project_id = $1 \
             ORDER BY position, id"
        ))
        .bind(project_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ProjectImageRecord::from).collect())
    }

    async fn replace_for_project(
        &self,
        project_id: Uuid,
        images: Vec<NewProjectImage>,
    ) -> Result<Vec<ProjectImageRecord>, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM project_images WHERE project_id = $1")
            .bind(project_id)
            .execute(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;

        let now = OffsetDateTime::now_utc();
        let mut records = Vec::with_capacity(images.len());
        for (position, image) in images.into_iter().enumerate() {
            let row = sqlx::query_as::<_, ProjectImageRow>(&format!(
                "INSERT INTO project_images (id, project_id, url, alt, position, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 RETURNING {IMAGE_COLUMNS}"
            ))
            .bind(Uuid::new_v4())
            .bind(project_id)
            .bind(image.url)
            .bind(image.alt)
            .bind(position as i32)
            .bind(now)
            .fetch_one(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;

            records.push(ProjectImageRecord::from(row));
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(records)
    }
}
