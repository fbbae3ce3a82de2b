use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::admin::audit::AdminAuditService;
use crate::application::content::CacheTrigger;
use crate::application::repos::{
    CategoriesRepo, CreateProjectParams, NewProjectImage, ProjectImagesRepo, ProjectListScope,
    ProjectsRepo, ProjectsWriteRepo, RepoError, UpdateProjectParams,
};
use crate::domain::entities::{ProjectImageRecord, ProjectRecord};
use crate::domain::gallery::normalize_gallery_urls;
use crate::domain::slug::{SlugAsyncError, SlugError, derive_slug, generate_unique_slug_async};

#[derive(Debug, Error)]
pub enum AdminProjectError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("project not found")]
    NotFound,
    #[error("category not found")]
    CategoryNotFound,
    #[error("A project with slug `{slug}` already exists.")]
    SlugTaken { slug: String },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateProjectCommand {
    pub title: String,
    /// Explicit slug; derived from the title when absent.
    pub slug: Option<String>,
    pub description: String,
    pub content: String,
    pub featured_image: Option<String>,
    pub main_image_url: Option<String>,
    /// Raw gallery value as submitted; normalized before persistence.
    pub gallery_image_urls: serde_json::Value,
    pub category_id: Option<Uuid>,
    pub published: bool,
}

#[derive(Debug, Clone)]
pub struct UpdateProjectCommand {
    pub id: Uuid,
    pub title: String,
    pub slug: Option<String>,
    pub description: String,
    pub content: String,
    pub featured_image: Option<String>,
    pub main_image_url: Option<String>,
    pub gallery_image_urls: serde_json::Value,
    pub category_id: Option<Uuid>,
    pub published: bool,
}

#[derive(Clone)]
pub struct AdminProjectService {
    reader: Arc<dyn ProjectsRepo>,
    writer: Arc<dyn ProjectsWriteRepo>,
    images: Arc<dyn ProjectImagesRepo>,
    categories: Arc<dyn CategoriesRepo>,
    audit: AdminAuditService,
    cache_trigger: Option<CacheTrigger>,
}

impl AdminProjectService {
    pub fn new(
        reader: Arc<dyn ProjectsRepo>,
        writer: Arc<dyn ProjectsWriteRepo>,
        images: Arc<dyn ProjectImagesRepo>,
        categories: Arc<dyn CategoriesRepo>,
        audit: AdminAuditService,
    ) -> Self {
        Self {
            reader,
            writer,
            images,
            categories,
            audit,
            cache_trigger: None,
        }
    }

    pub fn with_cache_trigger_opt(mut self, trigger: Option<CacheTrigger>) -> Self {
        self.cache_trigger = trigger;
        self
    }

    pub async fn list(
        &self,
        published: Option<bool>,
    ) -> Result<Vec<ProjectRecord>, AdminProjectError> {
        self.reader
            .list_projects(ProjectListScope::Admin { published })
            .await
            .map_err(AdminProjectError::from)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ProjectRecord>, AdminProjectError> {
        self.reader
            .find_by_id(id)
            .await
            .map_err(AdminProjectError::from)
    }

    pub async fn create_project(
        &self,
        actor: &str,
        command: CreateProjectCommand,
    ) -> Result<ProjectRecord, AdminProjectError> {
        let title = command.title.trim().to_string();
        ensure_non_empty(&title, "title")?;

        if let Some(category_id) = command.category_id {
            self.ensure_category_exists(category_id).await?;
        }

        let slug = self.resolve_slug(command.slug.as_deref(), &title, None).await?;
        let gallery_image_urls = normalize_gallery_urls(&command.gallery_image_urls);

        let params = CreateProjectParams {
            slug,
            title,
            description: command.description,
            content: command.content,
            featured_image: command.featured_image,
            main_image_url: command.main_image_url,
            gallery_image_urls,
            category_id: command.category_id,
            published: command.published,
        };

        let project = self.writer.create_project(params).await?;
        self.record_audit(actor, "project.create", &project).await?;
        self.notify_changed();
        Ok(project)
    }

    pub async fn update_project(
        &self,
        actor: &str,
        command: UpdateProjectCommand,
    ) -> Result<ProjectRecord, AdminProjectError> {
        let title = command.title.trim().to_string();
        ensure_non_empty(&title, "title")?;

        let existing = self
            .reader
            .find_by_id(command.id)
            .await?
            .ok_or(AdminProjectError::NotFound)?;

        if let Some(category_id) = command.category_id {
            self.ensure_category_exists(category_id).await?;
        }

        let slug = match command.slug.as_deref() {
            Some(requested) => {
                self.resolve_slug(Some(requested), &title, Some(&existing.slug))
                    .await?
            }
            None => existing.slug.clone(),
        };
        let gallery_image_urls = normalize_gallery_urls(&command.gallery_image_urls);

        let params = UpdateProjectParams {
            id: command.id,
            slug,
            title,
            description: command.description,
            content: command.content,
            featured_image: command.featured_image,
            main_image_url: command.main_image_url,
            gallery_image_urls,
            category_id: command.category_id,
            published: command.published,
        };

        let project = self.writer.update_project(params).await?;
        self.record_audit(actor, "project.update", &project).await?;
        self.notify_changed();
        Ok(project)
    }

    pub async fn update_published(
        &self,
        actor: &str,
        id: Uuid,
        published: bool,
    ) -> Result<ProjectRecord, AdminProjectError> {
        self.reader
            .find_by_id(id)
            .await?
            .ok_or(AdminProjectError::NotFound)?;

        let project = self.writer.update_project_published(id, published).await?;
        self.record_audit(actor, "project.publish", &project).await?;
        self.notify_changed();
        Ok(project)
    }

    pub async fn delete_project(&self, actor: &str, id: Uuid) -> Result<(), AdminProjectError> {
        let project = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(AdminProjectError::NotFound)?;

        self.writer.delete_project(id).await?;
        self.audit
            .record(
                actor,
                "project.delete",
                "project",
                Some(&id.to_string()),
                Some(&ProjectSnapshot {
                    slug: project.slug.as_str(),
                    title: project.title.as_str(),
                    published: project.published,
                }),
            )
            .await?;
        self.notify_changed();
        Ok(())
    }

    /// Row-per-image gallery for a project.
    pub async fn list_images(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<ProjectImageRecord>, AdminProjectError> {
        self.reader
            .find_by_id(project_id)
            .await?
            .ok_or(AdminProjectError::NotFound)?;

        self.images
            .list_for_project(project_id)
            .await
            .map_err(AdminProjectError::from)
    }

    /// Replace a project's gallery rows. Positions follow input order.
    pub async fn replace_images(
        &self,
        actor: &str,
        project_id: Uuid,
        images: Vec<NewProjectImage>,
    ) -> Result<Vec<ProjectImageRecord>, AdminProjectError> {
        self.reader
            .find_by_id(project_id)
            .await?
            .ok_or(AdminProjectError::NotFound)?;

        for image in &images {
            if image.url.trim().is_empty() {
                return Err(AdminProjectError::ConstraintViolation("url"));
            }
        }

        let records = self.images.replace_for_project(project_id, images).await?;
        self.audit
            .record(
                actor,
                "project.images.replace",
                "project",
                Some(&project_id.to_string()),
                Some(&ImageCountSnapshot {
                    count: records.len(),
                }),
            )
            .await?;
        self.notify_changed();
        Ok(records)
    }

    async fn ensure_category_exists(&self, category_id: Uuid) -> Result<(), AdminProjectError> {
        self.categories
            .find_by_id(category_id)
            .await?
            .ok_or(AdminProjectError::CategoryNotFound)?;
        Ok(())
    }

    /// Resolve the slug for a write: an explicit slug must be free (or owned
    /// by the project being edited); otherwise derive one from the title.
    async fn resolve_slug(
        &self,
        requested: Option<&str>,
        title: &str,
        current: Option<&str>,
    ) -> Result<String, AdminProjectError> {
        if let Some(requested) = requested {
            let slug = derive_slug(requested)
                .map_err(|_| AdminProjectError::ConstraintViolation("slug"))?;
            if Some(slug.as_str()) != current
                && self.reader.find_by_slug(&slug).await?.is_some()
            {
                return Err(AdminProjectError::SlugTaken { slug });
            }
            return Ok(slug);
        }

        let reader = self.reader.clone();
        match generate_unique_slug_async(title, move |candidate| {
            let reader = reader.clone();
            let candidate = candidate.to_string();
            async move {
                reader
                    .find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.is_none())
            }
        })
        .await
        {
            Ok(slug) => Ok(slug),
            Err(SlugAsyncError::Slug(err)) => match err {
                SlugError::EmptyInput | SlugError::Unrepresentable { .. } => {
                    Err(AdminProjectError::ConstraintViolation("title"))
                }
                SlugError::Exhausted { .. } => {
                    Err(AdminProjectError::ConstraintViolation("slug"))
                }
            },
            Err(SlugAsyncError::Predicate(err)) => Err(AdminProjectError::Repo(err)),
        }
    }

    async fn record_audit(
        &self,
        actor: &str,
        action: &str,
        project: &ProjectRecord,
    ) -> Result<(), RepoError> {
        let snapshot = ProjectSnapshot {
            slug: project.slug.as_str(),
            title: project.title.as_str(),
            published: project.published,
        };
        self.audit
            .record(
                actor,
                action,
                "project",
                Some(&project.id.to_string()),
                Some(&snapshot),
            )
            .await
    }

    fn notify_changed(&self) {
        if let Some(trigger) = &self.cache_trigger {
            trigger.projects_changed();
        }
    }
}

#[derive(Debug, Serialize)]
struct ProjectSnapshot<'a> {
    slug: &'a str,
    title: &'a str,
    published: bool,
}

#[derive(Debug, Serialize)]
struct ImageCountSnapshot {
    count: usize,
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), AdminProjectError> {
    if value.trim().is_empty() {
        return Err(AdminProjectError::ConstraintViolation(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use time::OffsetDateTime;

    use crate::application::repos::AuditRepo;
    use crate::domain::entities::{AuditLogRecord, CategoryRecord};

    #[derive(Default)]
    struct StubProjectsRepo {
        records: Vec<ProjectRecord>,
    }

    #[async_trait]
    impl ProjectsRepo for StubProjectsRepo {
        async fn list_projects(
            &self,
            _scope: ProjectListScope,
        ) -> Result<Vec<ProjectRecord>, RepoError> {
            Ok(self.records.clone())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<ProjectRecord>, RepoError> {
            Ok(self.records.iter().find(|project| project.id == id).cloned())
        }

        async fn find_by_slug(&self, slug: &str) -> Result<Option<ProjectRecord>, RepoError> {
            Ok(self
                .records
                .iter()
                .find(|project| project.slug == slug)
                .cloned())
        }
    }

    #[derive(Default)]
    struct RecordingProjectsWriter {
        created: Mutex<Vec<CreateProjectParams>>,
    }

    #[async_trait]
    impl ProjectsWriteRepo for RecordingProjectsWriter {
        async fn create_project(
            &self,
            params: CreateProjectParams,
        ) -> Result<ProjectRecord, RepoError> {
            let record = sample_project_from(&params);
            self.created.lock().unwrap().push(params);
            Ok(record)
        }

        async fn update_project(
            &self,
            params: UpdateProjectParams,
        ) -> Result<ProjectRecord, RepoError> {
            Ok(ProjectRecord {
                id: params.id,
                title: params.title,
                slug: params.slug,
                description: params.description,
                content: params.content,
                featured_image: params.featured_image,
                main_image_url: params.main_image_url,
                gallery_image_urls: params.gallery_image_urls,
                category_id: params.category_id,
                published: params.published,
                created_at: OffsetDateTime::now_utc(),
                updated_at: OffsetDateTime::now_utc(),
            })
        }

        async fn update_project_published(
            &self,
            _id: Uuid,
            _published: bool,
        ) -> Result<ProjectRecord, RepoError> {
            unreachable!("not used in these tests")
        }

        async fn delete_project(&self, _id: Uuid) -> Result<(), RepoError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct StubImagesRepo;

    #[async_trait]
    impl ProjectImagesRepo for StubImagesRepo {
        async fn list_for_project(
            &self,
            _project_id: Uuid,
        ) -> Result<Vec<ProjectImageRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn replace_for_project(
            &self,
            project_id: Uuid,
            images: Vec<NewProjectImage>,
        ) -> Result<Vec<ProjectImageRecord>, RepoError> {
            Ok(images
                .into_iter()
                .enumerate()
                .map(|(position, image)| ProjectImageRecord {
                    id: Uuid::new_v4(),
                    project_id,
                    url: image.url,
                    alt: image.alt,
                    position: position as i32,
                    created_at: OffsetDateTime::now_utc(),
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct StubCategoriesRepo {
        records: Vec<CategoryRecord>,
    }

    #[async_trait]
    impl CategoriesRepo for StubCategoriesRepo {
        async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
            Ok(self.records.clone())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
            Ok(self
                .records
                .iter()
                .find(|category| category.id == id)
                .cloned())
        }

        async fn find_by_slug(&self, _slug: &str) -> Result<Option<CategoryRecord>, RepoError> {
            Ok(None)
        }

        async fn count_children(&self, _id: Uuid) -> Result<u64, RepoError> {
            Ok(0)
        }

        async fn count_projects(&self, _id: Uuid) -> Result<u64, RepoError> {
            Ok(0)
        }
    }

    #[derive(Default)]
    struct FakeAuditRepo;

    #[async_trait]
    impl AuditRepo for FakeAuditRepo {
        async fn append_log(&self, _record: AuditLogRecord) -> Result<(), RepoError> {
            Ok(())
        }

        async fn list_recent(&self, _limit: u32) -> Result<Vec<AuditLogRecord>, RepoError> {
            Ok(Vec::new())
        }
    }

    fn sample_project_from(params: &CreateProjectParams) -> ProjectRecord {
        ProjectRecord {
            id: Uuid::new_v4(),
            title: params.title.clone(),
            slug: params.slug.clone(),
            description: params.description.clone(),
            content: params.content.clone(),
            featured_image: params.featured_image.clone(),
            main_image_url: params.main_image_url.clone(),
            gallery_image_urls: params.gallery_image_urls.clone(),
            category_id: params.category_id,
            published: params.published,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    fn sample_project(id: u128, slug: &str) -> ProjectRecord {
        ProjectRecord {
            id: Uuid::from_u128(id),
            title: slug.to_string(),
            slug: slug.to_string(),
            description: String::new(),
            content: String::new(),
            featured_image: None,
            main_image_url: None,
            gallery_image_urls: Vec::new(),
            category_id: None,
            published: false,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    fn create_command(title: &str) -> CreateProjectCommand {
        CreateProjectCommand {
            title: title.to_string(),
            slug: None,
            description: String::new(),
            content: String::new(),
            featured_image: None,
            main_image_url: None,
            gallery_image_urls: serde_json::Value::Null,
            category_id: None,
            published: false,
        }
    }

    fn build_service(
        reader: StubProjectsRepo,
        writer: Arc<RecordingProjectsWriter>,
        categories: StubCategoriesRepo,
    ) -> AdminProjectService {
        AdminProjectService::new(
            Arc::new(reader),
            writer,
            Arc::new(StubImagesRepo),
            Arc::new(categories),
            AdminAuditService::new(Arc::new(FakeAuditRepo)),
        )
    }

    #[tokio::test]
    async fn create_normalizes_encoded_gallery() {
        let writer = Arc::new(RecordingProjectsWriter::default());
        let service = build_service(
            StubProjectsRepo::default(),
            writer.clone(),
            StubCategoriesRepo::default(),
        );

        let mut command = create_command("Harbor Baths");
        command.gallery_image_urls =
            serde_json::Value::String(json!(["/u/a.jpg", "/u/b.jpg"]).to_string());

        let project = service
            .create_project("tester", command)
            .await
            .expect("create succeeds");

        assert_eq!(project.gallery_image_urls, vec!["/u/a.jpg", "/u/b.jpg"]);
    }

    #[tokio::test]
    async fn create_derives_slug_from_title_with_suffix() {
        let reader = StubProjectsRepo {
            records: vec![sample_project(1, "harbor-baths")],
        };
        let writer = Arc::new(RecordingProjectsWriter::default());
        let service = build_service(reader, writer.clone(), StubCategoriesRepo::default());

        let project = service
            .create_project("tester", create_command("Harbor Baths"))
            .await
            .expect("create succeeds");

        assert_eq!(project.slug, "harbor-baths-2");
    }

    #[tokio::test]
    async fn create_rejects_taken_explicit_slug() {
        let reader = StubProjectsRepo {
            records: vec![sample_project(1, "harbor-baths")],
        };
        let writer = Arc::new(RecordingProjectsWriter::default());
        let service = build_service(reader, writer.clone(), StubCategoriesRepo::default());

        let mut command = create_command("Another Project");
        command.slug = Some("harbor-baths".to_string());

        let result = service.create_project("tester", command).await;
        assert!(matches!(result, Err(AdminProjectError::SlugTaken { .. })));
        assert!(writer.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_unknown_category() {
        let writer = Arc::new(RecordingProjectsWriter::default());
        let service = build_service(
            StubProjectsRepo::default(),
            writer.clone(),
            StubCategoriesRepo::default(),
        );

        let mut command = create_command("Harbor Baths");
        command.category_id = Some(Uuid::from_u128(42));

        let result = service.create_project("tester", command).await;
        assert!(matches!(result, Err(AdminProjectError::CategoryNotFound)));
    }

    #[tokio::test]
    async fn update_keeps_own_slug_when_unchanged() {
        let existing = sample_project(1, "harbor-baths");
        let reader = StubProjectsRepo {
            records: vec![existing.clone()],
        };
        let writer = Arc::new(RecordingProjectsWriter::default());
        let service = build_service(reader, writer.clone(), StubCategoriesRepo::default());

        let updated = service
            .update_project(
                "tester",
                UpdateProjectCommand {
                    id: existing.id,
                    title: "Harbor Baths".to_string(),
                    slug: Some("harbor-baths".to_string()),
                    description: String::new(),
                    content: String::new(),
                    featured_image: None,
                    main_image_url: None,
                    gallery_image_urls: serde_json::Value::Null,
                    category_id: None,
                    published: true,
                },
            )
            .await
            .expect("update succeeds");

        assert_eq!(updated.slug, "harbor-baths");
        assert!(updated.published);
    }

    #[tokio::test]
    async fn replace_images_assigns_positions_in_order() {
        let existing = sample_project(1, "harbor-baths");
        let reader = StubProjectsRepo {
            records: vec![existing.clone()],
        };
        let writer = Arc::new(RecordingProjectsWriter::default());
        let service = build_service(reader, writer.clone(), StubCategoriesRepo::default());

        let records = service
            .replace_images(
                "tester",
                existing.id,
                vec![
                    NewProjectImage {
                        url: "/u/a.jpg".to_string(),
                        alt: "entry".to_string(),
                    },
                    NewProjectImage {
                        url: "/u/b.jpg".to_string(),
                        alt: "court".to_string(),
                    },
                ],
            )
            .await
            .expect("replace succeeds");

        let positions: Vec<_> = records.iter().map(|record| record.position).collect();
        assert_eq!(positions, vec![0, 1]);
    }
}
