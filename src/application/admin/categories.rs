use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::admin::audit::AdminAuditService;
use crate::application::content::CacheTrigger;
use crate::application::repos::{
    CategoriesRepo, CategoriesWriteRepo, CategoryDeleteOutcome, CreateCategoryParams, RepoError,
    UpdateCategoryParams,
};
use crate::domain::entities::CategoryRecord;
use crate::domain::slug::{SlugAsyncError, SlugError, generate_unique_slug_async};
use crate::domain::tree::{TreeNode, build_tree};

#[derive(Debug, Error)]
pub enum AdminCategoryError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("category not found")]
    NotFound,
    #[error("parent category not found")]
    ParentNotFound,
    #[error("Parent must be a top-level category.")]
    ParentNotRoot,
    #[error("A category cannot be its own parent.")]
    SelfParent,
    #[error("A category with child categories must stay at the top level.")]
    NestedChildren,
    #[error("This category has child categories. Remove or reassign them before deleting.")]
    HasChildren { count: u64 },
    #[error("This category is used by {count} projects. Reassign them before deleting.")]
    InUse { count: u64 },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateCategoryCommand {
    pub name: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct UpdateCategoryCommand {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct AdminCategoryService {
    reader: Arc<dyn CategoriesRepo>,
    writer: Arc<dyn CategoriesWriteRepo>,
    audit: AdminAuditService,
    cache_trigger: Option<CacheTrigger>,
}

impl AdminCategoryService {
    pub fn new(
        reader: Arc<dyn CategoriesRepo>,
        writer: Arc<dyn CategoriesWriteRepo>,
        audit: AdminAuditService,
    ) -> Self {
        Self {
            reader,
            writer,
            audit,
            cache_trigger: None,
        }
    }

    pub fn with_cache_trigger_opt(mut self, trigger: Option<CacheTrigger>) -> Self {
        self.cache_trigger = trigger;
        self
    }

    pub async fn list(&self) -> Result<Vec<CategoryRecord>, AdminCategoryError> {
        self.reader
            .list_categories()
            .await
            .map_err(AdminCategoryError::from)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, AdminCategoryError> {
        self.reader
            .find_by_id(id)
            .await
            .map_err(AdminCategoryError::from)
    }

    /// Nested category forest for admin views.
    pub async fn tree(&self) -> Result<Vec<TreeNode<CategoryRecord>>, AdminCategoryError> {
        let categories = self.reader.list_categories().await?;
        Ok(build_tree(categories))
    }

    /// Categories that may be offered as a parent: top-level only, optionally
    /// excluding the category currently being edited.
    pub async fn list_parent_options(
        &self,
        exclude: Option<Uuid>,
    ) -> Result<Vec<CategoryRecord>, AdminCategoryError> {
        let categories = self.reader.list_categories().await?;
        Ok(categories
            .into_iter()
            .filter(|category| category.parent_id.is_none())
            .filter(|category| Some(category.id) != exclude)
            .collect())
    }

    pub async fn create_category(
        &self,
        actor: &str,
        command: CreateCategoryCommand,
    ) -> Result<CategoryRecord, AdminCategoryError> {
        let name = command.name.trim().to_string();
        ensure_non_empty(&name, "name")?;

        if let Some(parent_id) = command.parent_id {
            self.ensure_valid_parent(parent_id, None).await?;
        }

        let slug = self.unique_slug(&name).await?;

        let params = CreateCategoryParams {
            slug,
            name,
            parent_id: command.parent_id,
        };

        let category = self.writer.create_category(params).await?;
        self.record_audit(actor, "category.create", &category).await?;
        self.notify_changed();
        Ok(category)
    }

    pub async fn update_category(
        &self,
        actor: &str,
        command: UpdateCategoryCommand,
    ) -> Result<CategoryRecord, AdminCategoryError> {
        let name = command.name.trim().to_string();
        ensure_non_empty(&name, "name")?;

        let existing = self
            .reader
            .find_by_id(command.id)
            .await?
            .ok_or(AdminCategoryError::NotFound)?;

        if let Some(parent_id) = command.parent_id {
            self.ensure_valid_parent(parent_id, Some(command.id)).await?;

            // Nesting a category that has children would exceed two levels.
            let children = self.reader.count_children(command.id).await?;
            if children > 0 {
                return Err(AdminCategoryError::NestedChildren);
            }
        }

        let params = UpdateCategoryParams {
            id: command.id,
            slug: existing.slug.clone(),
            name,
            parent_id: command.parent_id,
        };

        let category = self.writer.update_category(params).await?;
        self.record_audit(actor, "category.update", &category).await?;
        self.notify_changed();
        Ok(category)
    }

    pub async fn delete_category(&self, actor: &str, id: Uuid) -> Result<(), AdminCategoryError> {
        match self.writer.delete_category(id).await? {
            CategoryDeleteOutcome::Deleted => {
                self.audit
                    .record(
                        actor,
                        "category.delete",
                        "category",
                        Some(&id.to_string()),
                        Option::<&CategorySnapshot>::None,
                    )
                    .await?;
                self.notify_changed();
                Ok(())
            }
            CategoryDeleteOutcome::NotFound => Err(AdminCategoryError::NotFound),
            CategoryDeleteOutcome::BlockedByChildren { count } => {
                Err(AdminCategoryError::HasChildren { count })
            }
            CategoryDeleteOutcome::BlockedByProjects { count } => {
                Err(AdminCategoryError::InUse { count })
            }
        }
    }

    async fn ensure_valid_parent(
        &self,
        parent_id: Uuid,
        editing: Option<Uuid>,
    ) -> Result<(), AdminCategoryError> {
        if editing == Some(parent_id) {
            return Err(AdminCategoryError::SelfParent);
        }

        let parent = self
            .reader
            .find_by_id(parent_id)
            .await?
            .ok_or(AdminCategoryError::ParentNotFound)?;

        if parent.parent_id.is_some() {
            return Err(AdminCategoryError::ParentNotRoot);
        }

        Ok(())
    }

    async fn unique_slug(&self, name: &str) -> Result<String, AdminCategoryError> {
        let reader = self.reader.clone();
        match generate_unique_slug_async(name, move |candidate| {
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
                    Err(AdminCategoryError::ConstraintViolation("name"))
                }
                SlugError::Exhausted { .. } => {
                    Err(AdminCategoryError::ConstraintViolation("slug"))
                }
            },
            Err(SlugAsyncError::Predicate(err)) => Err(AdminCategoryError::Repo(err)),
        }
    }

    async fn record_audit(
        &self,
        actor: &str,
        action: &str,
        category: &CategoryRecord,
    ) -> Result<(), RepoError> {
        let snapshot = CategorySnapshot {
            slug: category.slug.as_str(),
            name: category.name.as_str(),
            parent_id: category.parent_id,
        };
        self.audit
            .record(
                actor,
                action,
                "category",
                Some(&category.id.to_string()),
                Some(&snapshot),
            )
            .await
    }

    fn notify_changed(&self) {
        if let Some(trigger) = &self.cache_trigger {
            trigger.categories_changed();
        }
    }
}

#[derive(Debug, Serialize)]
struct CategorySnapshot<'a> {
    slug: &'a str,
    name: &'a str,
    parent_id: Option<Uuid>,
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), AdminCategoryError> {
    if value.trim().is_empty() {
        return Err(AdminCategoryError::ConstraintViolation(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use time::OffsetDateTime;

    use crate::application::repos::AuditRepo;
    use crate::domain::entities::AuditLogRecord;

    #[derive(Clone, Default)]
    struct StubCategoriesRepo {
        records: Vec<CategoryRecord>,
        children: u64,
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

        async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError> {
            Ok(self
                .records
                .iter()
                .find(|category| category.slug == slug)
                .cloned())
        }

        async fn count_children(&self, _id: Uuid) -> Result<u64, RepoError> {
            Ok(self.children)
        }

        async fn count_projects(&self, _id: Uuid) -> Result<u64, RepoError> {
            Ok(0)
        }
    }

    #[derive(Default)]
    struct RecordingWriter {
        outcome: Option<CategoryDeleteOutcome>,
        created: Mutex<Vec<CreateCategoryParams>>,
        deleted: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl CategoriesWriteRepo for RecordingWriter {
        async fn create_category(
            &self,
            params: CreateCategoryParams,
        ) -> Result<CategoryRecord, RepoError> {
            let record = CategoryRecord {
                id: Uuid::new_v4(),
                name: params.name.clone(),
                slug: params.slug.clone(),
                parent_id: params.parent_id,
                created_at: OffsetDateTime::now_utc(),
            };
            self.created.lock().unwrap().push(params);
            Ok(record)
        }

        async fn update_category(
            &self,
            params: UpdateCategoryParams,
        ) -> Result<CategoryRecord, RepoError> {
            Ok(CategoryRecord {
                id: params.id,
                name: params.name,
                slug: params.slug,
                parent_id: params.parent_id,
                created_at: OffsetDateTime::now_utc(),
            })
        }

        async fn delete_category(&self, id: Uuid) -> Result<CategoryDeleteOutcome, RepoError> {
            self.deleted.lock().unwrap().push(id);
            Ok(self.outcome.unwrap_or(CategoryDeleteOutcome::Deleted))
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

    fn sample_category(id: u128, name: &str, parent: Option<u128>) -> CategoryRecord {
        CategoryRecord {
            id: Uuid::from_u128(id),
            name: name.to_string(),
            slug: slug::slugify(name),
            parent_id: parent.map(Uuid::from_u128),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn service(reader: StubCategoriesRepo, writer: Arc<RecordingWriter>) -> AdminCategoryService {
        let audit = AdminAuditService::new(Arc::new(FakeAuditRepo));
        AdminCategoryService::new(Arc::new(reader), writer, audit)
    }

    #[tokio::test]
    async fn create_rejects_non_root_parent() {
        let reader = StubCategoriesRepo {
            records: vec![
                sample_category(1, "Residential", None),
                sample_category(2, "Single Family", Some(1)),
            ],
            children: 0,
        };
        let writer = Arc::new(RecordingWriter::default());
        let service = service(reader, writer.clone());

        let result = service
            .create_category(
                "tester",
                CreateCategoryCommand {
                    name: "Cabins".to_string(),
                    parent_id: Some(Uuid::from_u128(2)),
                },
            )
            .await;

        assert!(matches!(result, Err(AdminCategoryError::ParentNotRoot)));
        assert!(writer.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_missing_parent() {
        let reader = StubCategoriesRepo::default();
        let writer = Arc::new(RecordingWriter::default());
        let service = service(reader, writer.clone());

        let result = service
            .create_category(
                "tester",
                CreateCategoryCommand {
                    name: "Cabins".to_string(),
                    parent_id: Some(Uuid::from_u128(99)),
                },
            )
            .await;

        assert!(matches!(result, Err(AdminCategoryError::ParentNotFound)));
    }

    #[tokio::test]
    async fn create_derives_unique_slug() {
        let reader = StubCategoriesRepo {
            records: vec![sample_category(1, "Residential", None)],
            children: 0,
        };
        let writer = Arc::new(RecordingWriter::default());
        let service = service(reader, writer.clone());

        let category = service
            .create_category(
                "tester",
                CreateCategoryCommand {
                    name: "Residential".to_string(),
                    parent_id: None,
                },
            )
            .await
            .expect("create succeeds");

        assert_eq!(category.slug, "residential-2");
    }

    #[tokio::test]
    async fn update_rejects_nesting_a_category_with_children() {
        let reader = StubCategoriesRepo {
            records: vec![
                sample_category(1, "Residential", None),
                sample_category(2, "Civic", None),
            ],
            children: 3,
        };
        let writer = Arc::new(RecordingWriter::default());
        let service = service(reader, writer.clone());

        let result = service
            .update_category(
                "tester",
                UpdateCategoryCommand {
                    id: Uuid::from_u128(2),
                    name: "Civic".to_string(),
                    parent_id: Some(Uuid::from_u128(1)),
                },
            )
            .await;

        assert!(matches!(result, Err(AdminCategoryError::NestedChildren)));
    }

    #[tokio::test]
    async fn update_rejects_self_parent() {
        let reader = StubCategoriesRepo {
            records: vec![sample_category(1, "Residential", None)],
            children: 0,
        };
        let writer = Arc::new(RecordingWriter::default());
        let service = service(reader, writer.clone());

        let result = service
            .update_category(
                "tester",
                UpdateCategoryCommand {
                    id: Uuid::from_u128(1),
                    name: "Residential".to_string(),
                    parent_id: Some(Uuid::from_u128(1)),
                },
            )
            .await;

        assert!(matches!(result, Err(AdminCategoryError::SelfParent)));
    }

    #[tokio::test]
    async fn delete_blocked_by_children_reports_count() {
        let writer = Arc::new(RecordingWriter {
            outcome: Some(CategoryDeleteOutcome::BlockedByChildren { count: 2 }),
            ..Default::default()
        });
        let service = service(StubCategoriesRepo::default(), writer.clone());

        let result = service.delete_category("tester", Uuid::from_u128(1)).await;

        match result {
            Err(AdminCategoryError::HasChildren { count }) => assert_eq!(count, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_blocked_by_projects_reports_count() {
        let writer = Arc::new(RecordingWriter {
            outcome: Some(CategoryDeleteOutcome::BlockedByProjects { count: 5 }),
            ..Default::default()
        });
        let service = service(StubCategoriesRepo::default(), writer.clone());

        let result = service.delete_category("tester", Uuid::from_u128(1)).await;

        match result {
            Err(AdminCategoryError::InUse { count }) => assert_eq!(count, 5),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_succeeds_when_unreferenced() {
        let writer = Arc::new(RecordingWriter::default());
        let service = service(StubCategoriesRepo::default(), writer.clone());

        service
            .delete_category("tester", Uuid::from_u128(7))
            .await
            .expect("delete succeeds");

        assert_eq!(
            writer.deleted.lock().unwrap().as_slice(),
            &[Uuid::from_u128(7)]
        );
    }

    #[tokio::test]
    async fn parent_options_offer_only_roots() {
        let reader = StubCategoriesRepo {
            records: vec![
                sample_category(1, "Residential", None),
                sample_category(2, "Single Family", Some(1)),
                sample_category(3, "Civic", None),
            ],
            children: 0,
        };
        let service = service(reader, Arc::new(RecordingWriter::default()));

        let options = service
            .list_parent_options(Some(Uuid::from_u128(3)))
            .await
            .expect("options");

        let names: Vec<_> = options.iter().map(|category| category.name.as_str()).collect();
        assert_eq!(names, vec!["Residential"]);
    }
}
