use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::admin::audit::AdminAuditService;
use crate::application::content::CacheTrigger;
use crate::application::repos::{
    CreatePageParams, PagesRepo, PagesWriteRepo, RepoError, UpdatePageParams,
};
use crate::domain::entities::PageRecord;
use crate::domain::slug::{SlugAsyncError, SlugError, derive_slug, generate_unique_slug_async};
use crate::domain::tree::{TreeNode, build_tree};

#[derive(Debug, Error)]
pub enum AdminPageError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("page not found")]
    NotFound,
    #[error("parent page not found")]
    ParentNotFound,
    #[error("A page cannot be its own parent.")]
    SelfParent,
    #[error("A page with slug `{slug}` already exists.")]
    SlugTaken { slug: String },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreatePageCommand {
    pub title: String,
    pub slug: Option<String>,
    pub content: String,
    pub published: bool,
    pub sort_order: i32,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct UpdatePageCommand {
    pub id: Uuid,
    pub title: String,
    pub slug: Option<String>,
    pub content: String,
    pub published: bool,
    pub sort_order: i32,
    pub parent_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct AdminPageService {
    reader: Arc<dyn PagesRepo>,
    writer: Arc<dyn PagesWriteRepo>,
    audit: AdminAuditService,
    cache_trigger: Option<CacheTrigger>,
}

impl AdminPageService {
    pub fn new(
        reader: Arc<dyn PagesRepo>,
        writer: Arc<dyn PagesWriteRepo>,
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

    pub async fn list(&self) -> Result<Vec<PageRecord>, AdminPageError> {
        self.reader
            .list_pages(false)
            .await
            .map_err(AdminPageError::from)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PageRecord>, AdminPageError> {
        self.reader.find_by_id(id).await.map_err(AdminPageError::from)
    }

    /// Nested page forest for admin views.
    pub async fn tree(&self) -> Result<Vec<TreeNode<PageRecord>>, AdminPageError> {
        let pages = self.reader.list_pages(false).await?;
        Ok(build_tree(pages))
    }

    pub async fn create_page(
        &self,
        actor: &str,
        command: CreatePageCommand,
    ) -> Result<PageRecord, AdminPageError> {
        let title = command.title.trim().to_string();
        ensure_non_empty(&title, "title")?;

        if let Some(parent_id) = command.parent_id {
            self.ensure_parent_exists(parent_id, None).await?;
        }

        let slug = self
            .resolve_slug(command.slug.as_deref(), &title, None)
            .await?;

        let params = CreatePageParams {
            slug,
            title,
            content: command.content,
            published: command.published,
            sort_order: command.sort_order,
            parent_id: command.parent_id,
        };

        let page = self.writer.create_page(params).await?;
        self.record_audit(actor, "page.create", &page).await?;
        self.notify_changed();
        Ok(page)
    }

    pub async fn update_page(
        &self,
        actor: &str,
        command: UpdatePageCommand,
    ) -> Result<PageRecord, AdminPageError> {
        let title = command.title.trim().to_string();
        ensure_non_empty(&title, "title")?;

        let existing = self
            .reader
            .find_by_id(command.id)
            .await?
            .ok_or(AdminPageError::NotFound)?;

        if let Some(parent_id) = command.parent_id {
            self.ensure_parent_exists(parent_id, Some(command.id)).await?;
        }

        let slug = match command.slug.as_deref() {
            Some(requested) => {
                self.resolve_slug(Some(requested), &title, Some(&existing.slug))
                    .await?
            }
            None => existing.slug.clone(),
        };

        let params = UpdatePageParams {
            id: command.id,
            slug,
            title,
            content: command.content,
            published: command.published,
            sort_order: command.sort_order,
            parent_id: command.parent_id,
        };

        let page = self.writer.update_page(params).await?;
        self.record_audit(actor, "page.update", &page).await?;
        self.notify_changed();
        Ok(page)
    }

    pub async fn delete_page(&self, actor: &str, id: Uuid) -> Result<(), AdminPageError> {
        let page = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(AdminPageError::NotFound)?;

        self.writer.delete_page(id).await?;
        self.audit
            .record(
                actor,
                "page.delete",
                "page",
                Some(&id.to_string()),
                Some(&PageSnapshot {
                    slug: page.slug.as_str(),
                    title: page.title.as_str(),
                    published: page.published,
                }),
            )
            .await?;
        self.notify_changed();
        Ok(())
    }

    async fn ensure_parent_exists(
        &self,
        parent_id: Uuid,
        editing: Option<Uuid>,
    ) -> Result<(), AdminPageError> {
        if editing == Some(parent_id) {
            return Err(AdminPageError::SelfParent);
        }

        self.reader
            .find_by_id(parent_id)
            .await?
            .ok_or(AdminPageError::ParentNotFound)?;
        Ok(())
    }

    async fn resolve_slug(
        &self,
        requested: Option<&str>,
        title: &str,
        current: Option<&str>,
    ) -> Result<String, AdminPageError> {
        if let Some(requested) = requested {
            let slug =
                derive_slug(requested).map_err(|_| AdminPageError::ConstraintViolation("slug"))?;
            if Some(slug.as_str()) != current && self.reader.find_by_slug(&slug).await?.is_some() {
                return Err(AdminPageError::SlugTaken { slug });
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
                    Err(AdminPageError::ConstraintViolation("title"))
                }
                SlugError::Exhausted { .. } => Err(AdminPageError::ConstraintViolation("slug")),
            },
            Err(SlugAsyncError::Predicate(err)) => Err(AdminPageError::Repo(err)),
        }
    }

    async fn record_audit(
        &self,
        actor: &str,
        action: &str,
        page: &PageRecord,
    ) -> Result<(), RepoError> {
        let snapshot = PageSnapshot {
            slug: page.slug.as_str(),
            title: page.title.as_str(),
            published: page.published,
        };
        self.audit
            .record(
                actor,
                action,
                "page",
                Some(&page.id.to_string()),
                Some(&snapshot),
            )
            .await
    }

    fn notify_changed(&self) {
        if let Some(trigger) = &self.cache_trigger {
            trigger.pages_changed();
        }
    }
}

#[derive(Debug, Serialize)]
struct PageSnapshot<'a> {
    slug: &'a str,
    title: &'a str,
    published: bool,
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), AdminPageError> {
    if value.trim().is_empty() {
        return Err(AdminPageError::ConstraintViolation(field));
    }
    Ok(())
}
