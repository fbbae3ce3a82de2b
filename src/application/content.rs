//! Cached public content service.
//!
//! Public reads go through one injected [`ContentService`] instance rather
//! than module-level state: each entity family owns a [`FetchCache`]
//! (TTL + in-flight deduplication), admin writes invalidate through
//! [`CacheTrigger`], and load failures degrade along the fallback chain
//! (stale entry → bundled snapshot → hardcoded defaults) instead of
//! surfacing errors to the public site.

use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use metrics::counter;
use serde::Serialize;
use tracing::{debug, warn};

use crate::application::repos::RepoError;
use crate::cache::{CacheConfig, FallbackContent, FetchCache};
use crate::domain::entities::{CategoryRecord, PageRecord, ProjectRecord};
use crate::domain::tree::{TreeNode, build_tree};

/// Cache keys mirror the public request paths they serve.
pub const CATEGORIES_KEY: &str = "/api/direct-categories";
pub const PROJECTS_KEY: &str = "/api/direct-projects";
pub const PAGES_KEY: &str = "/api/direct-pages";
pub const NAVIGATION_KEY: &str = "/api/navigation";

/// Read-side persistence contract for public content.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// All categories ordered by name.
    async fn load_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;

    /// Published projects, newest first.
    async fn load_published_projects(&self) -> Result<Vec<ProjectRecord>, RepoError>;

    /// Published pages ordered by sort order.
    async fn load_published_pages(&self) -> Result<Vec<PageRecord>, RepoError>;
}

/// Navigation payload: category and page forests for menus and breadcrumbs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationData {
    pub categories: Vec<TreeNode<CategoryRecord>>,
    pub pages: Vec<TreeNode<PageRecord>>,
}

impl NavigationData {
    /// Build both forests. Ordering comes from the inputs; the tree builder
    /// itself never re-sorts.
    pub fn assemble(categories: Vec<CategoryRecord>, pages: Vec<PageRecord>) -> Self {
        Self {
            categories: build_tree(categories),
            pages: build_tree(pages),
        }
    }
}

/// Cached reads for the public site.
pub struct ContentService {
    source: Arc<dyn ContentSource>,
    fallback: FallbackContent,
    categories: FetchCache<&'static str, Vec<CategoryRecord>>,
    projects: FetchCache<&'static str, Vec<ProjectRecord>>,
    pages: FetchCache<&'static str, Vec<PageRecord>>,
    navigation: FetchCache<&'static str, NavigationData>,
}

impl ContentService {
    pub fn new(
        config: &CacheConfig,
        source: Arc<dyn ContentSource>,
        fallback: FallbackContent,
    ) -> Self {
        let ttl = config.ttl();
        Self {
            source,
            fallback,
            categories: FetchCache::new("categories", ttl),
            projects: FetchCache::new("projects", ttl),
            pages: FetchCache::new("pages", ttl),
            navigation: FetchCache::new("navigation", ttl),
        }
    }

    /// All categories; never fails.
    pub async fn categories(&self) -> Vec<CategoryRecord> {
        let source = Arc::clone(&self.source);
        let result = self
            .categories
            .fetch(CATEGORIES_KEY, move || {
                async move { source.load_categories().await }.boxed()
            })
            .await;

        match result {
            Ok(records) => records,
            Err(error) => recover(
                &self.categories,
                CATEGORIES_KEY,
                &error,
                self.fallback.categories.clone(),
            ),
        }
    }

    /// Published projects; never fails.
    pub async fn published_projects(&self) -> Vec<ProjectRecord> {
        let source = Arc::clone(&self.source);
        let result = self
            .projects
            .fetch(PROJECTS_KEY, move || {
                async move { source.load_published_projects().await }.boxed()
            })
            .await;

        match result {
            Ok(records) => records,
            Err(error) => recover(
                &self.projects,
                PROJECTS_KEY,
                &error,
                self.fallback.projects.clone(),
            ),
        }
    }

    /// Published pages; never fails.
    pub async fn published_pages(&self) -> Vec<PageRecord> {
        let source = Arc::clone(&self.source);
        let result = self
            .pages
            .fetch(PAGES_KEY, move || {
                async move { source.load_published_pages().await }.boxed()
            })
            .await;

        match result {
            Ok(records) => records,
            Err(error) => recover(&self.pages, PAGES_KEY, &error, self.fallback.pages.clone()),
        }
    }

    /// Navigation forests for menus; never fails.
    pub async fn navigation(&self) -> NavigationData {
        let source = Arc::clone(&self.source);
        let result = self
            .navigation
            .fetch(NAVIGATION_KEY, move || {
                async move {
                    let categories = source.load_categories().await?;
                    let pages = source.load_published_pages().await?;
                    Ok(NavigationData::assemble(categories, pages))
                }
                .boxed()
            })
            .await;

        match result {
            Ok(data) => data,
            Err(error) => recover(
                &self.navigation,
                NAVIGATION_KEY,
                &error,
                NavigationData::assemble(
                    self.fallback.categories.clone(),
                    self.fallback.pages.clone(),
                ),
            ),
        }
    }

    /// Forget cached categories (and the navigation derived from them).
    pub fn clear_categories(&self) {
        self.categories.clear();
        self.navigation.clear();
    }

    /// Forget cached projects.
    pub fn clear_projects(&self) {
        self.projects.clear();
    }

    /// Forget cached pages (and the navigation derived from them).
    pub fn clear_pages(&self) {
        self.pages.clear();
        self.navigation.clear();
    }

    /// Evict expired entries across every family; returns how many dropped.
    pub fn purge_expired(&self) -> usize {
        self.categories.purge_expired()
            + self.projects.purge_expired()
            + self.pages.purge_expired()
            + self.navigation.purge_expired()
    }

    /// Entries currently held across every family, fresh or stale.
    pub fn cached_entries(&self) -> usize {
        self.categories.len() + self.projects.len() + self.pages.len() + self.navigation.len()
    }
}

/// Fallback chain shared by every family: stale entry first, then the
/// bundled dataset. Emits one warning per degraded read.
fn recover<V: Clone + Send + Sync + 'static>(
    cache: &FetchCache<&'static str, V>,
    key: &'static str,
    error: &Arc<RepoError>,
    bundled: V,
) -> V {
    warn!(
        target = "atelier::content",
        family = cache.family(),
        error = %error,
        "content load failed; serving fallback data"
    );

    if let Some(stale) = cache.stale(&key) {
        counter!("atelier_cache_fallback_total", "family" => cache.family(), "kind" => "stale")
            .increment(1);
        return stale;
    }

    counter!("atelier_cache_fallback_total", "family" => cache.family(), "kind" => "bundled")
        .increment(1);
    bundled
}

/// Invalidation hook handed to the admin services.
///
/// Fired after every successful mutation so subsequent public reads bypass
/// the TTL and observe the write immediately.
#[derive(Clone)]
pub struct CacheTrigger {
    content: Arc<ContentService>,
}

impl CacheTrigger {
    pub fn new(content: Arc<ContentService>) -> Self {
        Self { content }
    }

    pub fn categories_changed(&self) {
        debug!(target = "atelier::content", "cache invalidated: categories");
        self.content.clear_categories();
    }

    pub fn projects_changed(&self) {
        debug!(target = "atelier::content", "cache invalidated: projects");
        self.content.clear_projects();
    }

    pub fn pages_changed(&self) {
        debug!(target = "atelier::content", "cache invalidated: pages");
        self.content.clear_pages();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use time::macros::datetime;
    use uuid::Uuid;

    struct StubSource {
        loads: AtomicUsize,
        failing: AtomicBool,
        categories: Vec<CategoryRecord>,
    }

    impl StubSource {
        fn new(categories: Vec<CategoryRecord>) -> Self {
            Self {
                loads: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
                categories,
            }
        }

        fn fail(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn load_count(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ContentSource for StubSource {
        async fn load_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(RepoError::from_persistence("store unavailable"));
            }
            Ok(self.categories.clone())
        }

        async fn load_published_projects(&self) -> Result<Vec<ProjectRecord>, RepoError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(RepoError::from_persistence("store unavailable"));
            }
            Ok(Vec::new())
        }

        async fn load_published_pages(&self) -> Result<Vec<PageRecord>, RepoError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(RepoError::from_persistence("store unavailable"));
            }
            Ok(Vec::new())
        }
    }

    fn category(n: u128, name: &str, parent: Option<u128>) -> CategoryRecord {
        CategoryRecord {
            id: Uuid::from_u128(n),
            name: name.to_string(),
            slug: slug::slugify(name),
            parent_id: parent.map(Uuid::from_u128),
            created_at: datetime!(2024-06-01 00:00:00 UTC),
        }
    }

    fn service(source: Arc<StubSource>) -> ContentService {
        ContentService::new(
            &CacheConfig::default(),
            source,
            FallbackContent::defaults(),
        )
    }

    #[tokio::test]
    async fn repeat_read_is_served_from_cache() {
        let source = Arc::new(StubSource::new(vec![category(1, "Residential", None)]));
        let content = service(Arc::clone(&source));

        let first = content.categories().await;
        let second = content.categories().await;

        assert_eq!(first, second);
        assert_eq!(source.load_count(), 1);
    }

    #[tokio::test]
    async fn invalidation_forces_reload() {
        let source = Arc::new(StubSource::new(vec![category(1, "Residential", None)]));
        let content = service(Arc::clone(&source));

        content.categories().await;
        content.clear_categories();
        content.categories().await;

        assert_eq!(source.load_count(), 2);
    }

    #[tokio::test]
    async fn failed_load_serves_bundled_fallback() {
        let source = Arc::new(StubSource::new(vec![category(1, "Residential", None)]));
        source.fail(true);
        let content = service(Arc::clone(&source));

        let categories = content.categories().await;

        // Defaults dataset, not an error and not empty.
        assert_eq!(categories, FallbackContent::defaults().categories);
    }

    #[tokio::test]
    async fn failed_load_prefers_stale_over_bundled() {
        let source = Arc::new(StubSource::new(vec![category(1, "Residential", None)]));
        // Zero TTL: entries are never fresh but remain readable as stale.
        let config = CacheConfig {
            ttl_seconds: 0,
            ..Default::default()
        };
        let content = ContentService::new(
            &config,
            Arc::clone(&source) as Arc<dyn ContentSource>,
            FallbackContent::defaults(),
        );

        let seeded = content.categories().await;
        source.fail(true);
        let recovered = content.categories().await;

        assert_eq!(recovered, seeded);
        assert_ne!(recovered, FallbackContent::defaults().categories);
    }

    #[tokio::test]
    async fn navigation_nests_child_categories() {
        let source = Arc::new(StubSource::new(vec![
            category(1, "Residential", None),
            category(2, "Single Family", Some(1)),
        ]));
        let content = service(Arc::clone(&source));

        let navigation = content.navigation().await;

        assert_eq!(navigation.categories.len(), 1);
        assert_eq!(navigation.categories[0].children.len(), 1);
        assert_eq!(
            navigation.categories[0].children[0].item.name,
            "Single Family"
        );
    }

    #[tokio::test]
    async fn category_change_invalidates_navigation_too() {
        let source = Arc::new(StubSource::new(vec![category(1, "Residential", None)]));
        let content = Arc::new(service(Arc::clone(&source)));
        let trigger = CacheTrigger::new(Arc::clone(&content));

        content.navigation().await;
        let loads_after_first = source.load_count();

        trigger.categories_changed();
        content.navigation().await;

        assert!(source.load_count() > loads_after_first);
    }
}
