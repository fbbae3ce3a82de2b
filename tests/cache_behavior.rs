//! End-to-end behavior of the content cache: deduplication, TTL expiry,
//! write-triggered invalidation, and the fallback chain.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::macros::datetime;
use tokio::sync::Notify;
use uuid::Uuid;

use atelier::application::content::{CacheTrigger, ContentService, ContentSource};
use atelier::application::repos::RepoError;
use atelier::cache::{CacheConfig, FallbackContent};
use atelier::domain::entities::{CategoryRecord, PageRecord, ProjectRecord};

/// Source whose category loads can be gated, failed, and counted.
struct ScriptedSource {
    loads: AtomicUsize,
    failing: AtomicBool,
    gate: Option<Arc<Notify>>,
    categories: std::sync::Mutex<Vec<CategoryRecord>>,
}

impl ScriptedSource {
    fn new(categories: Vec<CategoryRecord>) -> Self {
        Self {
            loads: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            gate: None,
            categories: std::sync::Mutex::new(categories),
        }
    }

    fn gated(categories: Vec<CategoryRecord>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(categories)
        }
    }

    fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn push_category(&self, category: CategoryRecord) {
        self.categories.lock().unwrap().push(category);
    }
}

#[async_trait]
impl ContentSource for ScriptedSource {
    async fn load_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("connection refused"));
        }
        Ok(self.categories.lock().unwrap().clone())
    }

    async fn load_published_projects(&self) -> Result<Vec<ProjectRecord>, RepoError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("connection refused"));
        }
        Ok(Vec::new())
    }

    async fn load_published_pages(&self) -> Result<Vec<PageRecord>, RepoError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("connection refused"));
        }
        Ok(Vec::new())
    }
}

fn category(n: u128, name: &str) -> CategoryRecord {
    CategoryRecord {
        id: Uuid::from_u128(n),
        name: name.to_string(),
        slug: slug::slugify(name),
        parent_id: None,
        created_at: datetime!(2024-06-01 00:00:00 UTC),
    }
}

fn config_with_ttl(ttl_seconds: u64) -> CacheConfig {
    CacheConfig {
        ttl_seconds,
        ..Default::default()
    }
}

#[tokio::test]
async fn concurrent_readers_share_one_store_load() {
    let gate = Arc::new(Notify::new());
    let source = Arc::new(ScriptedSource::gated(
        vec![category(1, "Residential")],
        Arc::clone(&gate),
    ));
    let content = Arc::new(ContentService::new(
        &CacheConfig::default(),
        Arc::clone(&source) as Arc<dyn ContentSource>,
        FallbackContent::defaults(),
    ));

    let first = {
        let content = Arc::clone(&content);
        tokio::spawn(async move { content.categories().await })
    };

    // Wait until the leading load has started before issuing the second read.
    while source.load_count() == 0 {
        tokio::task::yield_now().await;
    }

    let second = {
        let content = Arc::clone(&content);
        tokio::spawn(async move { content.categories().await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    gate.notify_waiters();

    let first = first.await.expect("first reader");
    let second = second.await.expect("second reader");

    assert_eq!(first, second);
    assert_eq!(source.load_count(), 1);
}

#[tokio::test]
async fn repeat_read_within_ttl_is_served_from_cache() {
    let source = Arc::new(ScriptedSource::new(vec![category(1, "Residential")]));
    let content = ContentService::new(
        &CacheConfig::default(),
        Arc::clone(&source) as Arc<dyn ContentSource>,
        FallbackContent::defaults(),
    );

    content.categories().await;
    content.categories().await;
    content.categories().await;

    assert_eq!(source.load_count(), 1);
}

#[tokio::test]
async fn write_trigger_makes_new_data_visible_immediately() {
    let source = Arc::new(ScriptedSource::new(vec![category(1, "Residential")]));
    let content = Arc::new(ContentService::new(
        &CacheConfig::default(),
        Arc::clone(&source) as Arc<dyn ContentSource>,
        FallbackContent::defaults(),
    ));
    let trigger = CacheTrigger::new(Arc::clone(&content));

    let before = content.categories().await;
    assert_eq!(before.len(), 1);

    // A created category followed by the invalidation trigger must be seen by
    // the very next read, TTL notwithstanding.
    source.push_category(category(2, "Civic"));
    trigger.categories_changed();

    let after = content.categories().await;
    assert_eq!(after.len(), 2);
    assert_eq!(source.load_count(), 2);
}

#[tokio::test]
async fn zero_ttl_disables_fresh_hits_but_keeps_stale_fallback() {
    let source = Arc::new(ScriptedSource::new(vec![category(1, "Residential")]));
    let content = ContentService::new(
        &config_with_ttl(0),
        Arc::clone(&source) as Arc<dyn ContentSource>,
        FallbackContent::defaults(),
    );

    let seeded = content.categories().await;
    assert_eq!(source.load_count(), 1);

    // Without a fresh entry, the next read loads again.
    content.categories().await;
    assert_eq!(source.load_count(), 2);

    // A failing store degrades to the last stored value, not the bundled set.
    source.fail(true);
    let recovered = content.categories().await;
    assert_eq!(recovered, seeded);
}

#[tokio::test]
async fn failing_store_serves_bundled_snapshot_on_cold_cache() {
    let source = Arc::new(ScriptedSource::new(vec![category(1, "Residential")]));
    source.fail(true);
    let fallback = FallbackContent::load();
    let expected = fallback.categories.clone();
    let content = ContentService::new(
        &CacheConfig::default(),
        Arc::clone(&source) as Arc<dyn ContentSource>,
        fallback,
    );

    let categories = content.categories().await;
    assert_eq!(categories, expected);

    let projects = content.published_projects().await;
    assert!(!projects.is_empty());
}

#[tokio::test]
async fn hardcoded_defaults_back_the_chain() {
    // Defaults are what load() falls back to when the snapshot is unusable;
    // they must always provide a renderable dataset.
    let defaults = FallbackContent::defaults();
    assert!(!defaults.categories.is_empty());
    assert!(!defaults.projects.is_empty());
    assert!(!defaults.pages.is_empty());
}
