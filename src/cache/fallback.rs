//! Last-resort content when both the cache and the store fail.
//!
//! The fallback chain for a public read is: stale cache entry, then the
//! bundled snapshot shipped with the binary, then a minimal hardcoded
//! dataset. Reads never surface a load error to the public site.

use serde::Deserialize;
use time::macros::datetime;
use tracing::warn;
use uuid::Uuid;

use crate::domain::entities::{CategoryRecord, PageRecord, ProjectRecord};

const BUNDLED_SNAPSHOT: &str = include_str!("../../assets/fallback/content.json");

/// Static content document mirroring the public collection shapes.
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackContent {
    pub categories: Vec<CategoryRecord>,
    pub projects: Vec<ProjectRecord>,
    pub pages: Vec<PageRecord>,
}

impl FallbackContent {
    /// Parse the snapshot bundled into the binary.
    pub fn bundled() -> Result<Self, serde_json::Error> {
        serde_json::from_str(BUNDLED_SNAPSHOT)
    }

    /// Minimal hardcoded dataset used when the bundled snapshot is unusable.
    pub fn defaults() -> Self {
        let stamp = datetime!(2024-01-01 00:00:00 UTC);
        let category_id = Uuid::from_u128(0x1);
        Self {
            categories: vec![CategoryRecord {
                id: category_id,
                name: "Projects".to_string(),
                slug: "projects".to_string(),
                parent_id: None,
                created_at: stamp,
            }],
            projects: vec![ProjectRecord {
                id: Uuid::from_u128(0x2),
                title: "Selected Work".to_string(),
                slug: "selected-work".to_string(),
                description: "A selection of the studio's built work.".to_string(),
                content: String::new(),
                featured_image: None,
                main_image_url: None,
                gallery_image_urls: Vec::new(),
                category_id: Some(category_id),
                published: true,
                created_at: stamp,
                updated_at: stamp,
            }],
            pages: vec![PageRecord {
                id: Uuid::from_u128(0x3),
                title: "Studio".to_string(),
                slug: "studio".to_string(),
                content: String::new(),
                published: true,
                sort_order: 0,
                parent_id: None,
                created_at: stamp,
                updated_at: stamp,
            }],
        }
    }

    /// Bundled snapshot, or the hardcoded dataset if the snapshot is broken.
    pub fn load() -> Self {
        match Self::bundled() {
            Ok(content) => content,
            Err(error) => {
                warn!(
                    target = "atelier::cache::fallback",
                    error = %error,
                    "bundled fallback snapshot failed to parse; using defaults"
                );
                Self::defaults()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_snapshot_parses() {
        let content = FallbackContent::bundled().expect("snapshot parses");
        assert!(!content.categories.is_empty());
        assert!(!content.projects.is_empty());
        assert!(!content.pages.is_empty());
    }

    #[test]
    fn defaults_are_never_empty() {
        let content = FallbackContent::defaults();
        assert!(!content.categories.is_empty());
        assert!(!content.projects.is_empty());
        assert!(!content.pages.is_empty());
    }

    #[test]
    fn snapshot_projects_are_published() {
        let content = FallbackContent::bundled().expect("snapshot parses");
        assert!(content.projects.iter().all(|project| project.published));
    }
}
