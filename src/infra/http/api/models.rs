//! Request and response bodies for the admin API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CategoryCreateRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryUpdateRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ParentOptionsQuery {
    /// Category being edited; excluded from the offered options.
    #[serde(default)]
    pub exclude: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectListQuery {
    #[serde(default)]
    pub published: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectCreateRequest {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub main_image_url: Option<String>,
    /// Accepted as an array or a JSON-encoded string; normalized server-side.
    #[serde(default)]
    pub gallery_image_urls: serde_json::Value,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProjectUpdateRequest {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub main_image_url: Option<String>,
    #[serde(default)]
    pub gallery_image_urls: serde_json::Value,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProjectPublishRequest {
    pub published: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProjectImageInput {
    pub url: String,
    #[serde(default)]
    pub alt: String,
}

#[derive(Debug, Deserialize)]
pub struct ProjectImagesRequest {
    pub images: Vec<ProjectImageInput>,
}

#[derive(Debug, Deserialize)]
pub struct PageCreateRequest {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct PageUpdateRequest {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct AuditListQuery {
    #[serde(default = "default_audit_limit")]
    pub limit: u32,
}

fn default_audit_limit() -> u32 {
    50
}
