use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

use crate::application::admin::audit::AdminAuditService;
use crate::application::repos::RepoError;
use crate::infra::uploads::{StoredUpload, UploadStorage, UploadStorageError};

#[derive(Debug, Error)]
pub enum AdminUploadError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error(transparent)]
    Storage(#[from] UploadStorageError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Stores uploaded assets and answers with their public URL.
#[derive(Clone)]
pub struct AdminUploadService {
    storage: Arc<UploadStorage>,
    audit: AdminAuditService,
}

impl AdminUploadService {
    pub fn new(storage: Arc<UploadStorage>, audit: AdminAuditService) -> Self {
        Self { storage, audit }
    }

    /// Persist an uploaded payload under `folder` and return its metadata.
    pub async fn store(
        &self,
        actor: &str,
        folder: Option<&str>,
        filename: &str,
        data: Bytes,
    ) -> Result<StoredUpload, AdminUploadError> {
        if filename.trim().is_empty() {
            return Err(AdminUploadError::ConstraintViolation("filename"));
        }

        let stored = self.storage.store(folder, filename, data).await?;
        self.audit
            .record(
                actor,
                "upload.create",
                "upload",
                Some(stored.stored_path.as_str()),
                Some(&UploadSnapshot {
                    stored_path: stored.stored_path.as_str(),
                    size_bytes: stored.size_bytes,
                    checksum: stored.checksum.as_str(),
                }),
            )
            .await?;
        Ok(stored)
    }

    /// Public URL for a stored path.
    pub fn public_url(stored_path: &str) -> String {
        format!("/uploads/{stored_path}")
    }
}

#[derive(Debug, Serialize)]
struct UploadSnapshot<'a> {
    stored_path: &'a str,
    size_bytes: i64,
    checksum: &'a str,
}
