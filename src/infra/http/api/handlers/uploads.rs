//! Upload handler.
//!
//! Accepts a multipart form with `file`, optional `folder`, and optional
//! `filename` fields, and answers with the stored asset's public URL.

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use bytes::Bytes;

use crate::application::admin::uploads::AdminUploadService;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::UploadResponse;
use crate::infra::http::api::state::ApiState;

use super::{ACTOR, upload_to_api};

pub async fn upload_file(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut folder: Option<String> = None;
    let mut filename_override: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        ApiError::bad_request("malformed multipart body", Some(err.to_string()))
    })? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let original = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "upload".to_string());
                let data = field.bytes().await.map_err(|err| {
                    ApiError::bad_request("failed to read uploaded file", Some(err.to_string()))
                })?;
                file = Some((original, data));
            }
            Some("folder") => {
                folder = Some(field.text().await.map_err(|err| {
                    ApiError::bad_request("failed to read `folder` field", Some(err.to_string()))
                })?);
            }
            Some("filename") => {
                filename_override = Some(field.text().await.map_err(|err| {
                    ApiError::bad_request("failed to read `filename` field", Some(err.to_string()))
                })?);
            }
            _ => {}
        }
    }

    let (original, data) =
        file.ok_or_else(|| ApiError::bad_request("missing `file` field", None))?;

    let filename = filename_override
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(original);

    let stored = state
        .uploads
        .store(ACTOR, folder.as_deref(), &filename, data)
        .await
        .map_err(upload_to_api)?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url: AdminUploadService::public_url(&stored.stored_path),
        }),
    ))
}
