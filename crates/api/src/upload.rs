//! File bodies for upload endpoints.
//!
//! Uploads arrive either as `multipart/form-data` with the payload in a
//! field named `file`, or as the raw request body.

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Multipart field that carries the uploaded file.
pub const FILE_FIELD: &str = "file";

/// Pull the `file` field out of a multipart body. Other fields are ignored.
pub async fn read_file_field(mut multipart: Multipart) -> AppResult<Bytes> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::from_rejection(e.status(), e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        return field
            .bytes()
            .await
            .map_err(|e| AppError::from_rejection(e.status(), e.body_text()));
    }
    Err(AppError::BadRequest(format!(
        "Multipart upload has no '{FILE_FIELD}' field"
    )))
}

/// Read an upload that may be multipart or raw, based on `Content-Type`.
pub async fn read_upload(request: Request, state: &AppState) -> AppResult<Bytes> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let bytes = if is_multipart {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| AppError::from_rejection(e.status(), e.body_text()))?;
        read_file_field(multipart).await?
    } else {
        Bytes::from_request(request, state)
            .await
            .map_err(|e| AppError::from_rejection(e.status(), e.body_text()))?
    };

    if bytes.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".into()));
    }
    Ok(bytes)
}
