use crate::api::error::AppError;
use crate::services::conversion_service::Upload;
use axum::extract::Multipart;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;

/// Multipart field carrying the document on every conversion endpoint.
pub const FILE_FIELD: &str = "file";

/// Pulls the `file` field out of a multipart body; other fields are skipped.
pub async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Upload, AppError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Rejected multipart body: {}", e);
        AppError::BadRequest("Failed to read uploaded file".to_string())
    })?;

    while let Some(field) = multipart.next_field().await.map_err(field_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(field_error)?;
        tracing::info!(
            "📥 Received upload {:?} ({} bytes)",
            filename.as_deref().unwrap_or("unnamed"),
            data.len()
        );
        return Ok(Upload::new(filename, data));
    }

    Err(AppError::BadRequest(
        "Failed to read uploaded file".to_string(),
    ))
}

fn field_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        tracing::debug!("Malformed multipart field: {}", e);
        AppError::BadRequest("Failed to read uploaded file".to_string())
    }
}
