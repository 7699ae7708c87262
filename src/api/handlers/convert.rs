use crate::AppState;
use crate::api::error::AppError;
use crate::api::handlers::upload::read_upload;
use crate::utils::validation::{attachment_disposition, sanitize_filename};
use axum::{
    extract::{Multipart, State, multipart::MultipartRejection},
    http::header,
    response::{IntoResponse, Response},
};
use std::path::Path;
use utoipa::ToSchema;

/// Multipart form accepted by the conversion endpoints.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// Document to convert
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[utoipa::path(
    post,
    path = "/convert",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "PDF rendering of the spreadsheet (application/pdf attachment)"),
        (status = 400, description = "Missing or unreadable upload"),
        (status = 401, description = "Invalid API key"),
        (status = 500, description = "Conversion failed")
    ),
    security(("api_key" = [])),
    tag = "convert"
)]
pub async fn convert_spreadsheet(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let upload = read_upload(multipart).await?;

    let pdf = state
        .conversion
        .spreadsheet_to_pdf(&upload)
        .await
        .map_err(AppError::conversion("Failed to convert file to PDF"))?;

    let download_name = upload
        .filename
        .as_deref()
        .map(sanitize_filename)
        .and_then(|name| {
            Path::new(&name)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(|stem| format!("{}.pdf", stem))
        })
        .unwrap_or_else(|| "output.pdf".to_string());

    Ok((
        [
            (header::CONTENT_TYPE, mime::APPLICATION_PDF.to_string()),
            (header::CONTENT_DISPOSITION, attachment_disposition(&download_name)),
        ],
        pdf,
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/doc-to-txt",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Plain text of the document", body = String, content_type = "text/plain"),
        (status = 400, description = "Missing or unreadable upload"),
        (status = 401, description = "Invalid API key"),
        (status = 500, description = "Conversion failed")
    ),
    security(("api_key" = [])),
    tag = "convert"
)]
pub async fn document_to_text(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let upload = read_upload(multipart).await?;

    let text = state
        .conversion
        .document_to_text(&upload)
        .await
        .map_err(AppError::conversion("Failed to process .doc file"))?;

    Ok(plain_text(text))
}

#[utoipa::path(
    post,
    path = "/msg-to-txt",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Header block and body of the message", body = String, content_type = "text/plain"),
        (status = 400, description = "Missing or unreadable upload"),
        (status = 401, description = "Invalid API key"),
        (status = 500, description = "Conversion failed")
    ),
    security(("api_key" = [])),
    tag = "convert"
)]
pub async fn message_to_text(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let upload = read_upload(multipart).await?;

    let text = state
        .conversion
        .message_to_text(&upload)
        .await
        .map_err(AppError::conversion("Failed to process .msg file"))?;

    Ok(plain_text(text))
}

/// Answers every non-POST method on the conversion endpoints.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed("Only POST method is allowed".to_string())
}

fn plain_text(text: String) -> Response {
    ([(header::CONTENT_TYPE, mime::TEXT_PLAIN_UTF_8.as_ref())], text).into_response()
}
