use crate::services::converter::{
    ConversionError, DocumentConverter, TargetFormat, output_path_for,
};
use crate::services::mail::{BodySource, MailEnvelope, MailParseError, render_text};
use crate::services::temp_store::{RequestFiles, TempStore};
use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// An uploaded file, held in memory for the duration of one request.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: Option<String>,
    pub data: Bytes,
}

impl Upload {
    pub fn new(filename: Option<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.filter(|name| !name.trim().is_empty()),
            data: data.into(),
        }
    }

    fn filename_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.filename.as_deref().unwrap_or(fallback)
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Failed to save uploaded file")]
    Stage(#[source] io::Error),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("Failed to read converted file")]
    ReadOutput(#[source] io::Error),

    #[error(transparent)]
    Mail(#[from] MailParseError),
}

/// Runs uploads through the external converters, one temp workspace per call.
pub struct ConversionService {
    store: TempStore,
    converter: Arc<dyn DocumentConverter>,
}

impl ConversionService {
    pub fn new(store: TempStore, converter: Arc<dyn DocumentConverter>) -> Self {
        Self { store, converter }
    }

    pub fn store(&self) -> &TempStore {
        &self.store
    }

    /// Spreadsheet to PDF bytes.
    pub async fn spreadsheet_to_pdf(&self, upload: &Upload) -> Result<Vec<u8>, ServiceError> {
        let mut files = self.store.workspace();
        let input = files.path_with_extension("xlsx");
        let input = stage(&mut files, input, &upload.data).await?;

        let pdf = self.convert(&mut files, &input, TargetFormat::Pdf).await?;
        let bytes = tokio::fs::read(&pdf).await.map_err(ServiceError::ReadOutput)?;

        tracing::info!(
            "📄 Spreadsheet {} converted to PDF ({} bytes)",
            files.request_id(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Legacy word-processor document to trimmed plain text.
    pub async fn document_to_text(&self, upload: &Upload) -> Result<String, ServiceError> {
        let mut files = self.store.workspace();
        let name = staging_name(upload.filename_or("document.doc"), "doc", TargetFormat::Text);
        let input = files.path_for_upload(&name);
        let input = stage(&mut files, input, &upload.data).await?;

        let text = self.convert(&mut files, &input, TargetFormat::Text).await?;
        let content = read_text(&text).await?;

        Ok(content.trim().to_string())
    }

    /// Outlook message to a header block followed by the best available body.
    pub async fn message_to_text(&self, upload: &Upload) -> Result<String, ServiceError> {
        let mut files = self.store.workspace();
        let name = staging_name(upload.filename_or("message.msg"), "msg", TargetFormat::Eml);
        let input = files.path_for_upload(&name);
        let input = stage(&mut files, input, &upload.data).await?;

        let eml = self.convert(&mut files, &input, TargetFormat::Eml).await?;
        let raw = tokio::fs::read(&eml).await.map_err(ServiceError::ReadOutput)?;
        let envelope = MailEnvelope::parse(&raw)?;

        let body = match envelope.select_body() {
            BodySource::Plain(text) | BodySource::Html(text) => text.into_owned(),
            BodySource::Rtf(rtf) => self.rtf_to_text(&mut files, rtf).await?,
            BodySource::Empty => String::new(),
        };

        Ok(render_text(&envelope.headers, &body))
    }

    async fn rtf_to_text(&self, files: &mut RequestFiles, rtf: &[u8]) -> Result<String, ServiceError> {
        let input = files.path_for_upload("body.rtf");
        let input = stage(files, input, rtf).await?;
        let text = self.convert(files, &input, TargetFormat::RtfText).await?;
        read_text(&text).await
    }

    async fn convert(
        &self,
        files: &mut RequestFiles,
        input: &Path,
        target: TargetFormat,
    ) -> Result<PathBuf, ServiceError> {
        // Tracked up front so partial output is removed even when the tool fails
        files.track(output_path_for(input, target));
        let output = self.converter.convert(input, target).await?;
        files.track(output.clone());
        Ok(output)
    }
}

/// Appends `source_extension` when the upload already carries the target's
/// extension, so the tool never writes over its own input.
fn staging_name(filename: &str, source_extension: &str, target: TargetFormat) -> String {
    let clashes = Path::new(filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(target.extension()));
    if clashes {
        format!("{}.{}", filename, source_extension)
    } else {
        filename.to_string()
    }
}

async fn stage(files: &mut RequestFiles, path: PathBuf, data: &[u8]) -> Result<PathBuf, ServiceError> {
    files.write(path, data).await.map_err(ServiceError::Stage)
}

async fn read_text(path: &Path) -> Result<String, ServiceError> {
    let bytes = tokio::fs::read(path).await.map_err(ServiceError::ReadOutput)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
