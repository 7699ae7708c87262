#![allow(dead_code)]

use async_trait::async_trait;
use axum::{Router, body::Body, http::Request};
use office_convert_server::config::ServiceConfig;
use office_convert_server::services::converter::{
    ConversionError, DocumentConverter, TargetFormat, output_path_for,
};
use office_convert_server::services::temp_store::TempStore;
use office_convert_server::{AppState, create_app};
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const BOUNDARY: &str = "---------------------------123456789012345678901234567";

pub const PLAIN_EML: &[u8] = b"From: ann@example.com\r\n\
To: bob@example.com\r\n\
Subject: Status\r\n\
Date: Tue, 8 Apr 2025 09:30:00 +0000\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
All systems nominal.\r\n";

/// Stands in for soffice, msgconvert and unrtf by writing canned output next to the input.
pub struct FakeConverter {
    outputs: Mutex<Vec<(TargetFormat, Vec<u8>)>>,
    calls: AtomicUsize,
}

impl FakeConverter {
    pub fn new() -> Self {
        Self {
            outputs: Mutex::new(vec![
                (TargetFormat::Pdf, b"%PDF-1.7 fake".to_vec()),
                (TargetFormat::Text, b"\n  Converted document text  \n\n".to_vec()),
                (TargetFormat::Eml, PLAIN_EML.to_vec()),
                (TargetFormat::RtfText, b"Hello from RTF\n".to_vec()),
            ]),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails every conversion, like a tool exiting non-zero.
    pub fn failing() -> Self {
        Self {
            outputs: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_output(self, target: TargetFormat, data: &[u8]) -> Self {
        {
            let mut outputs = self.outputs.lock().unwrap();
            outputs.retain(|(t, _)| *t != target);
            outputs.push((target, data.to_vec()));
        }
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentConverter for FakeConverter {
    async fn convert(
        &self,
        input: &Path,
        target: TargetFormat,
    ) -> Result<std::path::PathBuf, ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let data = self
            .outputs
            .lock()
            .unwrap()
            .iter()
            .find(|(t, _)| *t == target)
            .map(|(_, data)| data.clone());
        let Some(data) = data else {
            return Err(ConversionError::Failed {
                tool: "fake".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "conversion refused".to_string(),
            });
        };

        let output = output_path_for(input, target);
        std::fs::write(&output, data).unwrap();
        Ok(output)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

pub fn test_config(dir: &Path, api_key: Option<&str>) -> ServiceConfig {
    ServiceConfig {
        temp_dir: dir.to_path_buf(),
        api_key: api_key.map(str::to_string),
        ..ServiceConfig::default()
    }
}

pub fn test_app(config: ServiceConfig, converter: Arc<FakeConverter>) -> Router {
    let store = TempStore::new(&config.temp_dir);
    create_app(AppState::new(config, store, converter))
}

pub fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{boundary}\r\n\
        Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
        Content-Type: application/octet-stream\r\n\r\n",
        boundary = BOUNDARY
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(uri: &str, filename: &str, content: &[u8]) -> Request<Body> {
    multipart_request(uri, multipart_body("file", filename, content))
}

pub fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn leftover_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}
