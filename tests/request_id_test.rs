mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::*;
use std::fmt;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Collects the `request_id` of every `http_request` span.
#[derive(Clone, Default)]
struct SpanIds(Arc<Mutex<Vec<String>>>);

impl<S: Subscriber> Layer<S> for SpanIds {
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        if attrs.metadata().name() != "http_request" {
            return;
        }
        let mut visitor = RequestIdField(None);
        attrs.record(&mut visitor);
        if let Some(id) = visitor.0 {
            self.0.lock().unwrap().push(id);
        }
    }
}

struct RequestIdField(Option<String>);

impl Visit for RequestIdField {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "request_id" {
            self.0 = Some(format!("{:?}", value));
        }
    }
}

#[tokio::test]
async fn test_span_carries_generated_request_id() {
    let ids = SpanIds::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(ids.clone()));

    let dir = tempfile::tempdir().unwrap();
    let app = test_app(test_config(dir.path(), None), Arc::new(FakeConverter::new()));

    let response = app
        .oneshot(upload_request("/doc-to-txt", "notes.doc", b"doc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let header = response.headers()["x-request-id"].to_str().unwrap().to_string();
    assert_ne!(header, "unknown");
    assert_eq!(*ids.0.lock().unwrap(), vec![header]);
}

#[tokio::test]
async fn test_span_keeps_client_request_id() {
    let ids = SpanIds::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(ids.clone()));

    let dir = tempfile::tempdir().unwrap();
    let app = test_app(test_config(dir.path(), None), Arc::new(FakeConverter::new()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header("x-request-id", "client-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "client-42");
    assert_eq!(*ids.0.lock().unwrap(), vec!["client-42".to_string()]);
}
