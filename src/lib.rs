pub mod api;
pub mod config;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::api::handlers::{convert, health};
use crate::config::ServiceConfig;
use crate::services::conversion_service::ConversionService;
use crate::services::converter::DocumentConverter;
use crate::services::temp_store::TempStore;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::Span;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::root,
        api::handlers::health::health_check,
        api::handlers::convert::convert_spreadsheet,
        api::handlers::convert::document_to_text,
        api::handlers::convert::message_to_text,
    ),
    components(
        schemas(
            api::handlers::convert::UploadForm,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "convert", description = "Document conversion endpoints"),
        (name = "system", description = "Liveness and health")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: ServiceConfig,
    pub conversion: Arc<ConversionService>,
}

impl AppState {
    pub fn new(config: ServiceConfig, store: TempStore, converter: Arc<dyn DocumentConverter>) -> Self {
        Self {
            config,
            conversion: Arc::new(ConversionService::new(store, converter)),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route(
            "/convert",
            post(convert::convert_spreadsheet).fallback(convert::method_not_allowed),
        )
        .route(
            "/doc-to-txt",
            post(convert::document_to_text).fallback(convert::method_not_allowed),
        )
        .route(
            "/msg-to-txt",
            post(convert::message_to_text).fallback(convert::method_not_allowed),
        )
        .layer(from_fn_with_state(
            state.clone(),
            api::middleware::auth::api_key_middleware,
        ))
        .layer(DefaultBodyLimit::max(state.config.max_file_size))
        // Inside the request-id layer so every span sees the assigned id
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    api::middleware::request_id::request_span(request)
                })
                .on_request(|request: &axum::http::Request<_>, _span: &Span| {
                    tracing::info!("📥 {} {}", request.method(), request.uri());
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, _span: &Span| {
                        tracing::info!(
                            "📤 Finished in {:?} with status {}",
                            latency,
                            response.status()
                        );
                    },
                ),
        )
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .with_state(state)
}
