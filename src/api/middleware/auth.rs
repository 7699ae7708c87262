use crate::AppState;
use crate::api::error::AppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Rejects requests whose `X-API-Key` does not match the configured key.
pub async fn api_key_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.config.api_key.as_deref() else {
        return next.run(req).await;
    };

    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    if provided != Some(expected) {
        tracing::warn!(
            "🔒 Rejected {} {}: {}",
            req.method(),
            req.uri().path(),
            if provided.is_some() { "invalid API key" } else { "missing API key" }
        );
        return AppError::Unauthorized("invalid API key".to_string()).into_response();
    }

    next.run(req).await
}
