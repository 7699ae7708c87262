use crate::config::ServiceConfig;
use crate::services::converter::{CommandConverter, DocumentConverter};
use std::sync::Arc;
use tracing::info;

pub async fn setup_converter(config: &ServiceConfig) -> Arc<dyn DocumentConverter> {
    let converter = CommandConverter::new(config.tools.clone(), config.convert_timeout);

    // Missing tools only fail the requests that need them
    if converter.health_check().await {
        info!("🔧 Conversion tools located on PATH");
    } else {
        tracing::warn!("⚠️  Some conversion tools are missing! Affected endpoints will return 500.");
    }

    match config.convert_timeout {
        Some(timeout) => info!("⏱️  Conversion timeout: {:?}", timeout),
        None => info!("⏱️  Conversion timeout: none"),
    }

    Arc::new(converter)
}
