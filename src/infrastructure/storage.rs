use crate::config::ServiceConfig;
use crate::services::temp_store::TempStore;
use anyhow::Context;
use tracing::info;

pub async fn setup_temp_store(config: &ServiceConfig) -> anyhow::Result<TempStore> {
    let store = TempStore::new(&config.temp_dir);
    store.ensure_exists().await.with_context(|| {
        format!(
            "Failed to create temp directory {}",
            config.temp_dir.display()
        )
    })?;

    info!("📂 Temp directory: {}", store.root().display());
    Ok(store)
}
