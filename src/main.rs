use clap::Parser;
use dotenvy::dotenv;
use office_convert_server::config::ServiceConfig;
use office_convert_server::infrastructure::{converter, storage};
use office_convert_server::services::worker::RetentionWorker;
use office_convert_server::{AppState, create_app};
use std::net::{IpAddr, SocketAddr};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port for the HTTP server
    #[arg(short, long, default_value_t = 80)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment & logging
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "office_convert_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Office Convert Server...");

    // 2. Configuration & infrastructure
    let config = ServiceConfig::from_env();
    info!(
        "🛡️  Config: Max Size={}MB, Retention={:?}, Sweep Interval={:?}",
        config.max_file_size / 1024 / 1024,
        config.retention,
        config.sweep_interval
    );
    if !config.auth_enabled() {
        warn!("⚠️  API_KEY is not set, requests are accepted without a key!");
    }

    let store = storage::setup_temp_store(&config).await?;
    let converter = converter::setup_converter(&config).await;

    // 3. Retention worker
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let worker = RetentionWorker::new(
        store.root(),
        config.retention,
        config.sweep_interval,
        shutdown_rx,
    );
    let worker_handle = tokio::spawn(worker.run());
    info!("👷 Retention worker initialized.");

    // 4. HTTP server
    let state = AppState::new(config, store, converter);

    let app = create_app(state);
    let addr = SocketAddr::new(args.host, args.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("✅ Server listening on: http://{}", addr);
    info!("📖 Swagger UI documentation: http://{}/swagger-ui", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Server runtime error: {}", e);
    }

    // 5. Stop the worker once in-flight requests are done
    let _ = shutdown_tx.send(true);
    if let Err(e) = worker_handle.await {
        error!("❌ Retention worker ended abnormally: {}", e);
    }

    info!("👋 Server exited cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
