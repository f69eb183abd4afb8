use anyhow::{Context, Result};
use std::sync::Arc;
use text_service::config::{Config, StorageKind};
use text_service::context::RequestContext;
use text_service::db::Database;
use text_service::http::{self, AppState};
use text_service::metrics::Metrics;
use text_service::repository::{MemoryStore, Repositories};
use text_service::resolver::TextResolver;
use text_service::{logging, seed};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Load configuration from environment
    let config = Config::from_env()?;

    logging::init(config.log_format, "text_service=info,tower_http=info")?;

    info!("Starting text-service ({:?} storage)", config.storage);

    let (repos, db) = match config.storage {
        StorageKind::Postgres => {
            let options = config
                .database
                .clone()
                .context("Database connection settings missing")?;
            let db = Database::connect(options, config.db_max_connections).await?;
            db.migrate().await?;
            (Repositories::postgres(&db), Some(db))
        }
        StorageKind::Memory => (Repositories::memory(Arc::new(MemoryStore::new())), None),
    };

    if let Some(path) = &config.seed_file {
        info!("Applying seed file {}", path);
        let fixture = seed::Fixture::from_file(path)?;
        seed::apply(&repos, &RequestContext::new("startup-seed", ""), &fixture).await?;
    }

    let metrics = Metrics::new().context("Failed to register metrics")?;
    let state = AppState::new(
        TextResolver::from_repositories(&repos),
        repos.health.clone(),
        metrics,
        config.request_timeout,
    );

    let shutdown = state.shutdown_token();
    tokio::spawn(cancel_on_signal(shutdown));

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;

    info!("Started text-service on port {}", config.port);
    http::serve(listener, state, config.shutdown_grace).await?;

    if let Some(db) = db {
        db.close().await;
    }

    info!("text-service stopped");
    Ok(())
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM. This stops new connections;
/// in-flight requests get the configured grace period to finish.
async fn cancel_on_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    shutdown.cancel();
}
