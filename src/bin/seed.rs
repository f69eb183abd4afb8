//! Seed binary - loads languages, texts and groups from a JSON fixture into PostgreSQL
//!
//! Usage:
//!   cargo run --bin seed -- data/texts.json
//!
//! Required environment variables:
//! - DATABASE_URL (or DB_HOST, DB_USER, DB_PASSWORD, DB_NAME)
//!
//! Optional:
//! - DB_PORT (defaults to 5432)
//! - DB_SSL_MODE (defaults to disable)

use anyhow::{Context, Result};
use text_service::config::{database_options_from_env, LogFormat};
use text_service::context::RequestContext;
use text_service::db::Database;
use text_service::repository::Repositories;
use text_service::{logging, seed};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    logging::init(LogFormat::Text, "seed=info,text_service=info")?;

    let path = std::env::args()
        .nth(1)
        .context("Usage: seed <fixture.json>")?;

    let fixture = seed::Fixture::from_file(&path)?;
    info!(
        "Loaded fixture {} ({} languages, {} texts, {} groups)",
        path,
        fixture.languages.len(),
        fixture.texts.len(),
        fixture.groups.len()
    );

    let db = Database::connect(database_options_from_env()?, 2).await?;
    db.migrate().await?;

    let repos = Repositories::postgres(&db);
    let summary = seed::apply(&repos, &RequestContext::new("seed", ""), &fixture).await?;

    info!(
        "✓ Seeded {} languages, {} texts, {} groups, {} memberships ({} already present)",
        summary.languages, summary.texts, summary.groups, summary.memberships, summary.skipped
    );

    db.close().await;
    Ok(())
}
