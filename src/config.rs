use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::time::Duration;

/// Where texts are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Postgres,
    /// In-process store, empty unless `SEED_FILE` is set.
    Memory,
}

impl StorageKind {
    /// Unknown values fall back to Postgres.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => StorageKind::Memory,
            _ => StorageKind::Postgres,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub storage: StorageKind,
    /// Only set for Postgres storage
    pub database: Option<PgConnectOptions>,
    pub db_max_connections: u32,

    // Server
    pub port: u16,
    pub request_timeout: Option<Duration>,
    /// How long in-flight requests may run after a shutdown signal
    pub shutdown_grace: Duration,

    // Startup data
    pub seed_file: Option<String>,

    // Logging
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let storage = StorageKind::parse(
            &std::env::var("STORAGE").unwrap_or_else(|_| "postgres".to_string()),
        );

        let database = match storage {
            StorageKind::Postgres => Some(database_options_from_env()?),
            StorageKind::Memory => None,
        };

        let request_timeout_ms: u64 = std::env::var("REQUEST_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5000);

        Ok(Self {
            storage,
            database,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),

            port: std::env::var("SERVICE_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            request_timeout: (request_timeout_ms > 0)
                .then(|| Duration::from_millis(request_timeout_ms)),
            shutdown_grace: Duration::from_millis(
                std::env::var("SHUTDOWN_GRACE_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10_000),
            ),

            seed_file: std::env::var("SEED_FILE").ok().filter(|v| !v.is_empty()),

            log_format: match std::env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
        })
    }
}

/// Connection options from `DATABASE_URL`, or from the individual `DB_*`
/// variables when it is unset.
pub fn database_options_from_env() -> Result<PgConnectOptions> {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        if !url.is_empty() {
            return url
                .parse::<PgConnectOptions>()
                .context("DATABASE_URL is not a valid PostgreSQL URL");
        }
    }

    let host = std::env::var("DB_HOST").context("DATABASE_URL or DB_HOST not set")?;
    let port: u16 = match std::env::var("DB_PORT") {
        Ok(port) => port.parse().context("DB_PORT is not a valid port")?,
        Err(_) => 5432,
    };
    let user = std::env::var("DB_USER").context("DB_USER not set")?;
    let password = std::env::var("DB_PASSWORD").context("DB_PASSWORD not set")?;
    let name = std::env::var("DB_NAME").context("DB_NAME not set")?;
    let ssl_mode: PgSslMode = std::env::var("DB_SSL_MODE")
        .unwrap_or_else(|_| "disable".to_string())
        .parse()
        .context("DB_SSL_MODE is not a valid sslmode")?;

    Ok(PgConnectOptions::new()
        .host(&host)
        .port(port)
        .username(&user)
        .password(&password)
        .database(&name)
        .ssl_mode(ssl_mode))
}
