//! Playhouse Site Backend - API Server Binary
//!
//! This binary starts the HTTP API server and the background CRM sync worker.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin playhouse-api
//!
//! # Run with environment variables
//! APP_HOST=0.0.0.0 APP_PORT=8080 DATABASE_URL=postgres://... cargo run --bin playhouse-api
//! ```
//!
//! # Environment Variables
//!
//! * `APP_HOST` - Server host (default: 0.0.0.0)
//! * `APP_PORT` - Server port (default: 8080)
//! * `APP_JWT_SECRET` - JWT signing secret for the admin surface (required in production)
//! * `APP_DATABASE_URL` / `DATABASE_URL` - PostgreSQL connection string
//! * `APP_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `APP_CRM_BASE_URL` - Base URL of the legacy CRM (default: http://localhost:8090)
//! * `APP_CRM_USERNAME` / `APP_CRM_PASSWORD` - CRM integration credentials
//! * `APP_CRM_TIMEOUT_SECS` - Per-request CRM timeout (default: 15)
//! * `APP_SYNC_INTERVAL_SECS` - Delay between scheduled sync runs (default: 300)
//! * `APP_SYNC_BATCH_SIZE` - Records per sync batch (default: 10)
//! * `APP_SYNC_MAX_ATTEMPTS` - Sync attempt ceiling per record (default: 5)

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_leads::{
    CrmCapabilities, CrmPort, LeadStorePort, LegacyCrmClient, LegacyCrmConfig, SyncWorker,
};
use infra_db::PostgresLeadStore;
use interface_api::{config::ApiConfig, create_router, AppState};

/// Main entry point for the API server.
///
/// Initializes logging, loads configuration, establishes the database
/// connection, probes the CRM entry point, starts the sync worker, and
/// serves HTTP until shutdown.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - Database connection fails
/// - Server fails to bind to the configured address
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    // Load configuration from environment
    let config = load_config();

    // Initialize tracing/logging
    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        "Starting playhouse site API server"
    );

    // Create database connection pool
    let pool = create_database_pool(&config.database_url).await?;

    // Verify database connectivity
    run_migrations(&pool).await?;

    // Record store adapter
    let store: Arc<dyn LeadStorePort> = Arc::new(PostgresLeadStore::new(pool));

    // CRM client: one-time capability probe, then a fixed mapping
    let crm_config = LegacyCrmConfig::new(
        &config.crm_base_url,
        &config.crm_username,
        &config.crm_password,
    )
    .map_err(|e| anyhow::anyhow!("invalid CRM configuration: {e}"))?
    .with_timeout(config.crm_timeout());

    let capabilities = match CrmCapabilities::probe(&crm_config).await {
        Ok(capabilities) => {
            tracing::info!(entry_point = %capabilities.entry_point, "CRM entry point discovered");
            capabilities
        }
        Err(error) => {
            tracing::warn!(%error, "CRM capability probe failed, using default entry point");
            CrmCapabilities::default()
        }
    };
    let crm: Arc<dyn CrmPort> = Arc::new(
        LegacyCrmClient::with_capabilities(crm_config, capabilities)
            .map_err(|e| anyhow::anyhow!("failed to build CRM client: {e}"))?,
    );

    // Wire the application state and spawn the background sync worker
    let state = AppState::new(store, crm, config.clone());
    let worker = SyncWorker::spawn(state.engine.clone(), config.sync_interval());

    // Create the API router
    let app = create_router(state);

    // Parse server address
    let addr: SocketAddr = config.server_addr().parse()?;

    tracing::info!(%addr, "Server listening");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the worker after the HTTP surface has drained
    worker.shutdown().await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Loads API configuration from environment variables.
///
/// Falls back to default values if environment variables are not set.
fn load_config() -> ApiConfig {
    ApiConfig::from_env().unwrap_or_else(|_| {
        // Fall back to individual env vars or defaults
        let defaults = ApiConfig::default();
        ApiConfig {
            host: std::env::var("APP_HOST").unwrap_or(defaults.host),
            port: std::env::var("APP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            jwt_secret: std::env::var("APP_JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_expiration_secs: std::env::var("APP_JWT_EXPIRATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jwt_expiration_secs),
            database_url: std::env::var("DATABASE_URL")
                .or_else(|_| std::env::var("APP_DATABASE_URL"))
                .unwrap_or(defaults.database_url),
            log_level: std::env::var("APP_LOG_LEVEL")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            crm_base_url: std::env::var("APP_CRM_BASE_URL").unwrap_or(defaults.crm_base_url),
            crm_username: std::env::var("APP_CRM_USERNAME").unwrap_or(defaults.crm_username),
            crm_password: std::env::var("APP_CRM_PASSWORD").unwrap_or(defaults.crm_password),
            crm_timeout_secs: std::env::var("APP_CRM_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.crm_timeout_secs),
            sync_interval_secs: std::env::var("APP_SYNC_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sync_interval_secs),
            sync_batch_size: std::env::var("APP_SYNC_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sync_batch_size),
            sync_max_attempts: std::env::var("APP_SYNC_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sync_max_attempts),
        }
    })
}

/// Initializes the tracing subscriber for structured logging.
///
/// # Arguments
///
/// * `log_level` - The minimum log level to output (trace, debug, info, warn, error)
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Creates a PostgreSQL connection pool.
///
/// # Arguments
///
/// * `database_url` - PostgreSQL connection string
///
/// # Errors
///
/// Returns error if connection to database fails
async fn create_database_pool(database_url: &str) -> Result<sqlx::PgPool, sqlx::Error> {
    tracing::info!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(database_url)
        .await?;

    tracing::info!("Database connection established");
    Ok(pool)
}

/// Verifies database readiness.
///
/// Schema migrations are applied from `migrations/` at deploy time; this
/// checks connectivity with a simple query before the server starts.
///
/// # Errors
///
/// Returns error if the database is unreachable
async fn run_migrations(pool: &sqlx::PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Verifying database readiness...");

    sqlx::query("SELECT 1").execute(pool).await?;

    tracing::info!("Database ready");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// This enables graceful shutdown of the server, allowing in-flight
/// requests to complete before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
