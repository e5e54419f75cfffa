//! CitiCare
//!
//! Backend for a municipal grievance portal: citizens file complaints about
//! civic problems, departments accept and work them, administrators route
//! them and approve repair costs.
//!
//! ## Features
//!
//! - **Complaints**: numbered intake with photos, role-scoped listings, statistics
//! - **Department workflow**: acceptance, cost estimates, completion remarks
//! - **Administration**: users, departments, geographic taxonomy, settings

mod config;
mod db;
mod error;
mod handlers;
mod models;
mod policy;
mod validation;

use axum::Router;
use config::StorageBackend;
use db::{MemoryStore, PgStore, Store};
use handlers::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "citicare=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Starting CitiCare");
    tracing::info!("Environment: {:?}", config.environment);

    // Select the store
    let store: Arc<dyn Store> = match &config.storage {
        StorageBackend::Postgres { database_url } => {
            tracing::info!("Connecting to database...");
            let pool = db::create_pool(database_url).await?;
            tracing::info!("Database connected");

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool).await?;

            Arc::new(PgStore::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // Ensure upload directory exists
    let upload_dir = PathBuf::from(&config.upload_dir);
    fs::create_dir_all(&upload_dir).await?;
    tracing::info!("Upload directory: {:?}", upload_dir);

    let state = AppState::new(&config, store);

    // Build CORS layer
    let cors = if config.is_production() {
        CorsLayer::new()
            .allow_origin(
                config
                    .cors_origins
                    .iter()
                    .filter_map(|o| o.parse().ok())
                    .collect::<Vec<_>>(),
            )
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::permissive()
    };

    let app = Router::new()
        .merge(handlers::router(state))
        .nest_service("/uploads", ServeDir::new(&upload_dir))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.max_body_size()))
        .layer(cors);

    // Start server
    let addr = config.server_addr();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
