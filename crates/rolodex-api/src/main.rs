//! Rolodex API Server

use anyhow::Context;
use clap::Parser;
use rolodex_api::auth::{LogMailer, PasswordConfig};
use rolodex_api::clock::SystemClock;
use rolodex_api::{create_router, state::AppState};
use rolodex_core::config::AppConfig;
use rolodex_core::{MemoryStore, PgStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rolodex-api")]
#[command(about = "Multi-tenant contact directory API")]
#[command(version)]
struct Args {
    /// TOML configuration file; environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep all data in memory instead of PostgreSQL
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    config.validate()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let mailer = Arc::new(LogMailer::new(&config.mail));
    let clock = Arc::new(SystemClock);

    let state = if args.memory {
        tracing::warn!("Using in-memory storage; data is lost on exit");
        let store = Arc::new(MemoryStore::new());
        AppState::with_password_config(
            config.clone(),
            store.clone(),
            store,
            mailer,
            clock,
            PasswordConfig::light(),
        )?
    } else {
        let store = Arc::new(
            PgStore::connect(&config.database)
                .await
                .context("connecting to PostgreSQL")?,
        );
        store.ensure_schema().await?;
        AppState::new(config.clone(), store.clone(), store, mailer, clock)?
    };

    let app = create_router(Arc::new(state));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Rolodex API Server starting on http://{}", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
