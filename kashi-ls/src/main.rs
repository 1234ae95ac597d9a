//! Lyrics Service (kashi-ls) - Main entry point
//!
//! Resolves synced lyrics through the provider chain, caches them in memory
//! and SQLite, and serves the HTTP/SSE control interface.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kashi_common::config::{resolve_data_dir, Settings};
use kashi_ls::api::{self, AppContext};
use kashi_ls::config::Config;
use kashi_ls::db;
use kashi_ls::resolver::LyricsResolver;
use kashi_ls::state::ResolutionStore;
use kashi_ls::translate::TranslationResolver;

/// Command-line arguments for kashi-ls
#[derive(Parser, Debug)]
#[command(name = "kashi-ls")]
#[command(about = "Lyrics resolution service for Kashi")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5730", env = "KASHI_LS_PORT")]
    port: u16,

    /// Data directory holding the database and settings file
    #[arg(short, long, env = "KASHI_DATA_DIR")]
    data_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kashi_ls=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let data_dir = resolve_data_dir(args.data_dir.as_deref(), "KASHI_DATA_DIR");
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let config = Config::new(bind_addr, data_dir);

    info!("Starting Kashi Lyrics Service on port {}", args.port);
    info!("Data directory: {}", config.data_dir.display());

    let settings =
        Settings::load(&config.settings_path).context("Failed to load settings")?;

    let pool = db::open_pool(&config.db_path)
        .await
        .context("Failed to open database")?;
    db::init(&pool).await.context("Failed to initialize database")?;

    let store = Arc::new(ResolutionStore::new());
    let resolver = Arc::new(
        LyricsResolver::new(Arc::clone(&store), pool.clone(), settings.clone())
            .context("Failed to build lyrics resolver")?,
    );
    let translator = Arc::new(
        TranslationResolver::new(Arc::clone(&store), pool.clone(), settings)
            .context("Failed to build translation resolver")?,
    );
    info!("Resolution pipeline initialized");

    let ctx = AppContext {
        store,
        resolver,
        translator,
        db: pool,
    };

    api::server::run(config.bind_addr, ctx)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
