//! aula-web - Aula learning platform HTTP service

use anyhow::{Context, Result};
use aula_common::config::{database_url, resolve_root_folder, TomlConfig};
use aula_common::db::init_database;
use aula_web::{build_router, AppState};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "aula-web", version, about = "Aula learning platform backend")]
struct Args {
    /// Root folder holding the database
    #[arg(long, env = "AULA_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long, env = "AULA_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address (overrides [server] host)
    #[arg(long)]
    host: Option<String>,

    /// Port (overrides [server] port)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, config_source) = TomlConfig::locate(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Starting Aula web service (aula-web) v{}", env!("CARGO_PKG_VERSION"));
    config_source.log();

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;
    info!("Root folder: {}", root_folder.display());

    let db_url = database_url(&root_folder, &config);
    let pool = init_database(&db_url).await?;
    info!("✓ Database ready");

    if config.tutor.url.is_none() {
        warn!("AI tutor URL not configured - /api/tutor/chat will answer 503");
    }
    if config.evaluator.url.is_none() {
        warn!("AI evaluator URL not configured - submissions will answer 503");
    }
    info!("OAuth providers: {}", config.oauth.providers.len());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(pool, config).context("Failed to build HTTP clients")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
