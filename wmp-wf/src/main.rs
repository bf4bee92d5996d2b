//! Workflow Engine (wmp-wf) - Main entry point
//!
//! Resolves configuration, opens the database, wires the classifier and
//! image store into the workflow orchestrator, and serves the HTTP API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wmp_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use wmp_common::db::init_database;
use wmp_common::events::EventBus;
use wmp_wf::classifier::HttpClassifier;
use wmp_wf::gateway::Gateway;
use wmp_wf::images::FsImageStore;
use wmp_wf::{build_router, AppState, WorkflowSettings, Workflows};

/// Command-line arguments for wmp-wf
#[derive(Parser, Debug)]
#[command(name = "wmp-wf")]
#[command(about = "Workflow engine microservice for WMP")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5790", env = "WMP_WF_PORT")]
    port: u16,

    /// Root folder holding the database and stored images
    #[arg(short, long, env = "WMP_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "WMP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wmp_wf=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!(
        "Starting WMP Workflow Engine (wmp-wf) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = TomlConfig::load_or_default(args.config.as_deref());

    let root_folder = RootFolderResolver::new("wmp-wf")
        .with_cli_arg(args.root_folder.clone())
        .with_toml(&config)
        .resolve();
    info!("Root folder: {}", root_folder.display());

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    let db_path = initializer.database_path();
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let classifier =
        HttpClassifier::new(&config.classifier).context("Failed to build classifier client")?;
    info!("Classifier endpoint: {}", config.classifier.base_url);

    let images = FsImageStore::new(initializer.images_path());
    let events = EventBus::new(config.events.capacity);

    let workflows = Workflows::new(Gateway::new(pool), Arc::new(classifier), Arc::new(images), events)
        .with_settings(WorkflowSettings::from(&config.rewards));

    let app = build_router(AppState::new(workflows));

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
