//! netarchive - network dataset archive server
//!
//! `netarchive serve` runs the HTTP API; `netarchive add-owner <email>`
//! registers an owner and prints their API key.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use netarchive_common::config::{resolve_bind_address, resolve_root_folder, RootFolderInitializer};
use netarchive_common::db::{init_database, owners};
use netarchive_server::archive::Archive;
use netarchive_server::graph::ArchiveFiles;
use netarchive_server::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "netarchive")]
#[command(about = "Archive of network datasets with derived metadata search")]
#[command(version)]
struct Cli {
    /// Root folder holding the database and network files
    #[arg(long, global = true)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long)]
        bind: Option<String>,
    },
    /// Register an owner and print their API key
    AddOwner {
        /// Owner's email address
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    let initializer = RootFolderInitializer::new(resolve_root_folder(cli.root_folder.as_deref()));
    initializer
        .ensure_directory_exists()
        .with_context(|| format!("Cannot create root folder {}", initializer.root().display()))?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to open database")?;

    match cli.command {
        Command::AddOwner { email } => {
            let owner = owners::create_owner(&pool, &email)
                .await
                .with_context(|| format!("Failed to add owner {}", email))?;
            info!(owner_id = %owner.id, "Added owner {}", owner.email);
            println!("{}", owner.api_key);
        }
        Command::Serve { bind } => {
            info!(
                "Starting netarchive v{} with archive directory {}",
                env!("CARGO_PKG_VERSION"),
                initializer.archive_dir().display()
            );

            let archive =
                Archive::with_default_analysers(pool, ArchiveFiles::new(initializer.archive_dir()));
            info!("Analysers: {}", archive.chain().names().join(" -> "));
            let app = build_router(AppState::new(archive));

            let addr = resolve_bind_address(bind.as_deref());
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind to {}", addr))?;
            info!("netarchive listening on http://{}", addr);
            info!("Health check: http://{}/health", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Server error")?;

            info!("Server shutdown complete");
        }
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
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
