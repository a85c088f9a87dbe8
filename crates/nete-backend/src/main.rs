mod config;
mod error;
mod routes;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use clap::Parser;
use config::{Args, BackendConfig, Listen};
use nete_core::FilesystemNoteStore;
use routes::{app_router, AppState, SyncTarget};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = BackendConfig::load(&args)?;

    let level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("nete_backend={level}").parse()?)
                .add_directive(format!("nete_core={level}").parse()?),
        )
        .init();

    tracing::info!("Starting nete-backend with config: {:?}", config);

    let store = Arc::new(FilesystemNoteStore::open(&config.storage_base_dir)?);
    let sync_target = config.sync_url.clone().map(|url| SyncTarget {
        url,
        timeout: config.sync_timeout,
    });
    let router = app_router(AppState::new(store, sync_target));

    match &config.listen {
        Listen::Tcp { host, port } => {
            let bind_addr = Listen::tcp_addr(host, *port);
            let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
            tracing::info!("starting server on tcp://{}", bind_addr);
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        #[cfg(unix)]
        Listen::Unix(path) => {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let listener = tokio::net::UnixListener::bind(path)?;
            tracing::info!("starting server on socket {}", path.display());
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await;
            let _ = std::fs::remove_file(path);
            served?;
        }
        #[cfg(not(unix))]
        Listen::Unix(path) => {
            return Err(format!(
                "Unix domain sockets are not supported on this platform ({})",
                path.display()
            )
            .into());
        }
    }

    tracing::info!("nete-backend stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
