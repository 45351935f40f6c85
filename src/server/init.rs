//! Server initialization and run loop.
//!
//! Builds the object store from configuration, wires the engine components
//! together, and serves the HTTP + websocket router. The store, sync layer,
//! and session registry are constructed here once and injected everywhere
//! they are needed.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Extension, Router};
use codedeck_core::{MemoryStore, ObjectStore, S3Store, SessionRegistry, WorkspaceSync};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::config::{AppConfig, StorageBackend};
use crate::{api, websocket};

/// Run the server until the process is terminated.
pub async fn run(config: AppConfig) -> Result<()> {
    let store = build_store(&config).await;
    let sync = Arc::new(WorkspaceSync::new(
        store,
        config.workspace.scratch_root(),
        config.workspace.max_concurrent_pulls,
    ));
    let registry = Arc::new(SessionRegistry::new(config.terminal.clone().into()));

    let app = router(sync, registry);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "codedeck listening");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn build_store(config: &AppConfig) -> Arc<dyn ObjectStore> {
    match config.storage.backend {
        StorageBackend::S3 => {
            info!(bucket = %config.storage.bucket, "using S3 object store");
            Arc::new(S3Store::connect(config.storage.s3_settings()).await)
        }
        StorageBackend::Memory => {
            info!("using in-memory object store; workspaces will not persist");
            Arc::new(MemoryStore::new())
        }
    }
}

fn router(sync: Arc<WorkspaceSync>, registry: Arc<SessionRegistry>) -> Router {
    Router::new()
        .merge(api::health::routes())
        .merge(api::projects::routes())
        .merge(websocket::routes())
        .layer(Extension(sync))
        .layer(Extension(registry))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
