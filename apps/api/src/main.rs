mod analysis;
mod auth;
mod config;
mod errors;
mod llm_client;
mod models;
mod previews;
mod render;
mod routes;
mod state;
mod storage;
#[cfg(test)]
mod test_support;
mod views;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::feedback::LlmFeedbackProvider;
use crate::analysis::jobs::UploadJobs;
use crate::config::{Config, StorageBackend};
use crate::llm_client::LlmClient;
use crate::previews::PreviewRegistry;
use crate::render::MupdfRasterizer;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{BlobStore, FsBlobStore, KvStore, MemoryKv, RedisKv, S3BlobStore};
use crate::views::ViewRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resumark API v{}", env!("CARGO_PKG_VERSION"));

    // Blob storage
    let blobs: Arc<dyn BlobStore> = match &config.storage {
        StorageBackend::S3 {
            bucket,
            endpoint,
            access_key_id,
            secret_access_key,
        } => Arc::new(
            S3BlobStore::connect(bucket, endpoint, access_key_id, secret_access_key).await,
        ),
        StorageBackend::Local { root } => {
            info!("Local blob store at {}", root.display());
            Arc::new(FsBlobStore::new(root.clone()))
        }
    };

    // Resume records
    let kv: Arc<dyn KvStore> = match &config.redis_url {
        Some(url) => Arc::new(
            RedisKv::connect(url)
                .await
                .context("Failed to connect to Redis")?,
        ),
        None => {
            info!("REDIS_URL not set; resume records are kept in memory");
            Arc::new(MemoryKv::new())
        }
    };

    // Initialize LLM client
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    )
    .context("Failed to build LLM client")?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let state = AppState {
        feedback: Arc::new(LlmFeedbackProvider::new(llm, blobs.clone())),
        rasterizer: Arc::new(MupdfRasterizer),
        blobs,
        kv,
        previews: PreviewRegistry::new(),
        uploads: UploadJobs::new(),
        views: ViewRegistry::new(),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
