mod api;
mod blob;
mod db;
mod metrics;
mod render;
mod service;
mod state;
mod views;

use crate::blob::{BlobStore, FilesystemBlobStore, HttpBlobStore};
use crate::db::init_db;
use crate::render::CertificateRenderer;
use crate::service::CertificateService;
use crate::state::AppState;
use anyhow::{Context, Result};
use certdesk_common::config::{AppConfig, BlobBackend};
use certdesk_common::{MemoryRecordStore, RecordStore, SeaOrmRecordStore};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env()?;

    let records: Arc<dyn RecordStore> = match config.database_url.as_deref() {
        Some(database_url) => {
            let db = init_db(database_url, config.db_max_connections).await?;
            Arc::new(SeaOrmRecordStore::new(db))
        }
        None => {
            warn!("DATABASE_URL not set; certificates are kept in memory and lost on restart");
            Arc::new(MemoryRecordStore::new())
        }
    };

    let (blobs, blob_files) = match &config.blob_backend {
        BlobBackend::Filesystem { dir } => {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("failed to create blob dir {}", dir.display()))?;
            info!("storing certificate files under {}", dir.display());
            let store: Arc<dyn BlobStore> = Arc::new(FilesystemBlobStore::new(
                dir.clone(),
                config.blob_bucket.clone(),
                config.public_base_url.clone(),
            ));
            (store, Some((config.blob_bucket.clone(), dir.clone())))
        }
        BlobBackend::Http { base_url, api_key } => {
            info!("storing certificate files in object storage at {}", base_url);
            let store: Arc<dyn BlobStore> = Arc::new(HttpBlobStore::new(
                reqwest::Client::new(),
                base_url.clone(),
                api_key.clone(),
                config.blob_bucket.clone(),
            ));
            (store, None)
        }
    };

    if !config.pdf_template_path.exists() {
        warn!(
            "certificate template {} not found; PDF generation will fail",
            config.pdf_template_path.display()
        );
    }

    let state = AppState {
        certificates: CertificateService::new(records, blobs),
        renderer: Arc::new(CertificateRenderer::new(config.pdf_template_path.clone())),
        public_base_url: config.public_base_url.clone(),
        default_language: config.default_language,
        blob_files,
        max_upload_bytes: config.max_upload_bytes,
    };

    let listen_addr = config.listen_addr.clone();
    let api_task = tokio::spawn(async move {
        let app = api::router(state);
        match tokio::net::TcpListener::bind(&listen_addr).await {
            Ok(listener) => {
                info!("certdesk listening on {}", listen_addr);
                if let Err(err) = axum::serve(listener, app).await {
                    warn!("server exited: {}", err);
                }
            }
            Err(err) => warn!("failed to bind {}: {}", listen_addr, err),
        }
    });

    tokio::select! {
        _ = api_task => {},
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
        }
    }

    Ok(())
}
