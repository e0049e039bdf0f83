//! TitanPDF Server binary

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use titanpdf_server::stores::{MemoryAttachmentStore, MemoryDocumentStore};
use titanpdf_server::{app, AppState, Config};
use tracing::info;

const PURGE_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("titanpdf_server=info".parse()?)
                .add_directive("form_fill=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    info!("Initializing TitanPDF API ({})...", config.environment.as_str());

    // Platform and drive credentials are not wired up; both stores are local
    let state = AppState::new(
        &config,
        Arc::new(MemoryAttachmentStore::new()),
        Arc::new(MemoryDocumentStore::new()),
    )
    .await?;
    let state = Arc::new(state);

    let purge_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = purge_state.generated.lock().await.purge_expired();
            if purged > 0 {
                tracing::debug!("Purged {} expired generated PDFs", purged);
            }
        }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting TitanPDF API on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
