//! Application state

use crate::cache::{Clock, SystemClock, TtlCache};
use crate::config::{Config, Environment, DEFAULT_MAX_BODY_BYTES};
use crate::models::GeneratedPdf;
use crate::stores::{AttachmentStore, DocumentStore};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct AppState {
    pub environment: Environment,
    pub attachments: Arc<dyn AttachmentStore>,
    pub documents: Arc<dyn DocumentStore>,
    /// Generated reports by id
    pub generated: Mutex<TtlCache<String, GeneratedPdf>>,
    /// Fillable test report form, when one is configured and readable
    pub tceq_template: Option<Arc<Vec<u8>>>,
    /// Largest accepted request body
    pub body_limit: usize,
}

impl AppState {
    /// Build state from configuration, reading the report template if set
    pub async fn new(
        config: &Config,
        attachments: Arc<dyn AttachmentStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Result<Self> {
        let tceq_template = match &config.tceq_template_path {
            Some(path) => match tokio::fs::read(path).await {
                Ok(bytes) => {
                    tracing::info!("Loaded TCEQ template from {}", path.display());
                    Some(Arc::new(bytes))
                }
                Err(e) => {
                    tracing::warn!(
                        "Could not read TCEQ template {}: {}; reports will use the reference sheet",
                        path.display(),
                        e
                    );
                    None
                }
            },
            None => None,
        };

        let ttl = chrono::Duration::from_std(config.generated_pdf_ttl)
            .context("GENERATED_PDF_TTL_SECS is out of range")?;

        let mut state = Self::with_parts(
            config.environment,
            attachments,
            documents,
            tceq_template,
            TtlCache::new(ttl, Arc::new(SystemClock)),
        );
        state.body_limit = config.max_body_bytes;
        Ok(state)
    }

    pub fn with_parts(
        environment: Environment,
        attachments: Arc<dyn AttachmentStore>,
        documents: Arc<dyn DocumentStore>,
        tceq_template: Option<Arc<Vec<u8>>>,
        generated: TtlCache<String, GeneratedPdf>,
    ) -> Self {
        Self {
            environment,
            attachments,
            documents,
            generated: Mutex::new(generated),
            tceq_template,
            body_limit: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// State for tests and local runs: no template, given clock and TTL
    pub fn in_memory(
        attachments: Arc<dyn AttachmentStore>,
        documents: Arc<dyn DocumentStore>,
        ttl: chrono::Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_parts(
            Environment::Development,
            attachments,
            documents,
            None,
            TtlCache::new(ttl, clock),
        )
    }
}
