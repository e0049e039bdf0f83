//! TitanPDF Server - HTTP API for filling and generating PDF forms
//!
//! Provides REST endpoints for:
//! - Stamping editor elements onto PDFs
//! - Completing job attachments
//! - Saving, listing and completing drafts
//! - Backflow test report generation and download

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod state;
pub mod stores;

pub use config::{Config, Environment};
pub use error::ApiError;
pub use state::AppState;

/// Build the application router
///
/// CORS is only opened up in development, where the web client is served
/// from a different origin.
pub fn app(state: Arc<AppState>) -> Router {
    let development = state.environment.is_development();
    let body_limit = state.body_limit;

    let router = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/pdf/fill", post(handlers::fill_pdf))
        .route(
            "/api/job/:job_id/attachment/:attachment_id/download",
            get(handlers::download_attachment),
        )
        .route(
            "/api/job/:job_id/attachment/:attachment_id/save",
            post(handlers::save_attachment),
        )
        .route("/api/drafts/save", post(handlers::save_draft))
        .route("/api/drafts/update/:file_id", put(handlers::update_draft))
        .route(
            "/api/drafts/download/:file_id",
            get(handlers::download_draft),
        )
        // `:id` is the job for listing and the draft file for completion
        .route("/api/drafts/:id", get(handlers::list_drafts))
        .route("/api/drafts/:id/complete", post(handlers::complete_draft))
        .route(
            "/api/backflow-pdfs/generate",
            post(handlers::generate_report),
        )
        .route(
            "/api/backflow-pdfs/generate-online-reference",
            post(handlers::generate_online_reference),
        )
        .route("/api/backflow-pdfs/:id", get(handlers::get_generated))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if development {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any);
        router.layer(cors)
    } else {
        router
    }
}
