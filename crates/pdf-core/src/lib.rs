//! PDF Core - Low-level PDF manipulation
//!
//! This crate provides functionality for:
//! - Opening PDF documents from bytes (with header validation) and saving them
//! - Reading page geometry, including inherited MediaBox entries
//! - Building overlay pages (text in the standard Helvetica faces, images)
//!   and merging them on top of existing page content
//! - Reading and filling interactive form (AcroForm) fields
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{Color, OverlayPage, PdfDocument, StandardFont};
//!
//! let mut doc = PdfDocument::open_from_bytes(&source)?;
//! let size = doc.page_size(1)?;
//! let mut overlay = OverlayPage::new(size.width, size.height);
//! overlay.draw_text("Hello, World!", 100.0, 673.0, StandardFont::Helvetica, 12.0, Color::black());
//! doc.apply_overlay(1, &overlay)?;
//! let bytes = doc.to_bytes()?;
//! ```

mod acroform;
mod document;
mod font;
mod image;
mod overlay;
mod text;

pub use acroform::{AcroForm, FieldKind, FormField};
pub use document::{Color, PageSize, PdfDocument, LETTER_HEIGHT, LETTER_WIDTH};
pub use font::{encode_win_ansi, StandardFont};
pub use image::{generate_image_operators, ImageXObject};
pub use overlay::OverlayPage;
pub use text::{generate_text_operators, split_lines, TextRenderContext};

use thiserror::Error;

/// The four bytes every PDF file starts with
pub const PDF_MAGIC: &[u8] = b"%PDF";

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Input is not a PDF document (missing %PDF header)")]
    NotAPdf,

    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("PDF parsing error: {0}")]
    ParseError(String),

    #[error("Document has no interactive form (AcroForm)")]
    NoAcroForm,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Check whether a buffer starts with the PDF header magic
pub fn has_pdf_magic(data: &[u8]) -> bool {
    data.starts_with(PDF_MAGIC)
}
