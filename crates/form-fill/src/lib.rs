//! Form Fill - stamping user-entered values onto PDF forms
//!
//! This crate provides:
//! - Positioned element types and lenient parsing from editor JSON
//! - Per-page overlay rendering (text, dates, checkmarks, signatures)
//! - The compositor that merges overlays onto every page of a source PDF
//! - Filling AcroForm fields by name
//! - The backflow test report: TCEQ field mapping, a reference-sheet
//!   fallback, and the strategy that picks between them
//!
//! # Example
//!
//! ```ignore
//! use form_fill::fill_json;
//!
//! let elements: Vec<serde_json::Value> = serde_json::from_str(elements_json)?;
//! let output = fill_json(&source_pdf, &elements)?;
//! for skipped in &output.skipped {
//!     eprintln!("element {} skipped: {}", skipped.index, skipped.reason);
//! }
//! std::fs::write("filled.pdf", output.bytes)?;
//! ```

pub mod backflow;
mod compositor;
mod named;
pub mod parser;
mod reference;
mod renderer;
mod schema;

pub use backflow::{generate_backflow_report, BackflowRecord, BackflowReport, ReportStrategy};
pub use compositor::{fill, fill_json};
pub use named::fill_named_fields;
pub use parser::{parse_element, parse_elements};
pub use reference::{render_reference_sheet, ReferenceSheet};
pub use renderer::{fit_signature, render_overlay, RenderedOverlay};
pub use schema::*;

use pdf_core::PdfError;
use thiserror::Error;

/// Errors that can occur while filling a document
#[derive(Debug, Error)]
pub enum FillError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid element at index {index}: {reason}")]
    InvalidElement { index: usize, reason: String },

    #[error("PDF error: {0}")]
    PdfError(#[from] PdfError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl FillError {
    /// True when the caller supplied bad input (as opposed to a document
    /// that could not be processed)
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            FillError::InvalidRequest(_)
                | FillError::InvalidElement { .. }
                | FillError::JsonError(_)
                | FillError::PdfError(PdfError::NotAPdf)
        )
    }

    /// True when the source document could not be parsed
    pub fn is_unreadable_document(&self) -> bool {
        matches!(
            self,
            FillError::PdfError(PdfError::OpenError(_) | PdfError::ParseError(_))
        )
    }
}

/// Result type for fill operations
pub type Result<T> = std::result::Result<T, FillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(FillError::PdfError(PdfError::NotAPdf).is_invalid_input());
        assert!(FillError::InvalidElement {
            index: 2,
            reason: "missing type".to_string()
        }
        .is_invalid_input());
        assert!(FillError::PdfError(PdfError::OpenError("bad xref".to_string()))
            .is_unreadable_document());
        assert!(!FillError::PdfError(PdfError::SaveError("disk".to_string())).is_invalid_input());
    }
}
