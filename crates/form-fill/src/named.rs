//! Filling AcroForm fields by name

use crate::Result;
use pdf_core::{AcroForm, PdfDocument};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Write values into a template's interactive form fields
///
/// Empty values and unchecked boxes are skipped; names the form does not
/// contain are ignored. Viewers are asked to regenerate appearances so the
/// new values show up. Fails with
/// [`PdfError::NoAcroForm`](pdf_core::PdfError::NoAcroForm) when the
/// template has no form at all.
pub fn fill_named_fields(
    template: &[u8],
    field_values: &BTreeMap<String, String>,
    checkbox_flags: &BTreeMap<String, bool>,
) -> Result<Vec<u8>> {
    let mut doc = PdfDocument::open_from_bytes(template)?;
    let form = AcroForm::load(&doc)?;

    let mut filled = 0usize;
    for (name, value) in field_values {
        if value.is_empty() {
            continue;
        }
        match form.field(name) {
            Some(field) => {
                doc.set_text_field(field, value)?;
                filled += 1;
            }
            None => debug!(field = %name, "no such text field in template"),
        }
    }

    let mut checked = 0usize;
    for (name, _) in checkbox_flags.iter().filter(|(_, on)| **on) {
        match form.field(name) {
            Some(field) => {
                doc.check_box(field)?;
                checked += 1;
            }
            None => debug!(field = %name, "no such checkbox in template"),
        }
    }

    doc.set_need_appearances()?;
    info!(
        fields = form.fields().len(),
        filled, checked, "filled named form fields"
    );

    Ok(doc.to_bytes()?)
}
