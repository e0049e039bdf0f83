//! Stamping overlays onto a source document
//!
//! Page sizes are read up front, each page's overlay is rendered in parallel,
//! and the finished overlays are merged back in page order.

use crate::parser::parse_elements;
use crate::renderer::{render_overlay, RenderedOverlay};
use crate::schema::{FillOutput, PositionedElement, SkippedElement};
use crate::Result;
use pdf_core::{has_pdf_magic, PageSize, PdfDocument, PdfError};
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, info};

/// Stamp positioned elements onto every page of `source`
///
/// Pages without elements are left untouched. Elements that cannot be drawn
/// are listed in [`FillOutput::skipped`]; elements naming a page the
/// document does not have are ignored.
pub fn fill(source: &[u8], elements: &[PositionedElement]) -> Result<FillOutput> {
    let indexed: Vec<(usize, &PositionedElement)> = elements.iter().enumerate().collect();
    fill_indexed(source, &indexed, Vec::new())
}

/// Parse raw editor elements and stamp them onto `source`
///
/// The source header is checked before any element is looked at.
pub fn fill_json(source: &[u8], elements: &[Value]) -> Result<FillOutput> {
    if !has_pdf_magic(source) {
        return Err(PdfError::NotAPdf.into());
    }

    let parsed = parse_elements(elements)?;
    let indexed: Vec<(usize, &PositionedElement)> = parsed
        .elements
        .iter()
        .map(|(index, element)| (*index, element))
        .collect();
    fill_indexed(source, &indexed, parsed.skipped)
}

struct PageJob<'a> {
    page: usize,
    size: PageSize,
    elements: Vec<(usize, &'a PositionedElement)>,
}

fn fill_indexed(
    source: &[u8],
    elements: &[(usize, &PositionedElement)],
    mut skipped: Vec<SkippedElement>,
) -> Result<FillOutput> {
    let mut doc = PdfDocument::open_from_bytes(source)?;
    let page_count = doc.page_count();

    let mut jobs = Vec::new();
    for page in 1..=page_count {
        let on_page: Vec<(usize, &PositionedElement)> = elements
            .iter()
            .filter(|(_, element)| element.page == page)
            .copied()
            .collect();
        if on_page.is_empty() {
            continue;
        }
        jobs.push(PageJob {
            page,
            size: doc.page_size(page)?,
            elements: on_page,
        });
    }

    let off_document = elements
        .iter()
        .filter(|(_, element)| element.page == 0 || element.page > page_count)
        .count();
    if off_document > 0 {
        debug!(
            count = off_document,
            page_count, "ignoring elements placed on pages the document does not have"
        );
    }

    let rendered: Vec<(usize, RenderedOverlay)> = jobs
        .into_par_iter()
        .map(|job| {
            let overlay = render_overlay(job.elements, job.size.height, job.size.width);
            (job.page, overlay)
        })
        .collect();

    let mut stamped_pages = 0;
    for (page, result) in rendered {
        skipped.extend(result.skipped);
        if result.overlay.is_empty() {
            continue;
        }
        doc.apply_overlay(page, &result.overlay)?;
        stamped_pages += 1;
    }

    skipped.sort_by_key(|s| s.index);
    let bytes = doc.to_bytes()?;

    info!(
        page_count,
        stamped_pages,
        elements = elements.len(),
        skipped = skipped.len(),
        "filled document"
    );

    Ok(FillOutput { bytes, skipped })
}
