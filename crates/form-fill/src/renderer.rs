//! Overlay rendering
//!
//! Turns the elements that belong to one page into an [`OverlayPage`].
//! Elements are drawn independently: one that fails is reported and the
//! rest of the page is still rendered.

use crate::schema::{
    CheckboxContent, ElementKind, PositionedElement, SignatureContent, SkippedElement,
    TextContent,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pdf_core::{split_lines, ImageXObject, OverlayPage, PdfError, StandardFont};
use thiserror::Error;
use tracing::{debug, warn};

/// Signatures are never drawn taller than this, in points
pub const SIGNATURE_MAX_HEIGHT: f64 = 60.0;
/// Space kept free between a signature and the right page edge
pub const SIGNATURE_RIGHT_MARGIN: f64 = 10.0;

const CHECK_MARK: &str = "X";
const DATA_IMAGE_PREFIX: &str = "data:image/";

/// Why an element could not be drawn
#[derive(Debug, Error)]
enum RenderError {
    #[error("signature data URI has no payload")]
    MissingPayload,

    #[error("signature is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("signature image could not be decoded: {0}")]
    Image(#[from] PdfError),

    #[error("no room for a signature at x={x} on a page {page_width}pt wide")]
    NoRoom { x: f64, page_width: f64 },
}

/// An overlay together with the elements that could not be drawn on it
#[derive(Debug, Clone)]
pub struct RenderedOverlay {
    pub overlay: OverlayPage,
    pub skipped: Vec<SkippedElement>,
}

/// Renders elements onto a page-sized overlay
pub struct OverlayRenderer {
    page_width: f64,
    page_height: f64,
}

impl OverlayRenderer {
    pub fn new(page_width: f64, page_height: f64) -> Self {
        Self {
            page_width,
            page_height,
        }
    }

    /// Render elements, each paired with its index in the request
    pub fn render<'a>(
        &self,
        elements: impl IntoIterator<Item = (usize, &'a PositionedElement)>,
    ) -> RenderedOverlay {
        let mut overlay = OverlayPage::new(self.page_width, self.page_height);
        let mut skipped = Vec::new();

        for (index, element) in elements {
            if let Err(e) = self.draw(&mut overlay, element) {
                warn!(
                    index,
                    page = element.page,
                    element_type = element.type_name(),
                    error = %e,
                    "element render error"
                );
                skipped.push(SkippedElement {
                    index,
                    page: Some(element.page),
                    element_type: element.type_name().to_string(),
                    reason: e.to_string(),
                });
            }
        }

        RenderedOverlay { overlay, skipped }
    }

    /// Convert the element's top-left y to the PDF baseline y
    fn pdf_y(&self, element: &PositionedElement) -> f64 {
        self.page_height - element.y - element.height + 1.0
    }

    fn draw(
        &self,
        overlay: &mut OverlayPage,
        element: &PositionedElement,
    ) -> Result<(), RenderError> {
        let pdf_y = self.pdf_y(element);

        match &element.kind {
            ElementKind::Text(text) | ElementKind::Date(text) | ElementKind::Timestamp(text) => {
                draw_text(overlay, text, element.x, pdf_y);
                Ok(())
            }
            ElementKind::Checkbox(checkbox) => {
                draw_checkbox(overlay, checkbox, element.x, pdf_y);
                Ok(())
            }
            ElementKind::Signature(signature) => {
                self.draw_signature(overlay, signature, element, pdf_y)
            }
            ElementKind::Unknown(tag) => {
                debug!(element_type = %tag, "ignoring unknown element type");
                Ok(())
            }
        }
    }

    fn draw_signature(
        &self,
        overlay: &mut OverlayPage,
        signature: &SignatureContent,
        element: &PositionedElement,
        pdf_y: f64,
    ) -> Result<(), RenderError> {
        let Some(uri) = signature
            .data_uri
            .as_deref()
            .filter(|uri| uri.starts_with(DATA_IMAGE_PREFIX))
        else {
            debug!(page = element.page, "signature has no image data, skipping");
            return Ok(());
        };

        let (_, payload) = uri.split_once(',').ok_or(RenderError::MissingPayload)?;
        let bytes = BASE64.decode(payload.trim())?;
        let image = ImageXObject::from_encoded(&bytes)?;

        let (width, height) = fit_signature(
            image.width,
            image.height,
            element.x,
            element.width,
            element.height,
            self.page_width,
        )
        .ok_or(RenderError::NoRoom {
            x: element.x,
            page_width: self.page_width,
        })?;

        overlay.draw_image(image, element.x, pdf_y, width, height);
        Ok(())
    }
}

/// Render one page's elements
///
/// Convenience wrapper around [`OverlayRenderer`].
pub fn render_overlay<'a>(
    elements: impl IntoIterator<Item = (usize, &'a PositionedElement)>,
    page_height: f64,
    page_width: f64,
) -> RenderedOverlay {
    OverlayRenderer::new(page_width, page_height).render(elements)
}

/// Draw text line by line, one font size apart, starting at `pdf_y`
fn draw_text(overlay: &mut OverlayPage, text: &TextContent, x: f64, pdf_y: f64) {
    for (line_index, line) in split_lines(&text.content) {
        let y = pdf_y - line_index as f64 * text.font_size as f64;
        overlay.draw_text(
            line,
            x,
            y,
            StandardFont::Helvetica,
            text.font_size,
            text.color,
        );
    }
}

fn draw_checkbox(overlay: &mut OverlayPage, checkbox: &CheckboxContent, x: f64, pdf_y: f64) {
    if checkbox.checked {
        overlay.draw_text(
            CHECK_MARK,
            x,
            pdf_y,
            StandardFont::Helvetica,
            checkbox.font_size,
            checkbox.color,
        );
    }
}

/// Size a signature to its box, keeping the image's aspect ratio
///
/// The box is clipped to the space left before the right page margin and
/// to [`SIGNATURE_MAX_HEIGHT`]. Returns `None` when no width is left.
pub fn fit_signature(
    image_width: u32,
    image_height: u32,
    x: f64,
    width: f64,
    height: f64,
    page_width: f64,
) -> Option<(f64, f64)> {
    if image_width == 0 || image_height == 0 {
        return None;
    }

    let ratio = image_width as f64 / image_height as f64;
    let max_width = width.min(page_width - x - SIGNATURE_RIGHT_MARGIN);
    let max_height = height.min(SIGNATURE_MAX_HEIGHT);

    if max_width <= 0.0 {
        return None;
    }

    if max_height > 0.0 && max_width / ratio > max_height {
        Some((max_height * ratio, max_height))
    } else {
        Some((max_width, max_width / ratio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{default_text_color, DEFAULT_FONT_SIZE};
    use image::{DynamicImage, ImageFormat, RgbaImage};
    use pdf_core::Color;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn element(y: f64, height: f64, kind: ElementKind) -> PositionedElement {
        PositionedElement {
            page: 1,
            x: 100.0,
            y,
            width: 150.0,
            height,
            kind,
        }
    }

    fn text(content: &str) -> ElementKind {
        ElementKind::Text(TextContent {
            content: content.to_string(),
            font_size: 12.0,
            color: Color::black(),
        })
    }

    fn signature_uri(width: u32, height: u32) -> String {
        let mut png = Vec::new();
        DynamicImage::ImageRgba8(RgbaImage::new(width, height))
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        format!("data:image/png;base64,{}", BASE64.encode(png))
    }

    fn content(rendered: &RenderedOverlay) -> String {
        String::from_utf8(rendered.overlay.content().to_vec()).unwrap()
    }

    #[test]
    fn test_text_position() {
        let el = element(100.0, 20.0, text("Hello"));
        let rendered = render_overlay([(0, &el)], 792.0, 612.0);

        // 792 - 100 - 20 + 1
        assert!(content(&rendered).contains("100 673 Td"));
        assert!(content(&rendered).contains("/Helv 12 Tf"));
        assert!(rendered.skipped.is_empty());
    }

    #[test]
    fn test_multiline_text_keeps_blank_line_spacing() {
        let el = element(100.0, 20.0, text("A\n\nC"));
        let rendered = render_overlay([(0, &el)], 792.0, 612.0);
        let ops = content(&rendered);

        assert!(ops.contains("100 673 Td\n<41> Tj"));
        assert!(ops.contains("100 649 Td\n<43> Tj"));
        assert_eq!(ops.matches(" Tj").count(), 2);
    }

    #[test]
    fn test_empty_text_draws_nothing() {
        let el = element(100.0, 20.0, text("   "));
        let rendered = render_overlay([(0, &el)], 792.0, 612.0);
        assert!(rendered.overlay.is_empty());
        assert!(rendered.skipped.is_empty());
    }

    #[test]
    fn test_checkbox() {
        let checked = element(
            10.0,
            20.0,
            ElementKind::Checkbox(CheckboxContent {
                checked: true,
                font_size: DEFAULT_FONT_SIZE,
                color: default_text_color(),
            }),
        );
        let rendered = render_overlay([(0, &checked)], 792.0, 612.0);
        assert!(content(&rendered).contains("<58> Tj"));

        let unchecked = element(
            10.0,
            20.0,
            ElementKind::Checkbox(CheckboxContent {
                checked: false,
                font_size: DEFAULT_FONT_SIZE,
                color: default_text_color(),
            }),
        );
        let rendered = render_overlay([(0, &unchecked)], 792.0, 612.0);
        assert!(rendered.overlay.is_empty());
    }

    #[test]
    fn test_fit_signature_height_bound() {
        // ratio 2: 150 / 2 = 75 > 50, so height wins
        assert_eq!(
            fit_signature(20, 10, 100.0, 150.0, 50.0, 612.0),
            Some((100.0, 50.0))
        );
    }

    #[test]
    fn test_fit_signature_width_bound() {
        assert_eq!(
            fit_signature(20, 10, 100.0, 80.0, 50.0, 612.0),
            Some((80.0, 40.0))
        );
    }

    #[test]
    fn test_fit_signature_caps_height_at_sixty() {
        assert_eq!(
            fit_signature(10, 10, 0.0, 200.0, 100.0, 612.0),
            Some((60.0, 60.0))
        );
    }

    #[test]
    fn test_fit_signature_clips_to_page_margin() {
        // 612 - 560 - 10 = 42 available
        assert_eq!(
            fit_signature(10, 10, 560.0, 200.0, 100.0, 612.0),
            Some((42.0, 42.0))
        );
    }

    #[test]
    fn test_fit_signature_no_room() {
        assert_eq!(fit_signature(10, 10, 605.0, 200.0, 50.0, 612.0), None);
    }

    #[test]
    fn test_signature_drawn() {
        let el = element(
            200.0,
            50.0,
            ElementKind::Signature(SignatureContent {
                data_uri: Some(signature_uri(20, 10)),
            }),
        );
        let rendered = render_overlay([(4, &el)], 792.0, 612.0);

        assert!(rendered.skipped.is_empty());
        assert_eq!(rendered.overlay.image_count(), 1);
        // 792 - 200 - 50 + 1
        assert!(content(&rendered).contains("100 0 0 50 100 543 cm"));
    }

    #[test]
    fn test_signature_without_data_uri_is_noop() {
        let el = element(
            200.0,
            50.0,
            ElementKind::Signature(SignatureContent {
                data_uri: Some("https://example.com/sig.png".to_string()),
            }),
        );
        let rendered = render_overlay([(0, &el)], 792.0, 612.0);
        assert!(rendered.overlay.is_empty());
        assert!(rendered.skipped.is_empty());
    }

    #[test]
    fn test_bad_signature_is_reported_and_others_still_drawn() {
        let bad = element(
            200.0,
            50.0,
            ElementKind::Signature(SignatureContent {
                data_uri: Some("data:image/png;base64,!!!not base64!!!".to_string()),
            }),
        );
        let good = element(100.0, 20.0, text("Still here"));
        let rendered = render_overlay([(0, &bad), (1, &good)], 792.0, 612.0);

        assert_eq!(rendered.skipped.len(), 1);
        assert_eq!(rendered.skipped[0].index, 0);
        assert_eq!(rendered.skipped[0].element_type, "signature");
        assert!(content(&rendered).contains(" Tj"));
    }

    #[test]
    fn test_signature_with_no_room_is_reported() {
        let mut el = element(
            200.0,
            50.0,
            ElementKind::Signature(SignatureContent {
                data_uri: Some(signature_uri(4, 4)),
            }),
        );
        el.x = 700.0;
        let rendered = render_overlay([(0, &el)], 792.0, 612.0);
        assert_eq!(rendered.skipped.len(), 1);
        assert!(rendered.overlay.is_empty());
    }

    #[test]
    fn test_unknown_type_ignored() {
        let el = element(0.0, 20.0, ElementKind::Unknown("stamp".to_string()));
        let rendered = render_overlay([(0, &el)], 792.0, 612.0);
        assert!(rendered.overlay.is_empty());
        assert!(rendered.skipped.is_empty());
    }
}
