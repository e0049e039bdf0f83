//! Overlay pages
//!
//! An [`OverlayPage`] is a transparent, page-sized drawing surface that is
//! built independently of any document. Once complete it is turned into a
//! Form XObject and painted on top of an existing page with
//! [`PdfDocument::apply_overlay`](crate::PdfDocument::apply_overlay).

use crate::document::Color;
use crate::font::StandardFont;
use crate::image::{deflate, generate_image_operators, ImageXObject};
use crate::text::{generate_text_operators, TextRenderContext};
use crate::Result;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeSet;

/// A page-sized layer of text and images, in PDF user space
/// (origin at the bottom-left corner of the page)
#[derive(Debug, Clone)]
pub struct OverlayPage {
    width: f64,
    height: f64,
    content: Vec<u8>,
    fonts: BTreeSet<StandardFont>,
    images: Vec<(String, ImageXObject)>,
}

impl OverlayPage {
    /// Create an empty overlay for a page of the given size in points
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            content: Vec::new(),
            fonts: BTreeSet::new(),
            images: Vec::new(),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// True when nothing has been drawn
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Raw content stream operators drawn so far
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Number of images placed on the overlay
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Draw a single line of text with its baseline at `(x, y)`
    pub fn draw_text(
        &mut self,
        text: &str,
        x: f64,
        y: f64,
        font: StandardFont,
        font_size: f32,
        color: Color,
    ) {
        if text.is_empty() {
            return;
        }

        self.fonts.insert(font);
        let ctx = TextRenderContext {
            font_name: font.resource_name().to_string(),
            font_size,
            color,
        };
        let operators = generate_text_operators(&font.encode_text_hex(text), x, y, &ctx);
        self.content.extend_from_slice(&operators);
    }

    /// Draw an image with its lower-left corner at `(x, y)`, scaled to
    /// `width` x `height` points
    pub fn draw_image(&mut self, image: ImageXObject, x: f64, y: f64, width: f64, height: f64) {
        let name = format!("Im{}", self.images.len() + 1);
        let operators = generate_image_operators(&name, x, y, width, height);
        self.content.extend_from_slice(&operators);
        self.images.push((name, image));
    }

    /// Embed the overlay into `doc` as a Form XObject and return its id
    pub(crate) fn embed(&self, doc: &mut Document) -> Result<ObjectId> {
        let mut font_resources = Dictionary::new();
        for font in &self.fonts {
            let font_id = doc.add_object(font.to_pdf_dictionary());
            font_resources.set(font.resource_name(), Object::Reference(font_id));
        }

        let mut image_resources = Dictionary::new();
        for (name, image) in &self.images {
            let image_id = image.embed(doc);
            image_resources.set(name.as_str(), Object::Reference(image_id));
        }

        let mut resources = Dictionary::new();
        if !font_resources.is_empty() {
            resources.set("Font", Object::Dictionary(font_resources));
        }
        if !image_resources.is_empty() {
            resources.set("XObject", Object::Dictionary(image_resources));
        }

        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Form".to_vec()));
        dict.set(
            "BBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(self.width as f32),
                Object::Real(self.height as f32),
            ]),
        );
        dict.set("Resources", Object::Dictionary(resources));
        dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));

        Ok(doc.add_object(Stream::new(dict, deflate(&self.content)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_overlay_is_empty() {
        let overlay = OverlayPage::new(612.0, 792.0);
        assert!(overlay.is_empty());
        assert_eq!(overlay.width(), 612.0);
        assert_eq!(overlay.height(), 792.0);
    }

    #[test]
    fn test_draw_text_records_operators_and_font() {
        let mut overlay = OverlayPage::new(612.0, 792.0);
        overlay.draw_text("Hi", 10.0, 20.0, StandardFont::Helvetica, 11.0, Color::black());

        let content = String::from_utf8(overlay.content().to_vec()).unwrap();
        assert!(content.contains("/Helv 11 Tf"));
        assert!(content.contains("10 20 Td"));
        assert!(content.contains("<4869> Tj"));
    }

    #[test]
    fn test_draw_empty_text_is_noop() {
        let mut overlay = OverlayPage::new(612.0, 792.0);
        overlay.draw_text("", 10.0, 20.0, StandardFont::Helvetica, 11.0, Color::black());
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_draw_image_names_sequentially() {
        let image = ImageXObject::from_image(&DynamicImage::ImageRgb8(RgbImage::new(2, 1))).unwrap();
        let mut overlay = OverlayPage::new(100.0, 100.0);
        overlay.draw_image(image.clone(), 0.0, 0.0, 20.0, 10.0);
        overlay.draw_image(image, 5.0, 5.0, 20.0, 10.0);

        let content = String::from_utf8(overlay.content().to_vec()).unwrap();
        assert!(content.contains("/Im1 Do"));
        assert!(content.contains("/Im2 Do"));
        assert_eq!(overlay.image_count(), 2);
    }

    #[test]
    fn test_embed_builds_form_xobject_with_resources() {
        let mut overlay = OverlayPage::new(612.0, 792.0);
        overlay.draw_text("A", 0.0, 0.0, StandardFont::Helvetica, 11.0, Color::black());
        overlay.draw_text("B", 0.0, 0.0, StandardFont::HelveticaBold, 11.0, Color::black());

        let mut doc = Document::with_version("1.7");
        let id = overlay.embed(&mut doc).unwrap();
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();

        assert_eq!(stream.dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Form");
        let resources = stream.dict.get(b"Resources").unwrap().as_dict().unwrap();
        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.has(b"Helv"));
        assert!(fonts.has(b"HeBo"));
        assert!(!resources.has(b"XObject"));

        let decoded = stream.decompressed_content().unwrap();
        assert_eq!(decoded, overlay.content().to_vec());
    }
}
