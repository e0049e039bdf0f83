//! PDF Document wrapper

use crate::overlay::OverlayPage;
use crate::{has_pdf_magic, PdfError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

/// US Letter width in points, used when a page declares no MediaBox
pub const LETTER_WIDTH: f64 = 612.0;
/// US Letter height in points, used when a page declares no MediaBox
pub const LETTER_HEIGHT: f64 = 792.0;

/// RGB Color (values 0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create color from RGB values (0-255)
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Parse a `#RRGGBB` hex string; the leading `#` is optional
    ///
    /// Returns `None` for anything that is not exactly six hex digits.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self::from_rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Black color
    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// Visible page area in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    /// Lower-left x of the MediaBox
    pub x0: f64,
    /// Lower-left y of the MediaBox
    pub y0: f64,
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            x0: 0.0,
            y0: 0.0,
            width,
            height,
        }
    }

    /// US Letter (612 x 792)
    pub fn letter() -> Self {
        Self::new(LETTER_WIDTH, LETTER_HEIGHT)
    }
}

/// PDF Document wrapper providing high-level operations
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
    /// Counter for overlay resource names
    next_overlay: u32,
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfDocument {
    /// Create an empty document with a catalog and no pages
    pub fn new() -> Self {
        let mut inner = Document::with_version("1.7");

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Kids", Object::Array(Vec::new()));
        pages.set("Count", Object::Integer(0));
        let pages_id = inner.add_object(pages);

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = inner.add_object(catalog);
        inner.trailer.set("Root", Object::Reference(catalog_id));

        Self {
            inner,
            next_overlay: 1,
        }
    }

    /// Open a PDF document from bytes
    ///
    /// The buffer must start with the `%PDF` header; anything else is
    /// rejected with [`PdfError::NotAPdf`] before parsing is attempted.
    ///
    /// # Arguments
    /// * `data` - PDF file bytes
    pub fn open_from_bytes(data: &[u8]) -> Result<Self> {
        if !has_pdf_magic(data) {
            return Err(PdfError::NotAPdf);
        }

        let inner = Document::load_mem(data).map_err(|e| PdfError::OpenError(e.to_string()))?;

        Ok(Self {
            inner,
            next_overlay: 1,
        })
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Get a reference to the underlying lopdf document
    pub fn inner(&self) -> &Document {
        &self.inner
    }

    /// Get a mutable reference to the underlying lopdf document
    pub fn inner_mut(&mut self) -> &mut Document {
        &mut self.inner
    }

    /// Object id of a page (1-indexed)
    pub fn page_id(&self, page: usize) -> Result<ObjectId> {
        let pages = self.inner.get_pages();
        if page == 0 {
            return Err(PdfError::InvalidPage(page, pages.len()));
        }
        pages
            .get(&(page as u32))
            .copied()
            .ok_or(PdfError::InvalidPage(page, pages.len()))
    }

    /// Get the size of a page in points
    ///
    /// Reads the MediaBox, following the Parent chain for inherited values.
    /// Pages without any MediaBox are treated as US Letter.
    pub fn page_size(&self, page: usize) -> Result<PageSize> {
        let page_id = self.page_id(page)?;

        match self.inherited_entry(page_id, b"MediaBox")? {
            Some(media_box) => {
                let media_box = self.resolve(&media_box)?;
                let values = media_box
                    .as_array()
                    .map_err(|_| PdfError::ParseError("MediaBox is not an array".to_string()))?;
                page_size_from_media_box(values)
            }
            None => {
                debug!(page, "page has no MediaBox, assuming US Letter");
                Ok(PageSize::letter())
            }
        }
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;

        Ok(buffer)
    }

    /// Append a blank page of the given size
    ///
    /// # Returns
    /// New page number (1-indexed)
    pub fn add_blank_page(&mut self, width: f64, height: f64) -> Result<usize> {
        let pages_id = self.pages_root_id()?;

        let contents_id = self
            .inner
            .add_object(Stream::new(Dictionary::new(), Vec::new()));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(pages_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width as f32),
                Object::Real(height as f32),
            ]),
        );
        page_dict.set("Resources", Object::Dictionary(Dictionary::new()));
        page_dict.set("Contents", Object::Reference(contents_id));
        let new_page_id = self.inner.add_object(page_dict);

        let pages_dict = self
            .inner
            .get_object_mut(pages_id)?
            .as_dict_mut()
            .map_err(|_| PdfError::ParseError("Pages object is not a dictionary".to_string()))?;

        let mut kids = match pages_dict.get(b"Kids") {
            Ok(Object::Array(kids)) => kids.clone(),
            _ => Vec::new(),
        };
        kids.push(Object::Reference(new_page_id));
        let count = kids.len() as i64;
        pages_dict.set("Kids", Object::Array(kids));
        pages_dict.set("Count", Object::Integer(count));

        Ok(self.page_count())
    }

    /// Paint an overlay on top of a page's existing content
    ///
    /// The overlay becomes a Form XObject registered in the page resources.
    /// Existing content is wrapped in `q`/`Q` so graphics state changes made
    /// by the page cannot leak into the overlay, and the overlay is drawn
    /// last, translated to the MediaBox origin.
    pub fn apply_overlay(&mut self, page: usize, overlay: &OverlayPage) -> Result<()> {
        let page_id = self.page_id(page)?;
        let size = self.page_size(page)?;

        let form_id = overlay.embed(&mut self.inner)?;

        let mut resources = match self.inherited_entry(page_id, b"Resources")? {
            Some(resources) => self.resolve_dict(&resources)?,
            None => Dictionary::new(),
        };
        let mut xobjects = match resources.get(b"XObject") {
            Ok(xobjects) => self.resolve_dict(xobjects)?,
            Err(_) => Dictionary::new(),
        };

        let name = loop {
            let candidate = format!("TpOverlay{}", self.next_overlay);
            self.next_overlay += 1;
            if !xobjects.has(candidate.as_bytes()) {
                break candidate;
            }
        };
        xobjects.set(name.as_str(), Object::Reference(form_id));
        resources.set("XObject", Object::Dictionary(xobjects));

        let existing = self.content_references(page_id)?;

        let open_id = self
            .inner
            .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let close = format!(
            "\nQ\nq\n1 0 0 1 {} {} cm\n/{} Do\nQ\n",
            size.x0, size.y0, name
        );
        let close_id = self
            .inner
            .add_object(Stream::new(Dictionary::new(), close.into_bytes()));

        let mut contents = Vec::with_capacity(existing.len() + 2);
        contents.push(Object::Reference(open_id));
        contents.extend(existing);
        contents.push(Object::Reference(close_id));

        let page_dict = self
            .inner
            .get_object_mut(page_id)?
            .as_dict_mut()
            .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?;
        page_dict.set("Resources", Object::Dictionary(resources));
        page_dict.set("Contents", Object::Array(contents));

        Ok(())
    }

    /// Object id of the document catalog
    pub(crate) fn catalog_id(&self) -> Result<ObjectId> {
        self.inner
            .trailer
            .get(b"Root")
            .map_err(|_| PdfError::ParseError("Document trailer missing Root entry".to_string()))?
            .as_reference()
            .map_err(|_| PdfError::ParseError("Root is not a reference".to_string()))
    }

    /// Object id of the root Pages node
    fn pages_root_id(&self) -> Result<ObjectId> {
        let catalog = self.inner.get_object(self.catalog_id()?)?;
        catalog
            .as_dict()
            .map_err(|_| PdfError::ParseError("Catalog is not a dictionary".to_string()))?
            .get(b"Pages")
            .map_err(|_| PdfError::ParseError("Catalog missing Pages entry".to_string()))?
            .as_reference()
            .map_err(|_| PdfError::ParseError("Pages is not a reference".to_string()))
    }

    /// Follow a reference to its target; other objects are returned as-is
    pub(crate) fn resolve<'a>(&'a self, object: &'a Object) -> Result<&'a Object> {
        match object {
            Object::Reference(id) => Ok(self.inner.get_object(*id)?),
            other => Ok(other),
        }
    }

    /// Resolve an object that must be a dictionary and clone it
    pub(crate) fn resolve_dict(&self, object: &Object) -> Result<Dictionary> {
        self.resolve(object)?
            .as_dict()
            .cloned()
            .map_err(|_| PdfError::ParseError("Expected a dictionary".to_string()))
    }

    /// Look up a page attribute, following the Parent chain for inherited values
    fn inherited_entry(&self, page_id: ObjectId, key: &[u8]) -> Result<Option<Object>> {
        let mut current_id = page_id;

        // Follow parent chain up to 10 levels (safety limit)
        for _ in 0..10 {
            let dict = self
                .inner
                .get_object(current_id)?
                .as_dict()
                .map_err(|_| PdfError::ParseError("Object is not a dictionary".to_string()))?;

            if let Ok(value) = dict.get(key) {
                return Ok(Some(value.clone()));
            }

            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => current_id = *parent_id,
                _ => break,
            }
        }

        Ok(None)
    }

    /// Collect the page's content streams as a list of references
    ///
    /// Direct streams are moved into indirect objects so every entry can be
    /// placed in a Contents array.
    fn content_references(&mut self, page_id: ObjectId) -> Result<Vec<Object>> {
        let contents = {
            let page_dict = self
                .inner
                .get_object(page_id)?
                .as_dict()
                .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?;
            match page_dict.get(b"Contents") {
                Ok(contents) => contents.clone(),
                Err(_) => return Ok(Vec::new()),
            }
        };

        let references = match contents {
            Object::Reference(id) => match self.inner.get_object(id)? {
                Object::Array(items) => items.clone(),
                _ => vec![Object::Reference(id)],
            },
            Object::Array(items) => items,
            Object::Stream(stream) => vec![Object::Reference(self.inner.add_object(stream))],
            _ => Vec::new(),
        };

        Ok(references)
    }
}

fn page_size_from_media_box(values: &[Object]) -> Result<PageSize> {
    if values.len() < 4 {
        return Err(PdfError::ParseError("Invalid MediaBox format".to_string()));
    }

    let number = |object: &Object| -> Result<f64> {
        match object {
            Object::Integer(i) => Ok(*i as f64),
            Object::Real(r) => Ok(*r as f64),
            _ => Err(PdfError::ParseError(
                "MediaBox entry is not a number".to_string(),
            )),
        }
    };

    let (x1, y1, x2, y2) = (
        number(&values[0])?,
        number(&values[1])?,
        number(&values[2])?,
        number(&values[3])?,
    );

    Ok(PageSize {
        x0: x1.min(x2),
        y0: y1.min(y2),
        width: (x2 - x1).abs(),
        height: (y2 - y1).abs(),
    })
}
