//! Interactive form (AcroForm) fields
//!
//! Fields are discovered by walking the catalog's `/AcroForm /Fields` tree.
//! Each terminal field is addressable by its fully-qualified name
//! (`parent.child`) or by its own partial name.

use crate::document::PdfDocument;
use crate::{PdfError, Result};
use lopdf::{Dictionary, Object, ObjectId, StringFormat};
use std::collections::BTreeMap;
use tracing::debug;

/// Nesting limit for the field tree
const MAX_FIELD_DEPTH: usize = 32;

/// On-state name used when a checkbox declares no appearance states
const DEFAULT_ON_STATE: &[u8] = b"Yes";

/// Field type from `/FT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Button,
    Choice,
    Signature,
    Unknown,
}

impl FieldKind {
    fn from_name(name: &[u8]) -> Self {
        match name {
            b"Tx" => FieldKind::Text,
            b"Btn" => FieldKind::Button,
            b"Ch" => FieldKind::Choice,
            b"Sig" => FieldKind::Signature,
            _ => FieldKind::Unknown,
        }
    }
}

/// A terminal form field
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    /// Object id of the field dictionary
    pub id: ObjectId,
    /// Fully-qualified name (`parent.child`)
    pub name: String,
    /// The field's own `/T`
    pub partial_name: String,
    pub kind: FieldKind,
    /// Widget annotations for the field; the field itself when merged
    pub widgets: Vec<ObjectId>,
}

/// Snapshot of a document's form fields
#[derive(Debug, Clone, Default)]
pub struct AcroForm {
    fields: Vec<FormField>,
    by_name: BTreeMap<String, usize>,
}

impl AcroForm {
    /// Read the field tree of a document
    ///
    /// Returns [`PdfError::NoAcroForm`] when the catalog has no `/AcroForm`
    /// or the form has no `/Fields` array.
    pub fn load(doc: &PdfDocument) -> Result<Self> {
        let acroform = acroform_dict(doc)?.ok_or(PdfError::NoAcroForm)?;
        let fields = match acroform.get(b"Fields") {
            Ok(fields) => doc
                .resolve(fields)?
                .as_array()
                .map_err(|_| PdfError::NoAcroForm)?
                .clone(),
            Err(_) => return Err(PdfError::NoAcroForm),
        };

        let mut form = AcroForm::default();
        for field in &fields {
            if let Object::Reference(id) = field {
                form.walk(doc, *id, "", None, 0)?;
            }
        }

        // Partial names are a fallback; fully-qualified names win
        for index in 0..form.fields.len() {
            let partial = form.fields[index].partial_name.clone();
            form.by_name.entry(partial).or_insert(index);
        }

        debug!(fields = form.fields.len(), "loaded AcroForm");
        Ok(form)
    }

    fn walk(
        &mut self,
        doc: &PdfDocument,
        id: ObjectId,
        parent_name: &str,
        inherited_kind: Option<FieldKind>,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_FIELD_DEPTH {
            return Err(PdfError::ParseError(
                "AcroForm field tree is too deep".to_string(),
            ));
        }

        let dict = doc
            .inner()
            .get_object(id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Form field is not a dictionary".to_string()))?;

        let Some(partial_name) = dict.get(b"T").ok().and_then(decode_text_string) else {
            return Ok(());
        };
        let name = if parent_name.is_empty() {
            partial_name.clone()
        } else {
            format!("{parent_name}.{partial_name}")
        };
        let kind = match dict.get(b"FT") {
            Ok(Object::Name(ft)) => Some(FieldKind::from_name(ft)),
            _ => inherited_kind,
        };

        let kids: Vec<ObjectId> = match dict.get(b"Kids") {
            Ok(kids) => doc
                .resolve(kids)?
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item.as_reference().ok())
                        .collect()
                })
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        };

        let (child_fields, widgets): (Vec<ObjectId>, Vec<ObjectId>) =
            kids.into_iter().partition(|kid| {
                doc.inner()
                    .get_object(*kid)
                    .ok()
                    .and_then(|object| object.as_dict().ok())
                    .is_some_and(|kid_dict| kid_dict.has(b"T"))
            });

        if !child_fields.is_empty() {
            for child in child_fields {
                self.walk(doc, child, &name, kind, depth + 1)?;
            }
            if widgets.is_empty() {
                return Ok(());
            }
        }

        let widgets = if widgets.is_empty() { vec![id] } else { widgets };
        let index = self.fields.len();
        self.by_name.insert(name.clone(), index);
        self.fields.push(FormField {
            id,
            name,
            partial_name,
            kind: kind.unwrap_or(FieldKind::Unknown),
            widgets,
        });

        Ok(())
    }

    /// All terminal fields in document order
    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    /// Find a field by fully-qualified or partial name
    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.by_name.get(name).map(|&index| &self.fields[index])
    }
}

impl PdfDocument {
    /// Set the value of a text field
    ///
    /// Existing appearance streams are dropped so viewers regenerate them
    /// from the new value; see [`PdfDocument::set_need_appearances`].
    pub fn set_text_field(&mut self, field: &FormField, value: &str) -> Result<()> {
        let field_dict = dict_mut(self, field.id)?;
        field_dict.set("V", text_string(value));
        field_dict.remove(b"AP");

        for widget in &field.widgets {
            if *widget != field.id {
                dict_mut(self, *widget)?.remove(b"AP");
            }
        }

        Ok(())
    }

    /// Turn a checkbox on
    ///
    /// The on-state is the first non-`Off` name in a widget's normal
    /// appearance dictionary, or `Yes` when none is declared.
    pub fn check_box(&mut self, field: &FormField) -> Result<()> {
        let mut on_state = None;
        let mut widget_states = Vec::with_capacity(field.widgets.len());
        for widget in &field.widgets {
            let states = self.appearance_states(*widget)?;
            if on_state.is_none() {
                on_state = states.iter().find(|s| s.as_slice() != b"Off").cloned();
            }
            widget_states.push((*widget, states));
        }
        let on_state = on_state.unwrap_or_else(|| DEFAULT_ON_STATE.to_vec());

        dict_mut(self, field.id)?.set("V", Object::Name(on_state.clone()));
        for (widget, states) in widget_states {
            let state = if states.is_empty() || states.contains(&on_state) {
                on_state.clone()
            } else {
                b"Off".to_vec()
            };
            dict_mut(self, widget)?.set("AS", Object::Name(state));
        }

        Ok(())
    }

    /// Ask viewers to regenerate field appearances from their values
    pub fn set_need_appearances(&mut self) -> Result<()> {
        let catalog_id = self.catalog_id()?;
        let acroform = dict_mut(self, catalog_id)?
            .get(b"AcroForm")
            .map_err(|_| PdfError::NoAcroForm)?
            .clone();

        match acroform {
            Object::Reference(id) => {
                dict_mut(self, id)?.set("NeedAppearances", Object::Boolean(true));
            }
            Object::Dictionary(mut dict) => {
                dict.set("NeedAppearances", Object::Boolean(true));
                dict_mut(self, catalog_id)?.set("AcroForm", Object::Dictionary(dict));
            }
            _ => return Err(PdfError::NoAcroForm),
        }

        Ok(())
    }

    /// Names of a widget's normal appearance states
    fn appearance_states(&self, widget: ObjectId) -> Result<Vec<Vec<u8>>> {
        let dict = self
            .inner()
            .get_object(widget)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Widget is not a dictionary".to_string()))?;

        let Ok(ap) = dict.get(b"AP") else {
            return Ok(Vec::new());
        };
        let ap = self.resolve_dict(ap)?;
        let Ok(normal) = ap.get(b"N") else {
            return Ok(Vec::new());
        };

        match self.resolve(normal)? {
            Object::Dictionary(states) => Ok(states.iter().map(|(k, _)| k.clone()).collect()),
            _ => Ok(Vec::new()),
        }
    }
}

fn acroform_dict(doc: &PdfDocument) -> Result<Option<Dictionary>> {
    let catalog = doc
        .inner()
        .get_object(doc.catalog_id()?)?
        .as_dict()
        .map_err(|_| PdfError::ParseError("Catalog is not a dictionary".to_string()))?;

    match catalog.get(b"AcroForm") {
        Ok(acroform) => Ok(doc.resolve(acroform)?.as_dict().ok().cloned()),
        Err(_) => Ok(None),
    }
}

fn dict_mut(doc: &mut PdfDocument, id: ObjectId) -> Result<&mut Dictionary> {
    doc.inner_mut()
        .get_object_mut(id)?
        .as_dict_mut()
        .map_err(|_| PdfError::ParseError("Expected a dictionary".to_string()))
}

/// Encode a field value as a PDF text string
///
/// Plain ASCII is written as a literal string; anything else as UTF-16BE
/// with a byte order mark.
fn text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::String(value.as_bytes().to_vec(), StringFormat::Literal);
    }

    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Decode a PDF text string (UTF-16BE with BOM, or PDFDocEncoding)
fn decode_text_string(object: &Object) -> Option<String> {
    let Object::String(bytes, _) = object else {
        return None;
    };

    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return Some(String::from_utf16_lossy(&units));
    }

    // PDFDocEncoding matches Latin-1 for the printable range
    Some(bytes.iter().map(|&b| b as char).collect())
}
