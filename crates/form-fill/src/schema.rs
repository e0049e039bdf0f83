//! Element and result types

use pdf_core::Color;
use serde::Serialize;

/// Page used when an element does not name one
pub const DEFAULT_PAGE: usize = 1;
/// Box width used when an element's width is absent, null or zero
pub const DEFAULT_WIDTH: f64 = 100.0;
/// Box height used when an element's height is absent, null or zero
pub const DEFAULT_HEIGHT: f64 = 20.0;
/// Font size used when an element's font size is absent, null or zero
pub const DEFAULT_FONT_SIZE: f32 = 11.0;
/// Text color used when an element does not specify one
pub const DEFAULT_TEXT_COLOR: &str = "#1e3a8a";

/// The default text color as an RGB value
pub fn default_text_color() -> Color {
    Color::from_rgb(0x1e, 0x3a, 0x8a)
}

/// A value placed at a fixed position on a page
///
/// Coordinates are in points with the origin at the top-left corner of the
/// page and y growing downward, the way the editor reports them.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedElement {
    /// 1-based page number
    pub page: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub kind: ElementKind,
}

impl PositionedElement {
    /// The element's `type` tag as sent by the editor
    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }
}

/// What an element draws
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Text(TextContent),
    Date(TextContent),
    Timestamp(TextContent),
    Checkbox(CheckboxContent),
    Signature(SignatureContent),
    /// Any other `type` tag; ignored when rendering
    Unknown(String),
}

impl ElementKind {
    pub fn type_name(&self) -> &str {
        match self {
            ElementKind::Text(_) => "text",
            ElementKind::Date(_) => "date",
            ElementKind::Timestamp(_) => "timestamp",
            ElementKind::Checkbox(_) => "checkbox",
            ElementKind::Signature(_) => "signature",
            ElementKind::Unknown(tag) => tag,
        }
    }
}

/// Text drawn line by line from the element's top edge
#[derive(Debug, Clone, PartialEq)]
pub struct TextContent {
    pub content: String,
    pub font_size: f32,
    pub color: Color,
}

/// A checkmark drawn as "X" when checked
#[derive(Debug, Clone, PartialEq)]
pub struct CheckboxContent {
    pub checked: bool,
    pub font_size: f32,
    pub color: Color,
}

/// A signature bitmap carried as a `data:image/...;base64,` URI
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureContent {
    pub data_uri: Option<String>,
}

/// An element that was not drawn, and why
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedElement {
    /// Position of the element in the request
    pub index: usize,
    pub page: Option<usize>,
    #[serde(rename = "type")]
    pub element_type: String,
    pub reason: String,
}

/// Result of stamping elements onto a document
#[derive(Debug, Clone)]
pub struct FillOutput {
    pub bytes: Vec<u8>,
    pub skipped: Vec<SkippedElement>,
}

/// Counts of elements by kind, reported back after saving a filled form
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSummary {
    pub text: usize,
    pub checkboxes: usize,
    pub checked_boxes: usize,
    pub dates: usize,
    pub signatures: usize,
}

impl ElementSummary {
    pub fn from_elements<'a>(elements: impl IntoIterator<Item = &'a PositionedElement>) -> Self {
        let mut summary = Self::default();
        for element in elements {
            match &element.kind {
                ElementKind::Text(_) => summary.text += 1,
                ElementKind::Date(_) => summary.dates += 1,
                ElementKind::Checkbox(checkbox) => {
                    summary.checkboxes += 1;
                    if checkbox.checked {
                        summary.checked_boxes += 1;
                    }
                }
                ElementKind::Signature(signature) => {
                    if signature.data_uri.as_deref().is_some_and(|uri| !uri.is_empty()) {
                        summary.signatures += 1;
                    }
                }
                ElementKind::Timestamp(_) | ElementKind::Unknown(_) => {}
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn element(kind: ElementKind) -> PositionedElement {
        PositionedElement {
            page: 1,
            x: 0.0,
            y: 0.0,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            kind,
        }
    }

    fn checkbox(checked: bool) -> ElementKind {
        ElementKind::Checkbox(CheckboxContent {
            checked,
            font_size: DEFAULT_FONT_SIZE,
            color: default_text_color(),
        })
    }

    #[test]
    fn test_type_names() {
        assert_eq!(element(checkbox(true)).type_name(), "checkbox");
        assert_eq!(
            element(ElementKind::Unknown("stamp".to_string())).type_name(),
            "stamp"
        );
    }

    #[test]
    fn test_element_summary() {
        let text = ElementKind::Text(TextContent {
            content: "hi".to_string(),
            font_size: 11.0,
            color: default_text_color(),
        });
        let elements = vec![
            element(text),
            element(checkbox(true)),
            element(checkbox(false)),
            element(ElementKind::Signature(SignatureContent {
                data_uri: Some("data:image/png;base64,AA==".to_string()),
            })),
            element(ElementKind::Signature(SignatureContent::default())),
        ];

        assert_eq!(
            ElementSummary::from_elements(&elements),
            ElementSummary {
                text: 1,
                checkboxes: 2,
                checked_boxes: 1,
                dates: 0,
                signatures: 1,
            }
        );
    }

    #[test]
    fn test_skipped_element_serializes_camel_case() {
        let skipped = SkippedElement {
            index: 3,
            page: Some(2),
            element_type: "signature".to_string(),
            reason: "bad base64".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&skipped).unwrap(),
            serde_json::json!({
                "index": 3,
                "page": 2,
                "type": "signature",
                "reason": "bad base64",
            })
        );
    }
}
