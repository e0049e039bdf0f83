//! Element JSON parsing
//!
//! The editor sends loosely typed objects: numbers may arrive as strings,
//! optional fields may be missing or `null`, and sizes of `0` mean "use the
//! default". Everything is normalised here so the renderer only sees
//! well-formed [`PositionedElement`]s.

use crate::schema::{
    default_text_color, CheckboxContent, ElementKind, PositionedElement, SignatureContent,
    SkippedElement, TextContent, DEFAULT_FONT_SIZE, DEFAULT_HEIGHT, DEFAULT_PAGE, DEFAULT_WIDTH,
};
use crate::{FillError, Result};
use pdf_core::Color;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Why a single element could not be parsed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElementError {
    /// The element is structurally invalid; the whole request is rejected
    #[error("{0}")]
    Malformed(String),

    /// The element cannot be drawn; it is skipped and reported
    #[error("{0}")]
    Unusable(String),
}

type ElementResult<T> = std::result::Result<T, ElementError>;

/// Elements ready to render, keyed by their position in the request
#[derive(Debug, Clone, Default)]
pub struct ParsedElements {
    pub elements: Vec<(usize, PositionedElement)>,
    pub skipped: Vec<SkippedElement>,
}

/// Wire shape of an element
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawElement {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    page: Value,
    #[serde(default)]
    x: Value,
    #[serde(default)]
    y: Value,
    #[serde(default)]
    width: Value,
    #[serde(default)]
    height: Value,
    #[serde(default)]
    content: Value,
    #[serde(default)]
    font_size: Value,
    #[serde(default)]
    color: Value,
}

/// Parse every element of a request
///
/// A malformed element (not an object, or no string `type`) rejects the
/// whole list. Elements that are well-formed but unusable, such as a
/// non-numeric coordinate, are reported in [`ParsedElements::skipped`].
pub fn parse_elements(values: &[Value]) -> Result<ParsedElements> {
    let mut parsed = ParsedElements::default();

    for (index, value) in values.iter().enumerate() {
        match parse_element(value) {
            Ok(element) => parsed.elements.push((index, element)),
            Err(ElementError::Malformed(reason)) => {
                return Err(FillError::InvalidElement { index, reason });
            }
            Err(ElementError::Unusable(reason)) => {
                let element_type = value
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                warn!(index, %element_type, %reason, "skipping element");
                parsed.skipped.push(SkippedElement {
                    index,
                    page: value.get("page").and_then(Value::as_u64).map(|p| p as usize),
                    element_type,
                    reason,
                });
            }
        }
    }

    Ok(parsed)
}

/// Parse a single element object
pub fn parse_element(value: &Value) -> ElementResult<PositionedElement> {
    let raw =
        RawElement::deserialize(value).map_err(|e| ElementError::Malformed(e.to_string()))?;

    let page = page_number(&raw.page)?;
    let x = number(&raw.x, "x")?.unwrap_or(0.0);
    let y = number(&raw.y, "y")?.unwrap_or(0.0);
    let width = non_zero(number(&raw.width, "width")?).unwrap_or(DEFAULT_WIDTH);
    let height = non_zero(number(&raw.height, "height")?).unwrap_or(DEFAULT_HEIGHT);

    let kind = match raw.kind.as_str() {
        "text" | "date" | "timestamp" => {
            let text = TextContent {
                content: text_content(&raw.content),
                font_size: font_size(&raw.font_size)?,
                color: parse_color(&raw.color),
            };
            match raw.kind.as_str() {
                "date" => ElementKind::Date(text),
                "timestamp" => ElementKind::Timestamp(text),
                _ => ElementKind::Text(text),
            }
        }
        "checkbox" => ElementKind::Checkbox(CheckboxContent {
            checked: is_checked(&raw.content),
            font_size: font_size(&raw.font_size)?,
            color: parse_color(&raw.color),
        }),
        "signature" => ElementKind::Signature(SignatureContent {
            data_uri: raw.content.as_str().map(str::to_string),
        }),
        _ => ElementKind::Unknown(raw.kind),
    };

    Ok(PositionedElement {
        page,
        x,
        y,
        width,
        height,
        kind,
    })
}

/// Read an optional number, accepting numeric strings
fn number(value: &Value, field: &str) -> ElementResult<Option<f64>> {
    let parsed = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(ElementError::Unusable(format!(
            "{field} is not a finite number: {value}"
        ))),
    }
}

fn non_zero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

/// Page numbers below 1 map to 0, which never matches a page
fn page_number(value: &Value) -> ElementResult<usize> {
    match number(value, "page")? {
        None => Ok(DEFAULT_PAGE),
        Some(page) if page < 1.0 => Ok(0),
        Some(page) => Ok(page.trunc() as usize),
    }
}

fn font_size(value: &Value) -> ElementResult<f32> {
    Ok(non_zero(number(value, "fontSize")?)
        .map(|size| size as f32)
        .unwrap_or(DEFAULT_FONT_SIZE))
}

/// Parse an element color
///
/// Missing or empty colors use the default text color. Colors without a
/// leading `#` are accepted; anything that is not a six-digit hex color falls
/// back to black.
pub fn parse_color(value: &Value) -> Color {
    match value {
        Value::Null => default_text_color(),
        Value::String(hex) if hex.is_empty() => default_text_color(),
        Value::String(hex) => Color::from_hex(hex).unwrap_or_else(|| {
            warn!(color = %hex, "unrecognised color, using black");
            Color::black()
        }),
        other => {
            warn!(color = %other, "unrecognised color, using black");
            Color::black()
        }
    }
}

/// Checkbox truthiness: `true`, `"true"` or the number 1
pub fn is_checked(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true",
        Value::Number(n) => n.as_f64() == Some(1.0),
        _ => false,
    }
}

/// Text to draw for a text-like element; `false` and zero draw nothing
fn text_content(value: &Value) -> String {
    match value {
        Value::Bool(false) => String::new(),
        Value::Number(n) if n.as_f64() == Some(0.0) => String::new(),
        other => value_to_string(other),
    }
}

/// Convert a JSON value to string for rendering
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
