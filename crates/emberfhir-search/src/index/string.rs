//! String index extraction.
//!
//! Values are folded for case- and accent-insensitive matching: NFD
//! decomposition, combining marks dropped, lowercased, edge-trimmed and
//! length-capped. Interior whitespace is preserved as written.

use emberfhir_core::Element;
use emberfhir_core::element::{Address, HumanName};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use super::IndexError;
use super::rows::IndexString;

/// Cap on stored value length, in characters.
const MAX_VALUE_LENGTH: usize = 450;

/// Extract string index rows from one element.
///
/// `HumanName` and `Address` produce a single row joining their parts, so a
/// search across part boundaries ("peter chalmers") still matches. Elements
/// with no usable text produce no rows. `base64Binary` is never indexable
/// and is skipped without error.
pub fn set_string(
    element: &Element,
    resource_id: &str,
    parameter_id: &str,
) -> Result<Vec<IndexString>, IndexError> {
    let raw = match element {
        Element::String(value) | Element::Markdown(value) => Some(value.clone()),
        Element::HumanName(name) => Some(human_name_text(name)),
        Element::Address(address) => Some(address_text(address)),
        Element::Annotation(annotation) => annotation.text.clone(),
        Element::Base64Binary(_) => None,
        other => {
            return Err(IndexError::UnexpectedDataType {
                setter: "string",
                datatype: other.type_name(),
                parameter_id: parameter_id.to_string(),
            });
        }
    };

    let Some(value) = raw.as_deref().and_then(normalize_string_value) else {
        return Ok(Vec::new());
    };

    Ok(vec![IndexString {
        resource_id: resource_id.to_string(),
        parameter_id: parameter_id.to_string(),
        value,
    }])
}

/// Fold a raw value for index storage. Blank values normalize to nothing.
fn normalize_string_value(raw: &str) -> Option<String> {
    let folded: String = raw
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();
    let trimmed = folded.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_VALUE_LENGTH).collect())
}

/// Join name parts in reading order: prefixes, given names, family,
/// suffixes, then the assembled text if present.
fn human_name_text(name: &HumanName) -> String {
    let mut parts: Vec<&str> = Vec::new();
    parts.extend(name.prefix.iter().map(String::as_str));
    parts.extend(name.given.iter().map(String::as_str));
    if let Some(family) = &name.family {
        parts.push(family);
    }
    parts.extend(name.suffix.iter().map(String::as_str));
    if let Some(text) = &name.text {
        parts.push(text);
    }
    parts.join(" ")
}

/// Join address parts from most to least specific.
fn address_text(address: &Address) -> String {
    let mut parts: Vec<&str> = Vec::new();
    parts.extend(address.line.iter().map(String::as_str));
    for field in [
        &address.city,
        &address.district,
        &address.state,
        &address.postal_code,
        &address.country,
        &address.text,
    ] {
        if let Some(value) = field {
            parts.push(value);
        }
    }
    parts.join(" ")
}
