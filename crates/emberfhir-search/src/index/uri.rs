//! URI index extraction.
//!
//! URIs compare literally in search, so values are stored verbatim apart
//! from edge trimming. No case folding: URIs are case-sensitive.

use emberfhir_core::Element;

use super::IndexError;
use super::rows::IndexUri;

/// Extract URI index rows from one element.
pub fn set_uri(
    element: &Element,
    resource_id: &str,
    parameter_id: &str,
) -> Result<Vec<IndexUri>, IndexError> {
    let raw = match element {
        Element::Uri(raw)
        | Element::Url(raw)
        | Element::Canonical(raw)
        | Element::Oid(raw)
        | Element::Uuid(raw) => raw,
        other => {
            return Err(IndexError::UnexpectedDataType {
                setter: "uri",
                datatype: other.type_name(),
                parameter_id: parameter_id.to_string(),
            });
        }
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    Ok(vec![IndexUri {
        resource_id: resource_id.to_string(),
        parameter_id: parameter_id.to_string(),
        uri: trimmed.to_string(),
    }])
}
