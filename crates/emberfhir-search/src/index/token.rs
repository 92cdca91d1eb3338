//! Token index extraction.
//!
//! Token rows hold a lowercased system/code pair. Every row carries at
//! least one of the two; elements with no usable content produce no rows.

use emberfhir_core::Element;

use super::IndexError;
use super::rows::IndexToken;

/// Extract token index rows from one element.
///
/// A `CodeableConcept` yields one row per coding; when none of its codings
/// has content, its display text is indexed as a bare code so the concept
/// stays findable.
pub fn set_token(
    element: &Element,
    resource_id: &str,
    parameter_id: &str,
) -> Result<Vec<IndexToken>, IndexError> {
    let mut rows = Vec::new();

    match element {
        Element::Code(value) | Element::String(value) => {
            push_row(&mut rows, resource_id, parameter_id, None, non_blank_lower(value));
        }
        Element::Boolean(value) => {
            let code = if *value { "true" } else { "false" };
            push_row(&mut rows, resource_id, parameter_id, None, Some(code.to_string()));
        }
        Element::Date(raw) | Element::DateTime(raw) | Element::Instant(raw) => {
            push_row(&mut rows, resource_id, parameter_id, None, non_blank_lower(raw));
        }
        Element::Coding(coding) => {
            push_row(
                &mut rows,
                resource_id,
                parameter_id,
                coding.system.as_deref().and_then(non_blank_lower),
                coding.code.as_deref().and_then(non_blank_lower),
            );
        }
        Element::CodeableConcept(concept) => {
            for coding in &concept.coding {
                push_row(
                    &mut rows,
                    resource_id,
                    parameter_id,
                    coding.system.as_deref().and_then(non_blank_lower),
                    coding.code.as_deref().and_then(non_blank_lower),
                );
            }
            if rows.is_empty() {
                push_row(
                    &mut rows,
                    resource_id,
                    parameter_id,
                    None,
                    concept.text.as_deref().and_then(non_blank_lower),
                );
            }
        }
        Element::ContactPoint(contact) => {
            // The value carries the searchable content; a system alone is not
            // worth a row.
            if let Some(value) = contact.value.as_deref().and_then(non_blank_lower) {
                push_row(
                    &mut rows,
                    resource_id,
                    parameter_id,
                    contact.system.as_deref().and_then(non_blank_lower),
                    Some(value),
                );
            }
        }
        Element::Identifier(identifier) => {
            push_row(
                &mut rows,
                resource_id,
                parameter_id,
                identifier.system.as_deref().and_then(non_blank_lower),
                identifier.value.as_deref().and_then(non_blank_lower),
            );
        }
        other => {
            return Err(IndexError::UnexpectedDataType {
                setter: "token",
                datatype: other.type_name(),
                parameter_id: parameter_id.to_string(),
            });
        }
    }

    Ok(rows)
}

/// Append a row unless both sides are empty.
fn push_row(
    rows: &mut Vec<IndexToken>,
    resource_id: &str,
    parameter_id: &str,
    system: Option<String>,
    code: Option<String>,
) {
    if system.is_none() && code.is_none() {
        return;
    }
    rows.push(IndexToken {
        resource_id: resource_id.to_string(),
        parameter_id: parameter_id.to_string(),
        system,
        code,
    });
}

fn non_blank_lower(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}
