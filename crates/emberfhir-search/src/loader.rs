//! SearchParameter loading from FHIR package content.
//!
//! This module parses SearchParameter resources (as JSON values) into the
//! internal definition type and populates a `SearchParameterRegistry`.

use serde_json::Value;

use crate::common::register_common_parameters;
use crate::parameters::{
    ComponentDefinition, DefinitionStatus, SearchComparator, SearchModifier,
    SearchParameterDefinition, SearchParameterType,
};
use crate::registry::SearchParameterRegistry;

/// Error type for search parameter loading.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// Invalid search parameter resource
    #[error("Invalid SearchParameter: {0}")]
    InvalidSearchParameter(String),
}

/// Build a registry from a collection of SearchParameter resources.
///
/// This function:
/// 1. Creates a new registry with common parameters
/// 2. Parses and registers each valid, active SearchParameter
/// 3. Skips draft and retired definitions
/// 4. Logs warnings for invalid parameters (but continues processing)
///
/// # Returns
///
/// A populated `SearchParameterRegistry`. Malformed entries never fail the
/// load as a whole.
pub fn load_search_parameters<'a, I>(resources: I) -> SearchParameterRegistry
where
    I: IntoIterator<Item = &'a Value>,
{
    let registry = SearchParameterRegistry::new();

    // Register built-in common parameters first
    register_common_parameters(&registry);

    let mut loaded_count = 0;
    let mut inactive_count = 0;
    let mut skipped_count = 0;

    for value in resources {
        match parse_search_parameter(value) {
            Ok(definition) => {
                if definition.status != DefinitionStatus::Active {
                    tracing::debug!(
                        code = %definition.code,
                        status = ?definition.status,
                        "Skipping inactive search parameter"
                    );
                    inactive_count += 1;
                    continue;
                }
                tracing::debug!(
                    code = %definition.code,
                    bases = ?definition.base,
                    param_type = ?definition.param_type,
                    "Loaded search parameter"
                );
                registry.register(definition);
                loaded_count += 1;
            }
            Err(e) => {
                let url = value.get("url").and_then(|v| v.as_str()).unwrap_or("unknown");
                tracing::warn!(
                    url = %url,
                    error = %e,
                    "Failed to parse SearchParameter, skipping"
                );
                skipped_count += 1;
            }
        }
    }

    tracing::info!(
        loaded = loaded_count,
        inactive = inactive_count,
        skipped = skipped_count,
        total = registry.len(),
        "Loaded search parameters"
    );

    registry
}

/// Parse a FHIR SearchParameter resource into our internal representation.
///
/// # Arguments
///
/// * `value` - The JSON value of the SearchParameter resource
///
/// # Returns
///
/// A `SearchParameterDefinition`, or an error if required fields are missing.
pub fn parse_search_parameter(value: &Value) -> Result<SearchParameterDefinition, LoaderError> {
    let code = value
        .get("code")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| LoaderError::InvalidSearchParameter("Missing 'code' field".into()))?
        .to_string();

    let url = value
        .get("url")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| LoaderError::InvalidSearchParameter("Missing 'url' field".into()))?
        .to_string();

    let param_type = value
        .get("type")
        .and_then(|v| v.as_str())
        .and_then(SearchParameterType::parse)
        .ok_or_else(|| {
            LoaderError::InvalidSearchParameter("Invalid or missing 'type' field".into())
        })?;

    // Logical id: explicit "id", else the tail of the canonical URL, else the code
    let id = value
        .get("id")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .or_else(|| {
            url.rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .unwrap_or_else(|| code.clone());

    let status = match value.get("status").and_then(|v| v.as_str()) {
        Some(raw) => DefinitionStatus::parse(raw).ok_or_else(|| {
            LoaderError::InvalidSearchParameter(format!("Unrecognized 'status' value '{raw}'"))
        })?,
        None => DefinitionStatus::Active,
    };

    let expression = value
        .get("expression")
        .and_then(|v| v.as_str())
        .map(String::from);

    let base: Vec<String> = value
        .get("base")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    // Base is required - at least one resource type
    if base.is_empty() {
        return Err(LoaderError::InvalidSearchParameter(
            "Missing or empty 'base' field".into(),
        ));
    }

    let target: Vec<String> = value
        .get("target")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    let modifier: Vec<SearchModifier> = value
        .get("modifier")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().and_then(SearchModifier::parse))
                .collect()
        })
        .unwrap_or_default();

    let comparator: Vec<SearchComparator> = value
        .get("comparator")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().and_then(SearchComparator::parse))
                .collect()
        })
        .unwrap_or_default();

    let component = parse_components(value)?;

    let description = value
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let mut definition =
        SearchParameterDefinition::new(id, code, url, param_type, base).with_status(status);

    if let Some(expr) = expression {
        definition = definition.with_expression(expr);
    }

    if !target.is_empty() {
        definition = definition.with_targets(target);
    }

    if !modifier.is_empty() {
        definition = definition.with_modifiers(modifier);
    }

    if !comparator.is_empty() {
        definition = definition.with_comparators(comparator);
    }

    if !component.is_empty() {
        definition = definition.with_components(component);
    }

    if !description.is_empty() {
        definition = definition.with_description(description);
    }

    Ok(definition)
}

/// Parse the `component` array of a composite definition.
///
/// A component entry missing its definition URL or expression makes the
/// whole SearchParameter unusable, so it fails the parse.
fn parse_components(value: &Value) -> Result<Vec<ComponentDefinition>, LoaderError> {
    let Some(entries) = value.get("component").and_then(|v| v.as_array()) else {
        return Ok(Vec::new());
    };

    let mut components = Vec::with_capacity(entries.len());
    for entry in entries {
        let definition = entry
            .get("definition")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                LoaderError::InvalidSearchParameter("Component missing 'definition'".into())
            })?;
        let expression = entry
            .get("expression")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                LoaderError::InvalidSearchParameter("Component missing 'expression'".into())
            })?;
        components.push(ComponentDefinition {
            definition: definition.to_string(),
            expression: expression.to_string(),
        });
    }
    Ok(components)
}
