//! Reference parameter values.
//!
//! Accepted shapes: a bare id, `Type/id`, `Type/id/_history/vid`, or an
//! absolute URL. A bare id is resolved against the definition's declared
//! targets; when more than one target could apply the term is rejected
//! with a corrective qualified form rather than silently widened.

use emberfhir_core::reference::{is_fhir_id, parse_reference, ReferenceTarget};

use crate::parameters::{SearchModifier, SearchParameterDefinition};

use super::ValueError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceValue {
    /// Target type, when written or resolvable from the definition.
    pub resource_type: Option<String>,
    pub id: String,
    pub version: Option<String>,
    /// The full form when the branch was an absolute URL.
    pub url: Option<String>,
}

pub(super) fn parse_branch(
    branch: &str,
    definition: &SearchParameterDefinition,
    modifier: Option<&SearchModifier>,
) -> Result<ReferenceValue, ValueError> {
    let requested = match modifier {
        Some(SearchModifier::Type(name)) => Some(name.as_str()),
        _ => None,
    };

    if branch.contains('/') {
        let target = parse_reference(branch)
            .map_err(|_| ValueError::InvalidReference(branch.to_string()))?;
        let url = match &target {
            ReferenceTarget::Local(_) => None,
            ReferenceTarget::Remote { .. } => Some(branch.to_string()),
        };
        let identity = target.identity();
        if let Some(requested) = requested {
            if identity.resource_type != requested {
                return Err(ValueError::TypeMismatch {
                    raw: branch.to_string(),
                    target: requested.to_string(),
                });
            }
        }
        return Ok(ReferenceValue {
            resource_type: Some(identity.resource_type.clone()),
            id: identity.id.clone(),
            version: identity.version.clone(),
            url,
        });
    }

    if !is_fhir_id(branch) {
        return Err(ValueError::InvalidReference(branch.to_string()));
    }

    let resource_type = if let Some(requested) = requested {
        Some(requested.to_string())
    } else {
        match definition.target.as_slice() {
            [] => None,
            [only] => Some(only.clone()),
            targets => {
                return Err(ValueError::AmbiguousReference {
                    raw: branch.to_string(),
                    targets: targets.to_vec(),
                    example: format!("{}/{}", targets[0], branch),
                });
            }
        }
    };

    Ok(ReferenceValue {
        resource_type,
        id: branch.to_string(),
        version: None,
        url: None,
    })
}
