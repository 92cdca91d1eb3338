//! Chained parameter resolution.
//!
//! A dotted name like `subject:Patient.name` walks reference parameters
//! across resource-type boundaries: every segment but the last must be a
//! reference parameter, the last carries the request value. Resolution
//! keeps a candidate type set per hop; an explicit `:Type` segment
//! modifier pins it, otherwise the next segment's code is probed against
//! every declared target. Any segment failure abandons the whole chain
//! with a single diagnostic, never a partial chain.

use std::sync::Arc;

use emberfhir_core::fhir::is_valid_resource_type_name;

use crate::parameters::{SearchModifier, SearchParameterDefinition, SearchParameterType};
use crate::registry::SearchParameterRegistry;
use crate::values::{SearchQueryParameter, ValueError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainingError {
    #[error("malformed chained parameter '{0}'")]
    Malformed(String),

    #[error("no search parameter '{code}' on {}", targets.join(", "))]
    Unresolvable { code: String, targets: Vec<String> },

    #[error("'{code}' is not a reference parameter and cannot be chained through")]
    NotReference { code: String },

    #[error(
        "chain segment '{code}' is ambiguous across {}; qualify the reference as '{example}'",
        matches.join(", ")
    )]
    Ambiguous {
        code: String,
        matches: Vec<String>,
        example: String,
    },

    #[error("'{target}' is not a declared target type of parameter '{code}'")]
    TargetNotDeclared { target: String, code: String },

    #[error("parameter '{code}' declares no target types to chain into")]
    UndeclaredTargets { code: String },

    #[error(transparent)]
    Value(#[from] ValueError),
}

impl ChainingError {
    /// Unknown codes are a catalogue gap, reported under unsupported
    /// handling; everything else invalidates the request term.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            ChainingError::Unresolvable { .. } | ChainingError::UndeclaredTargets { .. }
        )
    }
}

/// Resolve a full chained parameter name against the registry.
///
/// `name` is the complete dotted key including segment modifiers;
/// `value` the raw request value for the terminal segment. Returns the
/// head link; the terminal constraint sits at the end of the `chained`
/// list.
pub fn resolve_chain(
    registry: &SearchParameterRegistry,
    resource_type: &str,
    name: &str,
    value: &str,
) -> Result<SearchQueryParameter, ChainingError> {
    let segments: Vec<&str> = name.split('.').collect();
    if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
        return Err(ChainingError::Malformed(name.to_string()));
    }

    let mut candidates: Vec<String> = vec![resource_type.to_string()];
    // A hop is linked once the following segment settles its target type
    let mut pending: Option<(Arc<SearchParameterDefinition>, Option<SearchModifier>)> = None;
    let mut links: Vec<SearchQueryParameter> = Vec::new();

    for (index, segment) in segments.iter().enumerate() {
        let terminal = index + 1 == segments.len();
        let (code, modifier) = match segment.split_once(':') {
            Some((code, modifier)) => (code, Some(modifier)),
            None => (*segment, None),
        };
        if code.is_empty() {
            return Err(ChainingError::Malformed(name.to_string()));
        }

        let matches: Vec<(String, Arc<SearchParameterDefinition>)> = candidates
            .iter()
            .filter_map(|t| registry.get(t, code).map(|def| (t.clone(), def)))
            .collect();

        let (found_type, definition) = match matches.len() {
            0 => {
                return Err(ChainingError::Unresolvable {
                    code: code.to_string(),
                    targets: candidates,
                });
            }
            1 => matches.into_iter().next().ok_or_else(|| {
                ChainingError::Unresolvable {
                    code: code.to_string(),
                    targets: Vec::new(),
                }
            })?,
            _ => {
                let types: Vec<String> = matches.into_iter().map(|(t, _)| t).collect();
                // The hop to qualify is the one that opened this candidate set
                let example = pending
                    .as_ref()
                    .map(|(def, _)| format!("{}:{}", def.code, types[0]))
                    .unwrap_or_else(|| format!("{}/{}", types[0], code));
                return Err(ChainingError::Ambiguous {
                    code: code.to_string(),
                    matches: types,
                    example,
                });
            }
        };

        if let Some((def, written)) = pending.take() {
            let mut link = SearchQueryParameter::chain_link(def, found_type.clone());
            link.modifier = written;
            links.push(link);
        }

        if terminal {
            let mut node = SearchQueryParameter::parse(definition, modifier, value, registry)?;
            for mut link in links.into_iter().rev() {
                link.chained = Some(Box::new(node));
                node = link;
            }
            return Ok(node);
        }

        if definition.param_type != SearchParameterType::Reference {
            return Err(ChainingError::NotReference {
                code: code.to_string(),
            });
        }

        match modifier {
            Some(requested) if is_valid_resource_type_name(requested) => {
                if !definition.target.is_empty()
                    && !definition.target.iter().any(|t| t == requested)
                {
                    return Err(ChainingError::TargetNotDeclared {
                        target: requested.to_string(),
                        code: code.to_string(),
                    });
                }
                candidates = vec![requested.to_string()];
                pending = Some((
                    definition,
                    Some(SearchModifier::Type(requested.to_string())),
                ));
            }
            Some(other) => {
                return Err(ValueError::UnknownModifier(other.to_string()).into());
            }
            None => {
                if definition.target.is_empty() {
                    return Err(ChainingError::UndeclaredTargets {
                        code: code.to_string(),
                    });
                }
                candidates = definition.target.clone();
                pending = Some((definition, None));
            }
        }
    }

    Err(ChainingError::Malformed(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::QueryValues;

    fn definition(
        id: &str,
        code: &str,
        base: &str,
        param_type: SearchParameterType,
    ) -> SearchParameterDefinition {
        SearchParameterDefinition::new(
            id,
            code,
            format!("http://example.org/SearchParameter/{id}"),
            param_type,
            vec![base.to_string()],
        )
    }

    fn registry() -> SearchParameterRegistry {
        let registry = SearchParameterRegistry::new();
        registry.register(
            definition(
                "Observation-subject",
                "subject",
                "Observation",
                SearchParameterType::Reference,
            )
            .with_targets(vec!["Patient".to_string(), "Group".to_string()]),
        );
        registry.register(definition(
            "Patient-name",
            "name",
            "Patient",
            SearchParameterType::String,
        ));
        registry.register(
            definition(
                "Patient-general-practitioner",
                "general-practitioner",
                "Patient",
                SearchParameterType::Reference,
            )
            .with_targets(vec!["Practitioner".to_string(), "Organization".to_string()]),
        );
        registry.register(
            definition(
                "Practitioner-organization",
                "organization",
                "Practitioner",
                SearchParameterType::Reference,
            )
            .with_targets(vec!["Organization".to_string()]),
        );
        registry.register(definition(
            "Organization-name",
            "name",
            "Organization",
            SearchParameterType::String,
        ));
        registry
    }

    #[test]
    fn test_two_segment_chain_with_explicit_type() {
        let head = resolve_chain(&registry(), "Observation", "subject:Patient.name", "peter")
            .unwrap();
        assert_eq!(head.definition.code, "subject");
        assert_eq!(
            head.modifier,
            Some(SearchModifier::Type("Patient".to_string()))
        );
        assert_eq!(head.target_modifier.as_deref(), Some("Patient"));

        let terminal = head.chained.as_deref().unwrap();
        assert_eq!(terminal.definition.code, "name");
        assert_eq!(terminal.raw_value, "peter");
        assert!(terminal.chained.is_none());
        let QueryValues::String(values) = &terminal.values else {
            panic!("expected string values");
        };
        assert_eq!(values[0].value, "peter");
    }

    #[test]
    fn test_single_matching_target_resolves_without_modifier() {
        // Only Patient declares 'name' among the subject targets
        let head = resolve_chain(&registry(), "Observation", "subject.name", "peter").unwrap();
        assert_eq!(head.modifier, None);
        assert_eq!(head.target_modifier.as_deref(), Some("Patient"));
    }

    #[test]
    fn test_three_segment_chain() {
        let head = resolve_chain(
            &registry(),
            "Patient",
            "general-practitioner.organization.name",
            "acme",
        )
        .unwrap();
        assert_eq!(head.definition.code, "general-practitioner");
        assert_eq!(head.target_modifier.as_deref(), Some("Practitioner"));

        let middle = head.chained.as_deref().unwrap();
        assert_eq!(middle.definition.code, "organization");
        assert_eq!(middle.target_modifier.as_deref(), Some("Organization"));

        let terminal = middle.chained.as_deref().unwrap();
        assert_eq!(terminal.definition.code, "name");
        assert_eq!(terminal.raw_value, "acme");
    }

    #[test]
    fn test_ambiguous_segment_names_correction() {
        let registry = registry();
        // Both subject targets now declare 'name'
        registry.register(definition(
            "Group-name",
            "name",
            "Group",
            SearchParameterType::String,
        ));
        let err = resolve_chain(&registry, "Observation", "subject.name", "peter").unwrap_err();
        assert_eq!(
            err,
            ChainingError::Ambiguous {
                code: "name".to_string(),
                matches: vec!["Patient".to_string(), "Group".to_string()],
                example: "subject:Patient".to_string(),
            }
        );
        assert!(!err.is_unsupported());
    }

    #[test]
    fn test_unknown_root_code_is_unsupported() {
        let err =
            resolve_chain(&registry(), "Observation", "performer.name", "x").unwrap_err();
        assert_eq!(
            err,
            ChainingError::Unresolvable {
                code: "performer".to_string(),
                targets: vec!["Observation".to_string()],
            }
        );
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_unknown_code_on_target_is_unsupported() {
        let err =
            resolve_chain(&registry(), "Observation", "subject.species", "cat").unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_non_reference_segment_rejected() {
        let err = resolve_chain(&registry(), "Patient", "name.family", "x").unwrap_err();
        assert_eq!(
            err,
            ChainingError::NotReference {
                code: "name".to_string(),
            }
        );
    }

    #[test]
    fn test_undeclared_segment_type_rejected() {
        let err = resolve_chain(
            &registry(),
            "Observation",
            "subject:Medication.code",
            "x",
        )
        .unwrap_err();
        assert_eq!(
            err,
            ChainingError::TargetNotDeclared {
                target: "Medication".to_string(),
                code: "subject".to_string(),
            }
        );
    }

    #[test]
    fn test_unrecognized_segment_modifier_rejected() {
        let err =
            resolve_chain(&registry(), "Observation", "subject:exact.name", "x").unwrap_err();
        assert_eq!(
            err,
            ChainingError::Value(ValueError::UnknownModifier("exact".to_string()))
        );
    }

    #[test]
    fn test_terminal_value_error_propagates() {
        let registry = registry();
        registry.register(definition(
            "Patient-birthdate",
            "birthdate",
            "Patient",
            SearchParameterType::Date,
        ));
        let err = resolve_chain(&registry, "Observation", "subject.birthdate", "notadate")
            .unwrap_err();
        assert!(matches!(err, ChainingError::Value(ValueError::InvalidDate(_))));
    }

    #[test]
    fn test_trailing_dot_malformed() {
        let err = resolve_chain(&registry(), "Observation", "subject.", "x").unwrap_err();
        assert_eq!(err, ChainingError::Malformed("subject.".to_string()));
    }
}
