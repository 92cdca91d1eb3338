//! `_include` and `_revinclude` resolution.
//!
//! Values follow `Source:code[:Target]`. A `*` in the code position
//! expands to every reference parameter on the source type, optionally
//! filtered by a declared target. Every resolution failure invalidates
//! the term: includes are structurally recognized, so there is no
//! unsupported bucket for them.

use std::sync::Arc;

use emberfhir_core::fhir::is_valid_resource_type_name;

use crate::parameters::{SearchParameterDefinition, SearchParameterType};
use crate::parser::IncludeTerm;
use crate::registry::SearchParameterRegistry;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IncludeError {
    #[error("malformed include value '{0}': expected Source:code[:Target]")]
    Malformed(String),

    #[error("'{0}' is not a resource type")]
    UnknownResourceType(String),

    #[error("no search parameter '{code}' on {resource_type}")]
    UnknownParameter { code: String, resource_type: String },

    #[error("'{code}' is not a reference parameter")]
    NotReference { code: String },

    #[error("'{target}' is not a declared target type of parameter '{code}'")]
    TargetNotDeclared { target: String, code: String },

    #[error("_revinclude target '{target}' does not match the requested type '{requesting}'")]
    RevincludeTargetMismatch { target: String, requesting: String },
}

/// One include instruction after catalogue resolution.
#[derive(Debug, Clone)]
pub struct ResolvedInclude {
    /// The type whose references are followed.
    pub source_type: String,
    pub parameter: Arc<SearchParameterDefinition>,
    /// Restricts followed references to one target type when given.
    pub target_type: Option<String>,
    pub iterate: bool,
    /// True for `_revinclude`: follow references INTO the result set.
    pub reverse: bool,
}

/// Resolve one `_include` term, expanding wildcards.
pub fn resolve_include(
    registry: &SearchParameterRegistry,
    requesting_type: &str,
    term: &IncludeTerm,
) -> Result<Vec<ResolvedInclude>, IncludeError> {
    let segments: Vec<&str> = term.raw.split(':').collect();
    match segments.as_slice() {
        ["*"] => Ok(expand_wildcard(registry, requesting_type, None, term.iterate)),
        [source, "*"] => {
            check_type_name(source)?;
            Ok(expand_wildcard(registry, source, None, term.iterate))
        }
        [source, "*", target] => {
            check_type_name(source)?;
            check_type_name(target)?;
            Ok(expand_wildcard(registry, source, Some(target), term.iterate))
        }
        [source, code] => {
            resolve_single(registry, source, code, None, term.iterate, false).map(|one| vec![one])
        }
        [source, code, target] => {
            resolve_single(registry, source, code, Some(target), term.iterate, false)
                .map(|one| vec![one])
        }
        _ => Err(IncludeError::Malformed(term.raw.clone())),
    }
}

/// Resolve one `_revinclude` term.
///
/// Wildcards are not accepted in reverse; an explicit target must name
/// the requesting type itself, anything else can never join back.
pub fn resolve_revinclude(
    registry: &SearchParameterRegistry,
    requesting_type: &str,
    term: &IncludeTerm,
) -> Result<Vec<ResolvedInclude>, IncludeError> {
    let segments: Vec<&str> = term.raw.split(':').collect();
    match segments.as_slice() {
        [source, code] if *code != "*" => {
            resolve_single(registry, source, code, None, term.iterate, true).map(|one| vec![one])
        }
        [source, code, target] if *code != "*" => {
            if target != &requesting_type {
                return Err(IncludeError::RevincludeTargetMismatch {
                    target: target.to_string(),
                    requesting: requesting_type.to_string(),
                });
            }
            resolve_single(registry, source, code, Some(target), term.iterate, true)
                .map(|one| vec![one])
        }
        _ => Err(IncludeError::Malformed(term.raw.clone())),
    }
}

fn check_type_name(name: &str) -> Result<(), IncludeError> {
    if is_valid_resource_type_name(name) {
        Ok(())
    } else {
        Err(IncludeError::UnknownResourceType(name.to_string()))
    }
}

fn resolve_single(
    registry: &SearchParameterRegistry,
    source: &str,
    code: &str,
    target: Option<&str>,
    iterate: bool,
    reverse: bool,
) -> Result<ResolvedInclude, IncludeError> {
    check_type_name(source)?;
    if code.is_empty() {
        return Err(IncludeError::Malformed(format!("{source}:{code}")));
    }
    let parameter =
        registry
            .get(source, code)
            .ok_or_else(|| IncludeError::UnknownParameter {
                code: code.to_string(),
                resource_type: source.to_string(),
            })?;
    if parameter.param_type != SearchParameterType::Reference {
        return Err(IncludeError::NotReference {
            code: code.to_string(),
        });
    }
    if let Some(target) = target {
        check_type_name(target)?;
        if !parameter.target.iter().any(|t| t == target) {
            return Err(IncludeError::TargetNotDeclared {
                target: target.to_string(),
                code: code.to_string(),
            });
        }
    }
    Ok(ResolvedInclude {
        source_type: source.to_string(),
        parameter,
        target_type: target.map(String::from),
        iterate,
        reverse,
    })
}

fn expand_wildcard(
    registry: &SearchParameterRegistry,
    source: &str,
    target: Option<&str>,
    iterate: bool,
) -> Vec<ResolvedInclude> {
    registry
        .reference_definitions_for_type(source)
        .into_iter()
        .filter(|definition| match target {
            None => true,
            Some(target) => definition.target.iter().any(|t| t == target),
        })
        .map(|parameter| ResolvedInclude {
            source_type: source.to_string(),
            parameter,
            target_type: target.map(String::from),
            iterate,
            reverse: false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(raw: &str) -> IncludeTerm {
        IncludeTerm {
            raw: raw.to_string(),
            iterate: false,
        }
    }

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
        registry.register(
            definition(
                "Observation-performer",
                "performer",
                "Observation",
                SearchParameterType::Reference,
            )
            .with_targets(vec!["Practitioner".to_string()]),
        );
        registry.register(definition(
            "Observation-code",
            "code",
            "Observation",
            SearchParameterType::Token,
        ));
        registry.register(
            definition(
                "Provenance-target",
                "target",
                "Provenance",
                SearchParameterType::Reference,
            )
            .with_targets(vec!["Patient".to_string(), "Observation".to_string()]),
        );
        registry
    }

    #[test]
    fn test_explicit_include() {
        let resolved = resolve_include(&registry(), "Observation", &term("Observation:subject"))
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].source_type, "Observation");
        assert_eq!(resolved[0].parameter.code, "subject");
        assert_eq!(resolved[0].target_type, None);
        assert!(!resolved[0].reverse);
        assert!(!resolved[0].iterate);
    }

    #[test]
    fn test_include_with_declared_target() {
        let resolved = resolve_include(
            &registry(),
            "Observation",
            &term("Observation:subject:Patient"),
        )
        .unwrap();
        assert_eq!(resolved[0].target_type.as_deref(), Some("Patient"));
    }

    #[test]
    fn test_include_target_must_be_declared() {
        let err = resolve_include(
            &registry(),
            "Observation",
            &term("Observation:subject:Medication"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            IncludeError::TargetNotDeclared {
                target: "Medication".to_string(),
                code: "subject".to_string(),
            }
        );
    }

    #[test]
    fn test_include_unknown_code() {
        let err = resolve_include(&registry(), "Observation", &term("Observation:specimen"))
            .unwrap_err();
        assert_eq!(
            err,
            IncludeError::UnknownParameter {
                code: "specimen".to_string(),
                resource_type: "Observation".to_string(),
            }
        );
    }

    #[test]
    fn test_include_must_be_reference() {
        let err = resolve_include(&registry(), "Observation", &term("Observation:code"))
            .unwrap_err();
        assert_eq!(
            err,
            IncludeError::NotReference {
                code: "code".to_string(),
            }
        );
    }

    #[test]
    fn test_bare_wildcard_expands_requesting_type() {
        let resolved = resolve_include(&registry(), "Observation", &term("*")).unwrap();
        let mut codes: Vec<&str> = resolved.iter().map(|r| r.parameter.code.as_str()).collect();
        codes.sort_unstable();
        assert_eq!(codes, ["performer", "subject"]);
    }

    #[test]
    fn test_typed_wildcard() {
        let resolved = resolve_include(&registry(), "Patient", &term("Observation:*")).unwrap();
        assert_eq!(resolved.len(), 2);
        assert!(resolved.iter().all(|r| r.source_type == "Observation"));
    }

    #[test]
    fn test_wildcard_with_target_filter() {
        let resolved = resolve_include(
            &registry(),
            "Patient",
            &term("Observation:*:Practitioner"),
        )
        .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].parameter.code, "performer");
        assert_eq!(resolved[0].target_type.as_deref(), Some("Practitioner"));
    }

    #[test]
    fn test_malformed_values() {
        let err = resolve_include(&registry(), "Observation", &term("a:b:c:d")).unwrap_err();
        assert!(matches!(err, IncludeError::Malformed(_)));
        let err = resolve_include(&registry(), "Observation", &term("")).unwrap_err();
        assert!(matches!(err, IncludeError::Malformed(_)));
        let err = resolve_include(&registry(), "Observation", &term("Observation")).unwrap_err();
        assert!(matches!(err, IncludeError::Malformed(_)));
    }

    #[test]
    fn test_revinclude() {
        let resolved = resolve_revinclude(&registry(), "Patient", &term("Provenance:target"))
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].reverse);
        assert_eq!(resolved[0].parameter.code, "target");
    }

    #[test]
    fn test_revinclude_explicit_target_must_match_requesting_type() {
        let resolved = resolve_revinclude(
            &registry(),
            "Patient",
            &term("Provenance:target:Patient"),
        )
        .unwrap();
        assert_eq!(resolved[0].target_type.as_deref(), Some("Patient"));

        let err = resolve_revinclude(
            &registry(),
            "Patient",
            &term("Provenance:target:Observation"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            IncludeError::RevincludeTargetMismatch {
                target: "Observation".to_string(),
                requesting: "Patient".to_string(),
            }
        );
    }

    #[test]
    fn test_revinclude_rejects_wildcards() {
        let err = resolve_revinclude(&registry(), "Patient", &term("*")).unwrap_err();
        assert!(matches!(err, IncludeError::Malformed(_)));
        let err = resolve_revinclude(&registry(), "Patient", &term("Provenance:*")).unwrap_err();
        assert!(matches!(err, IncludeError::Malformed(_)));
    }

    #[test]
    fn test_iterate_flag_carried() {
        let iterating = IncludeTerm {
            raw: "Observation:subject".to_string(),
            iterate: true,
        };
        let resolved = resolve_include(&registry(), "Observation", &iterating).unwrap();
        assert!(resolved[0].iterate);
    }
}
