//! Top-level search query processing.
//!
//! [`SearchQueryService`] turns a raw query string plus a resource-type
//! context into a [`SearchQueryOutcome`]: term parsing, include and
//! `_has` resolution, then catalogue lookup for every remaining
//! candidate term, dispatching dotted names to chain resolution. Valid,
//! invalid and unsupported terms land in three distinct buckets because
//! downstream policy may tolerate unsupported terms under lenient
//! handling but never tolerates invalid ones.

use std::sync::Arc;

use crate::chaining::resolve_chain;
use crate::include::{resolve_include, resolve_revinclude, ResolvedInclude};
use crate::parameters::SearchParameterType;
use crate::parser::{
    ContainedMode, ContainedTypeMode, DiscardedTerm, FhirQuery, InvalidTerm, QueryTermParser,
    SortTerm, SummaryMode,
};
use crate::registry::SearchParameterRegistry;
use crate::reverse_chaining::{resolve_has, HasParameter};
use crate::values::SearchQueryParameter;

/// A term whose name no catalogue entry covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedTerm {
    pub name: String,
    pub value: String,
}

/// Everything one search request resolved to.
#[derive(Debug, Clone)]
pub struct SearchQueryOutcome {
    pub resource_type: String,
    /// Fully resolved search constraints, chains included.
    pub parameters: Vec<SearchQueryParameter>,
    pub has: Vec<HasParameter>,
    /// Includes and revincludes, distinguished by their `reverse` flag.
    pub includes: Vec<ResolvedInclude>,
    pub count: Option<u32>,
    pub page: Option<u32>,
    pub sort: Vec<SortTerm>,
    pub contained: Option<ContainedMode>,
    pub contained_type: Option<ContainedTypeMode>,
    pub summary: Option<SummaryMode>,
    pub text: Option<String>,
    pub content: Option<String>,
    pub query: Option<String>,
    pub filter: Option<String>,
    pub invalid: Vec<InvalidTerm>,
    pub unsupported: Vec<UnsupportedTerm>,
    pub discarded: Vec<DiscardedTerm>,
}

impl SearchQueryOutcome {
    /// True when no term was recorded invalid. Unsupported terms do not
    /// count against validity.
    pub fn is_valid(&self) -> bool {
        self.invalid.is_empty()
    }
}

/// Resolves raw search requests against a parameter registry.
#[derive(Debug, Clone)]
pub struct SearchQueryService {
    registry: Arc<SearchParameterRegistry>,
}

impl SearchQueryService {
    pub fn new(registry: Arc<SearchParameterRegistry>) -> Self {
        Self { registry }
    }

    /// Process a raw query string, e.g. `name=peter&_count=10`.
    ///
    /// Percent-encoding and `+` spaces are undone here; a leading `?` is
    /// tolerated.
    pub fn process(&self, resource_type: &str, query: &str) -> SearchQueryOutcome {
        let raw = query.strip_prefix('?').unwrap_or(query);
        let terms: Vec<(String, String)> = url::form_urlencoded::parse(raw.as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        self.process_terms(resource_type, &terms)
    }

    /// Process already-split key-value pairs.
    pub fn process_terms(
        &self,
        resource_type: &str,
        terms: &[(String, String)],
    ) -> SearchQueryOutcome {
        let mut parser = QueryTermParser::new();
        parser.parse(terms);
        self.resolve(resource_type, parser.into_query())
    }

    fn resolve(&self, resource_type: &str, query: FhirQuery) -> SearchQueryOutcome {
        let FhirQuery {
            count,
            page,
            includes,
            revincludes,
            sort,
            has,
            contained,
            contained_type,
            summary,
            text,
            content,
            query: named_query,
            filter,
            residual,
            invalid,
            discarded,
        } = query;

        let mut outcome = SearchQueryOutcome {
            resource_type: resource_type.to_string(),
            parameters: Vec::new(),
            has: Vec::new(),
            includes: Vec::new(),
            count,
            page,
            sort,
            contained,
            contained_type,
            summary,
            text,
            content,
            query: named_query,
            filter,
            invalid,
            unsupported: Vec::new(),
            discarded,
        };

        for term in &includes {
            let name = if term.iterate {
                "_include:iterate"
            } else {
                "_include"
            };
            match resolve_include(&self.registry, resource_type, term) {
                Ok(resolved) => outcome.includes.extend(resolved),
                Err(error) => outcome.invalid.push(InvalidTerm {
                    name: name.to_string(),
                    value: term.raw.clone(),
                    message: error.to_string(),
                }),
            }
        }
        for term in &revincludes {
            let name = if term.iterate {
                "_revinclude:iterate"
            } else {
                "_revinclude"
            };
            match resolve_revinclude(&self.registry, resource_type, term) {
                Ok(resolved) => outcome.includes.extend(resolved),
                Err(error) => outcome.invalid.push(InvalidTerm {
                    name: name.to_string(),
                    value: term.raw.clone(),
                    message: error.to_string(),
                }),
            }
        }

        for term in &has {
            match resolve_has(&self.registry, resource_type, term) {
                Ok(resolved) => outcome.has.push(resolved),
                Err(error) => outcome.invalid.push(InvalidTerm {
                    name: term.to_string(),
                    value: term.terminal_value().unwrap_or_default().to_string(),
                    message: error.to_string(),
                }),
            }
        }

        for (name, values) in &residual {
            for value in values {
                self.resolve_candidate(resource_type, name, value, &mut outcome);
            }
        }

        tracing::debug!(
            resource_type,
            valid = outcome.parameters.len(),
            invalid = outcome.invalid.len(),
            unsupported = outcome.unsupported.len(),
            includes = outcome.includes.len(),
            "search query processed"
        );
        outcome
    }

    /// One residual term: chain dispatch on a dotted name, otherwise
    /// catalogue lookup and direct value parsing.
    fn resolve_candidate(
        &self,
        resource_type: &str,
        name: &str,
        value: &str,
        outcome: &mut SearchQueryOutcome,
    ) {
        if !name.starts_with('_') && name.contains('.') {
            match resolve_chain(&self.registry, resource_type, name, value) {
                Ok(parameter) => outcome.parameters.push(parameter),
                Err(error) if error.is_unsupported() => {
                    outcome.unsupported.push(UnsupportedTerm {
                        name: name.to_string(),
                        value: value.to_string(),
                    });
                }
                Err(error) => outcome.invalid.push(InvalidTerm {
                    name: name.to_string(),
                    value: value.to_string(),
                    message: error.to_string(),
                }),
            }
            return;
        }

        let (code, modifier) = match name.split_once(':') {
            Some((code, modifier)) => (code, Some(modifier)),
            None => (name, None),
        };
        let Some(definition) = self.registry.get(resource_type, code) else {
            outcome.unsupported.push(UnsupportedTerm {
                name: name.to_string(),
                value: value.to_string(),
            });
            return;
        };
        // Special parameters have no value grammar here; lenient handling
        // may still accept the rest of the request
        if definition.param_type == SearchParameterType::Special {
            outcome.unsupported.push(UnsupportedTerm {
                name: name.to_string(),
                value: value.to_string(),
            });
            return;
        }
        match SearchQueryParameter::parse(definition, modifier, value, &self.registry) {
            Ok(parameter) => outcome.parameters.push(parameter),
            Err(error) => outcome.invalid.push(InvalidTerm {
                name: name.to_string(),
                value: value.to_string(),
                message: error.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::register_common_parameters;
    use crate::parameters::{SearchModifier, SearchParameterDefinition};
    use crate::parser::SortDirection;
    use crate::reverse_chaining::HasConstraint;
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

    fn service() -> SearchQueryService {
        let registry = SearchParameterRegistry::new();
        register_common_parameters(&registry);
        registry.register(definition(
            "Patient-name",
            "name",
            "Patient",
            SearchParameterType::String,
        ));
        registry.register(definition(
            "Patient-birthdate",
            "birthdate",
            "Patient",
            SearchParameterType::Date,
        ));
        registry.register(
            definition(
                "Observation-subject",
                "subject",
                "Observation",
                SearchParameterType::Reference,
            )
            .with_targets(vec!["Patient".to_string()]),
        );
        registry.register(definition(
            "Observation-code",
            "code",
            "Observation",
            SearchParameterType::Token,
        ));
        registry.register(
            definition(
                "Observation-patient",
                "patient",
                "Observation",
                SearchParameterType::Reference,
            )
            .with_targets(vec!["Patient".to_string()]),
        );
        registry.register(definition(
            "Location-near",
            "near",
            "Location",
            SearchParameterType::Special,
        ));
        SearchQueryService::new(Arc::new(registry))
    }

    #[test]
    fn test_plain_terms_resolve() {
        let outcome = service().process("Patient", "name=peter&birthdate=ge2010-01-01");
        assert!(outcome.is_valid());
        assert_eq!(outcome.parameters.len(), 2);
        assert_eq!(outcome.parameters[0].definition.code, "name");
        assert_eq!(outcome.parameters[1].definition.code, "birthdate");
    }

    #[test]
    fn test_leading_question_mark_and_percent_encoding() {
        let outcome = service().process("Observation", "?code=http%3A%2F%2Floinc.org%7C1234-5");
        assert!(outcome.is_valid());
        let QueryValues::Token(values) = &outcome.parameters[0].values else {
            panic!("expected token values");
        };
        assert_eq!(values[0].system(), Some("http://loinc.org"));
        assert_eq!(values[0].code(), Some("1234-5"));
    }

    #[test]
    fn test_modifier_suffix_split() {
        let outcome = service().process("Patient", "name:exact=Peter");
        assert!(outcome.is_valid());
        assert_eq!(outcome.parameters[0].modifier, Some(SearchModifier::Exact));
    }

    #[test]
    fn test_common_parameter_applies_everywhere() {
        let outcome = service().process("Observation", "_id=abc");
        assert!(outcome.is_valid());
        assert_eq!(outcome.parameters[0].definition.code, "_id");
    }

    #[test]
    fn test_unknown_code_is_unsupported_not_invalid() {
        let outcome = service().process("Patient", "species=canine");
        assert!(outcome.is_valid());
        assert!(outcome.parameters.is_empty());
        assert_eq!(
            outcome.unsupported,
            vec![UnsupportedTerm {
                name: "species".to_string(),
                value: "canine".to_string(),
            }]
        );
    }

    #[test]
    fn test_special_parameter_is_unsupported() {
        let outcome = service().process("Location", "near=42.0|-71.0");
        assert!(outcome.is_valid());
        assert_eq!(outcome.unsupported.len(), 1);
        assert_eq!(outcome.unsupported[0].name, "near");
    }

    #[test]
    fn test_bad_value_is_invalid() {
        let outcome = service().process("Patient", "birthdate=notadate&name=ok");
        assert!(!outcome.is_valid());
        assert_eq!(outcome.parameters.len(), 1);
        assert_eq!(outcome.invalid.len(), 1);
        assert_eq!(outcome.invalid[0].name, "birthdate");
        assert_eq!(outcome.invalid[0].value, "notadate");
    }

    #[test]
    fn test_chain_dispatch() {
        let outcome = service().process("Observation", "subject.name=peter");
        assert!(outcome.is_valid());
        let head = &outcome.parameters[0];
        assert_eq!(head.definition.code, "subject");
        assert_eq!(head.target_modifier.as_deref(), Some("Patient"));
        assert_eq!(
            head.chained.as_deref().map(|c| c.definition.code.as_str()),
            Some("name")
        );
    }

    #[test]
    fn test_unresolvable_chain_is_unsupported() {
        let outcome = service().process("Observation", "subject.species=canine");
        assert!(outcome.is_valid());
        assert_eq!(outcome.unsupported.len(), 1);
        assert_eq!(outcome.unsupported[0].name, "subject.species");
    }

    #[test]
    fn test_include_resolution() {
        let outcome = service().process(
            "Observation",
            "_include=Observation:subject&_revinclude=Observation:patient",
        );
        assert!(outcome.is_valid());
        assert_eq!(outcome.includes.len(), 2);
        assert!(!outcome.includes[0].reverse);
        assert!(outcome.includes[1].reverse);
    }

    #[test]
    fn test_bad_include_is_invalid() {
        let outcome = service().process("Observation", "_include=Observation:code");
        assert!(!outcome.is_valid());
        assert_eq!(outcome.invalid[0].name, "_include");
        assert_eq!(outcome.invalid[0].value, "Observation:code");
    }

    #[test]
    fn test_has_resolution() {
        let outcome = service().process("Patient", "_has:Observation:patient:code=1234-5");
        assert!(outcome.is_valid());
        assert_eq!(outcome.has.len(), 1);
        assert_eq!(outcome.has[0].target_type, "Observation");
        assert!(matches!(
            outcome.has[0].constraint,
            HasConstraint::Terminal(_)
        ));
    }

    #[test]
    fn test_bad_has_is_invalid() {
        let outcome = service().process("Patient", "_has:Observation:code:code=1234-5");
        assert!(!outcome.is_valid());
        assert_eq!(
            outcome.invalid[0].name,
            "_has:Observation:code:code"
        );
    }

    #[test]
    fn test_result_parameters_carried_through() {
        let outcome = service().process(
            "Patient",
            "name=peter&_count=10&page=2&_sort=-birthdate&_summary=count",
        );
        assert!(outcome.is_valid());
        assert_eq!(outcome.count, Some(10));
        assert_eq!(outcome.page, Some(2));
        assert_eq!(outcome.sort[0].code, "birthdate");
        assert_eq!(outcome.sort[0].direction, SortDirection::Descending);
        assert_eq!(outcome.summary, Some(SummaryMode::Count));
    }

    #[test]
    fn test_repeated_key_yields_two_parameters() {
        let outcome = service().process("Patient", "name=peter&name=james");
        assert!(outcome.is_valid());
        assert_eq!(outcome.parameters.len(), 2);
    }

    #[test]
    fn test_problems_accumulate_across_terms() {
        let outcome = service().process(
            "Patient",
            "birthdate=notadate&species=canine&name:fuzzy=x",
        );
        assert_eq!(outcome.invalid.len(), 2);
        assert_eq!(outcome.unsupported.len(), 1);
    }
}
