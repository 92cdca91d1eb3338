//! Composite parameter values.
//!
//! A composite branch joins one value per declared component with `$`,
//! all constraining the same element. Components resolve through the
//! registry by canonical URL and parse under their own type's grammar,
//! comparator prefixes included.

use std::sync::Arc;

use crate::parameters::{SearchParameterDefinition, SearchParameterType};
use crate::registry::SearchParameterRegistry;

use super::{
    date, number, quantity, reference, string, token, uri, QueryValues, ValueError,
};

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeValue {
    pub components: Vec<ComponentValue>,
}

/// One component match, bound to the parameter it resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentValue {
    pub definition: Arc<SearchParameterDefinition>,
    pub values: QueryValues,
}

pub(super) fn parse_branch(
    branch: &str,
    definition: &SearchParameterDefinition,
    registry: &SearchParameterRegistry,
) -> Result<CompositeValue, ValueError> {
    let segments: Vec<&str> = branch.split('$').collect();
    if segments.len() != definition.component.len() {
        return Err(ValueError::ComponentCount {
            raw: branch.to_string(),
            expected: definition.component.len(),
            got: segments.len(),
        });
    }

    let mut components = Vec::with_capacity(segments.len());
    for (component, segment) in definition.component.iter().zip(segments) {
        let Some(sub) = registry.get_by_url(&component.definition) else {
            return Err(ValueError::UnresolvableComponent(
                component.definition.clone(),
            ));
        };

        let values = match sub.param_type {
            SearchParameterType::Number => {
                QueryValues::Number(vec![number::parse_branch(segment, &sub)?])
            }
            SearchParameterType::Date => {
                QueryValues::Date(vec![date::parse_branch(segment, &sub)?])
            }
            SearchParameterType::String => {
                QueryValues::String(vec![string::parse_branch(segment)?])
            }
            SearchParameterType::Token => {
                QueryValues::Token(vec![token::parse_branch(segment)?])
            }
            SearchParameterType::Reference => {
                QueryValues::Reference(vec![reference::parse_branch(segment, &sub, None)?])
            }
            SearchParameterType::Quantity => {
                QueryValues::Quantity(vec![quantity::parse_branch(segment, &sub)?])
            }
            SearchParameterType::Uri => QueryValues::Uri(vec![uri::parse_branch(segment)?]),
            SearchParameterType::Composite => {
                return Err(ValueError::NestedComposite(sub.code.clone()));
            }
            SearchParameterType::Special => {
                return Err(ValueError::SpecialParameter(sub.code.clone()));
            }
        };

        components.push(ComponentValue {
            definition: sub,
            values,
        });
    }

    Ok(CompositeValue { components })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::ComponentDefinition;
    use crate::values::TokenValue;
    use rust_decimal::Decimal;

    const CODE_URL: &str = "http://hl7.org/fhir/SearchParameter/clinical-code";
    const VALUE_URL: &str = "http://hl7.org/fhir/SearchParameter/Observation-value-quantity";

    fn registry() -> SearchParameterRegistry {
        let registry = SearchParameterRegistry::new();
        registry.register(SearchParameterDefinition::new(
            "clinical-code",
            "code",
            CODE_URL,
            SearchParameterType::Token,
            vec!["Observation".to_string()],
        ));
        registry.register(SearchParameterDefinition::new(
            "Observation-value-quantity",
            "value-quantity",
            VALUE_URL,
            SearchParameterType::Quantity,
            vec!["Observation".to_string()],
        ));
        registry
    }

    fn definition() -> SearchParameterDefinition {
        SearchParameterDefinition::new(
            "Observation-code-value-quantity",
            "code-value-quantity",
            "http://hl7.org/fhir/SearchParameter/Observation-code-value-quantity",
            SearchParameterType::Composite,
            vec!["Observation".to_string()],
        )
        .with_components(vec![
            ComponentDefinition {
                definition: CODE_URL.to_string(),
                expression: "code".to_string(),
            },
            ComponentDefinition {
                definition: VALUE_URL.to_string(),
                expression: "value.ofType(Quantity)".to_string(),
            },
        ])
    }

    #[test]
    fn test_two_component_branch() {
        let value = parse_branch(
            "http://loinc.org|8480-6$lt60",
            &definition(),
            &registry(),
        )
        .unwrap();
        assert_eq!(value.components.len(), 2);

        let QueryValues::Token(codes) = &value.components[0].values else {
            panic!("expected token component");
        };
        assert_eq!(codes[0].code(), Some("8480-6"));

        let QueryValues::Quantity(quantities) = &value.components[1].values else {
            panic!("expected quantity component");
        };
        assert_eq!(quantities[0].value, Decimal::new(60, 0));
        assert!(quantities[0].comparator.is_some());
    }

    #[test]
    fn test_component_count_mismatch() {
        let err = parse_branch("8480-6", &definition(), &registry()).unwrap_err();
        assert_eq!(
            err,
            ValueError::ComponentCount {
                raw: "8480-6".to_string(),
                expected: 2,
                got: 1,
            }
        );
    }

    #[test]
    fn test_unresolvable_component() {
        let err = parse_branch("8480-6$60", &definition(), &SearchParameterRegistry::new())
            .unwrap_err();
        assert_eq!(
            err,
            ValueError::UnresolvableComponent(CODE_URL.to_string())
        );
    }

    #[test]
    fn test_nested_composite_rejected() {
        let registry = registry();
        registry.register(
            SearchParameterDefinition::new(
                "inner-composite",
                "inner",
                "http://example.org/SearchParameter/inner",
                SearchParameterType::Composite,
                vec!["Observation".to_string()],
            ),
        );
        let definition = SearchParameterDefinition::new(
            "outer-composite",
            "outer",
            "http://example.org/SearchParameter/outer",
            SearchParameterType::Composite,
            vec!["Observation".to_string()],
        )
        .with_components(vec![ComponentDefinition {
            definition: "http://example.org/SearchParameter/inner".to_string(),
            expression: "component".to_string(),
        }]);

        let err = parse_branch("anything", &definition, &registry).unwrap_err();
        assert_eq!(err, ValueError::NestedComposite("inner".to_string()));
    }

    #[test]
    fn test_component_value_error_surfaces() {
        let err = parse_branch(
            "http://loinc.org|8480-6$notanumber",
            &definition(),
            &registry(),
        )
        .unwrap_err();
        assert!(matches!(err, ValueError::InvalidQuantity(_)));
    }

    #[test]
    fn test_token_value_shape() {
        let value = parse_branch("8480-6$60", &definition(), &registry()).unwrap();
        let QueryValues::Token(codes) = &value.components[0].values else {
            panic!("expected token component");
        };
        assert_eq!(
            codes[0],
            TokenValue::Code {
                code: "8480-6".to_string()
            }
        );
    }
}
