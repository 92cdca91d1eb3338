//! Typed query value parsing.
//!
//! Every search term is interpreted against its parameter definition: the
//! modifier is matched to the type's vocabulary, comma splits the value
//! into OR alternatives, and each alternative parses under the type's
//! grammar. One malformed alternative invalidates the whole term.

pub mod composite;
pub mod date;
pub mod number;
pub mod quantity;
pub mod reference;
pub mod string;
pub mod token;
pub mod uri;

pub use composite::{ComponentValue, CompositeValue};
pub use date::DateValue;
pub use number::NumberValue;
pub use quantity::QuantityValue;
pub use reference::ReferenceValue;
pub use string::StringValue;
pub use token::TokenValue;
pub use uri::UriValue;

use std::sync::Arc;

use emberfhir_core::fhir::is_valid_resource_type_name;

use crate::parameters::{
    SearchComparator, SearchModifier, SearchParameterDefinition, SearchParameterType,
};
use crate::registry::SearchParameterRegistry;

/// Error type for query value parsing.
///
/// Messages are written for the `OperationOutcome` a client sees, so they
/// name the offending input and, where one exists, a corrective form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),

    #[error("modifier '{modifier}' does not apply to {param_type} parameters")]
    ModifierNotAllowed {
        modifier: String,
        param_type: SearchParameterType,
    },

    #[error("'{target}' is not a declared target type of parameter '{code}'")]
    TargetNotDeclared { target: String, code: String },

    #[error("comparator '{comparator}' is not allowed on parameter '{code}'")]
    ComparatorNotAllowed {
        comparator: SearchComparator,
        code: String,
    },

    #[error(":missing expects 'true' or 'false', got '{0}'")]
    InvalidMissing(String),

    #[error("invalid number value '{0}'")]
    InvalidNumber(String),

    #[error("invalid date value '{0}'")]
    InvalidDate(String),

    #[error("invalid quantity value '{0}': expected number, or number|system|code")]
    InvalidQuantity(String),

    #[error("invalid reference value '{0}'")]
    InvalidReference(String),

    #[error("empty value")]
    Empty,

    #[error(
        "reference '{raw}' could be any of {}; qualify it as '{example}'",
        .targets.join(", ")
    )]
    AmbiguousReference {
        raw: String,
        targets: Vec<String>,
        example: String,
    },

    #[error("reference '{raw}' conflicts with requested type '{target}'")]
    TypeMismatch { raw: String, target: String },

    #[error("composite value '{raw}' has {got} components, the parameter defines {expected}")]
    ComponentCount {
        raw: String,
        expected: usize,
        got: usize,
    },

    #[error("composite component '{0}' does not resolve to a known parameter")]
    UnresolvableComponent(String),

    #[error("composite component '{0}' is itself a composite")]
    NestedComposite(String),

    #[error("parameter '{0}' is a special parameter with no value grammar")]
    SpecialParameter(String),
}

/// Parsed value alternatives of one search term.
///
/// Alternatives within a variant combine as OR. `Missing` stands alone:
/// `:missing` terms never carry other values.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValues {
    Missing(bool),
    Number(Vec<NumberValue>),
    Date(Vec<DateValue>),
    String(Vec<StringValue>),
    Token(Vec<TokenValue>),
    Reference(Vec<ReferenceValue>),
    Quantity(Vec<QuantityValue>),
    Uri(Vec<UriValue>),
    Composite(Vec<CompositeValue>),
}

impl QueryValues {
    /// Number of OR alternatives.
    pub fn len(&self) -> usize {
        match self {
            QueryValues::Missing(_) => 1,
            QueryValues::Number(v) => v.len(),
            QueryValues::Date(v) => v.len(),
            QueryValues::String(v) => v.len(),
            QueryValues::Token(v) => v.len(),
            QueryValues::Reference(v) => v.len(),
            QueryValues::Quantity(v) => v.len(),
            QueryValues::Uri(v) => v.len(),
            QueryValues::Composite(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One fully parsed search term, bound to its definition.
///
/// Chained parameters form a linked list through `chained`: the head is the
/// reference parameter on the searched type, the tail the terminal value
/// parameter. `target_modifier` records which target type a chain hop
/// resolved to.
#[derive(Debug, Clone)]
pub struct SearchQueryParameter {
    pub definition: Arc<SearchParameterDefinition>,
    pub raw_value: String,
    pub modifier: Option<SearchModifier>,
    pub target_modifier: Option<String>,
    pub chained: Option<Box<SearchQueryParameter>>,
    pub values: QueryValues,
}

impl SearchQueryParameter {
    /// Parse a term's raw value against its definition.
    ///
    /// `modifier` is the suffix after ':' in the parameter name, not yet
    /// interpreted. The registry resolves composite components.
    pub fn parse(
        definition: Arc<SearchParameterDefinition>,
        modifier: Option<&str>,
        raw_value: &str,
        registry: &SearchParameterRegistry,
    ) -> Result<Self, ValueError> {
        if definition.param_type == SearchParameterType::Special {
            return Err(ValueError::SpecialParameter(definition.code.clone()));
        }

        let modifier = resolve_modifier(&definition, modifier)?;

        if modifier == Some(SearchModifier::Missing) {
            let state = match raw_value {
                "true" => true,
                "false" => false,
                other => return Err(ValueError::InvalidMissing(other.to_string())),
            };
            return Ok(Self {
                definition,
                raw_value: raw_value.to_string(),
                modifier,
                target_modifier: None,
                chained: None,
                values: QueryValues::Missing(state),
            });
        }

        if raw_value.is_empty() {
            return Err(ValueError::Empty);
        }

        // Comma separates OR alternatives for every type
        let branches: Vec<&str> = raw_value.split(',').collect();

        let values = match definition.param_type {
            SearchParameterType::Number => {
                let mut parsed = Vec::with_capacity(branches.len());
                for branch in &branches {
                    parsed.push(number::parse_branch(branch, &definition)?);
                }
                QueryValues::Number(parsed)
            }
            SearchParameterType::Date => {
                let mut parsed = Vec::with_capacity(branches.len());
                for branch in &branches {
                    parsed.push(date::parse_branch(branch, &definition)?);
                }
                QueryValues::Date(parsed)
            }
            SearchParameterType::String => {
                let mut parsed = Vec::with_capacity(branches.len());
                for branch in &branches {
                    parsed.push(string::parse_branch(branch)?);
                }
                QueryValues::String(parsed)
            }
            SearchParameterType::Token => {
                let mut parsed = Vec::with_capacity(branches.len());
                for branch in &branches {
                    parsed.push(token::parse_branch(branch)?);
                }
                QueryValues::Token(parsed)
            }
            SearchParameterType::Reference => {
                let mut parsed = Vec::with_capacity(branches.len());
                for branch in &branches {
                    parsed.push(reference::parse_branch(branch, &definition, modifier.as_ref())?);
                }
                QueryValues::Reference(parsed)
            }
            SearchParameterType::Quantity => {
                let mut parsed = Vec::with_capacity(branches.len());
                for branch in &branches {
                    parsed.push(quantity::parse_branch(branch, &definition)?);
                }
                QueryValues::Quantity(parsed)
            }
            SearchParameterType::Uri => {
                let mut parsed = Vec::with_capacity(branches.len());
                for branch in &branches {
                    parsed.push(uri::parse_branch(branch)?);
                }
                QueryValues::Uri(parsed)
            }
            SearchParameterType::Composite => {
                let mut parsed = Vec::with_capacity(branches.len());
                for branch in &branches {
                    parsed.push(composite::parse_branch(branch, &definition, registry)?);
                }
                QueryValues::Composite(parsed)
            }
            SearchParameterType::Special => unreachable!("rejected above"),
        };

        Ok(Self {
            definition,
            raw_value: raw_value.to_string(),
            modifier,
            target_modifier: None,
            chained: None,
            values,
        })
    }

    /// Build a valueless chain hop bound to `definition`, resolved to
    /// `target` as the type the chain continues on.
    pub fn chain_link(
        definition: Arc<SearchParameterDefinition>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            definition,
            raw_value: String::new(),
            modifier: None,
            target_modifier: Some(target.into()),
            chained: None,
            values: QueryValues::Reference(Vec::new()),
        }
    }

    /// True when the term carries multiple OR alternatives.
    pub fn has_logical_or(&self) -> bool {
        self.values.len() > 1
    }
}

/// Interpret a raw modifier suffix against the definition.
///
/// A suffix outside the shared vocabulary is accepted as a type modifier
/// only on reference parameters, and only when the definition declares the
/// type as a target (or declares no targets at all).
fn resolve_modifier(
    definition: &SearchParameterDefinition,
    raw: Option<&str>,
) -> Result<Option<SearchModifier>, ValueError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    if let Some(modifier) = SearchModifier::parse(raw) {
        if !modifier.applicable_to(&definition.param_type) {
            return Err(ValueError::ModifierNotAllowed {
                modifier: raw.to_string(),
                param_type: definition.param_type,
            });
        }
        return Ok(Some(modifier));
    }

    if definition.param_type == SearchParameterType::Reference
        && is_valid_resource_type_name(raw)
    {
        if !definition.target.is_empty() && !definition.target.iter().any(|t| t == raw) {
            return Err(ValueError::TargetNotDeclared {
                target: raw.to_string(),
                code: definition.code.clone(),
            });
        }
        return Ok(Some(SearchModifier::Type(raw.to_string())));
    }

    Err(ValueError::UnknownModifier(raw.to_string()))
}

/// Split a leading two-letter comparator off a branch, validating it
/// against the comparators the definition declares legal.
pub(crate) fn extract_comparator<'v>(
    branch: &'v str,
    definition: &SearchParameterDefinition,
) -> Result<(Option<SearchComparator>, &'v str), ValueError> {
    let Some(prefix) = branch.get(0..2) else {
        return Ok((None, branch));
    };
    let Some(comparator) = SearchComparator::parse(prefix) else {
        return Ok((None, branch));
    };
    if !definition.comparator.is_empty() && !definition.comparator.contains(&comparator) {
        return Err(ValueError::ComparatorNotAllowed {
            comparator,
            code: definition.code.clone(),
        });
    }
    Ok((Some(comparator), &branch[2..]))
}
