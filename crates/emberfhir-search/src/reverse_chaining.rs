//! `_has` reverse chain resolution.
//!
//! A `_has` term selects resources that OTHERS point at: the target type
//! runs the nested constraint and its back reference must point at the
//! requesting type. Nesting recurses with the parent's target as the new
//! requesting type. Resolution failures invalidate the term; there is no
//! lenient bucket for `_has`.

use std::sync::Arc;

use emberfhir_core::fhir::is_valid_resource_type_name;

use crate::parameters::{SearchParameterDefinition, SearchParameterType};
use crate::parser::RawHasTerm;
use crate::registry::SearchParameterRegistry;
use crate::values::{SearchQueryParameter, ValueError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReverseChainError {
    #[error("'{0}' is not a resource type")]
    UnknownResourceType(String),

    #[error("no search parameter '{code}' on {resource_type}")]
    UnknownParameter { code: String, resource_type: String },

    #[error("'{code}' is not a reference parameter")]
    NotReference { code: String },

    #[error("parameter '{code}' does not reference {requesting}")]
    TargetMismatch { code: String, requesting: String },

    #[error("_has chain is missing its terminal parameter")]
    MissingTerminal,

    #[error(transparent)]
    Value(#[from] ValueError),
}

/// One resolved `_has` level.
#[derive(Debug, Clone)]
pub struct HasParameter {
    /// The resource type running the constraint.
    pub target_type: String,
    /// The reference parameter on `target_type` pointing back at the
    /// requesting type.
    pub back_reference: Arc<SearchParameterDefinition>,
    pub constraint: HasConstraint,
}

#[derive(Debug, Clone)]
pub enum HasConstraint {
    Terminal(SearchQueryParameter),
    Nested(Box<HasParameter>),
}

/// Resolve one parsed `_has` tree against the registry.
pub fn resolve_has(
    registry: &SearchParameterRegistry,
    requesting_type: &str,
    term: &RawHasTerm,
) -> Result<HasParameter, ReverseChainError> {
    if !is_valid_resource_type_name(&term.target_type) {
        return Err(ReverseChainError::UnknownResourceType(
            term.target_type.clone(),
        ));
    }

    let back_reference = registry
        .get(&term.target_type, &term.back_reference)
        .ok_or_else(|| ReverseChainError::UnknownParameter {
            code: term.back_reference.clone(),
            resource_type: term.target_type.clone(),
        })?;
    if back_reference.param_type != SearchParameterType::Reference {
        return Err(ReverseChainError::NotReference {
            code: term.back_reference.clone(),
        });
    }
    if !back_reference.target.is_empty()
        && !back_reference.target.iter().any(|t| t == requesting_type)
    {
        return Err(ReverseChainError::TargetMismatch {
            code: term.back_reference.clone(),
            requesting: requesting_type.to_string(),
        });
    }

    let constraint = if let Some(child) = &term.child {
        HasConstraint::Nested(Box::new(resolve_has(registry, &term.target_type, child)?))
    } else {
        let code = term.code.as_deref().ok_or(ReverseChainError::MissingTerminal)?;
        let value = term
            .value
            .as_deref()
            .ok_or(ReverseChainError::MissingTerminal)?;
        let definition = registry.get(&term.target_type, code).ok_or_else(|| {
            ReverseChainError::UnknownParameter {
                code: code.to_string(),
                resource_type: term.target_type.clone(),
            }
        })?;
        HasConstraint::Terminal(SearchQueryParameter::parse(
            definition, None, value, registry,
        )?)
    };

    Ok(HasParameter {
        target_type: term.target_type.clone(),
        back_reference,
        constraint,
    })
}
