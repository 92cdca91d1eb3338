//! Evaluation seams for index extraction.
//!
//! The indexer itself never walks resource JSON: a `PathEvaluator` backend
//! turns a definition's path expression into typed elements, and a
//! `ReferenceTypeResolver` answers what a reference literal points at when
//! an expression filters on the target type.

use std::str::FromStr;

use emberfhir_core::{Element, ResourceType, parse_reference};
use serde_json::Value;

/// Error from a path evaluator backend.
#[derive(Debug, thiserror::Error)]
#[error("path evaluation failed for '{expression}': {message}")]
pub struct EvaluationError {
    pub expression: String,
    pub message: String,
}

impl EvaluationError {
    pub fn new(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            message: message.into(),
        }
    }
}

/// Evaluates a search parameter's path expression against a resource,
/// producing the elements the expression selects.
///
/// Implementations own expression parsing and caching. The resolver is
/// passed through so expressions that constrain reference targets (for
/// example `.where(resolve() is Patient)`) can answer the type question
/// without loading the target resource.
pub trait PathEvaluator: Send + Sync {
    fn select(
        &self,
        resource: &Value,
        expression: &str,
        resolver: &dyn ReferenceTypeResolver,
    ) -> Result<Vec<Element>, EvaluationError>;
}

/// Resolves the resource type a reference literal points at.
pub trait ReferenceTypeResolver: Send + Sync {
    fn resolve_type(&self, reference: &str) -> Option<ResourceType>;
}

/// Resolver that answers purely from the shape of the reference literal.
///
/// `Patient/123` and `http://example.org/fhir/Patient/123` both resolve to
/// `Patient` without any lookup. Contained and URN references resolve to
/// nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShapeReferenceTypeResolver;

impl ReferenceTypeResolver for ShapeReferenceTypeResolver {
    fn resolve_type(&self, reference: &str) -> Option<ResourceType> {
        let target = parse_reference(reference).ok()?;
        ResourceType::from_str(&target.identity().resource_type).ok()
    }
}
