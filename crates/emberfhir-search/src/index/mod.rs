//! Search index extraction.
//!
//! `ResourceIndexer` walks every search parameter definition applicable to
//! a resource, evaluates the definition's path expression through the
//! configured `PathEvaluator`, and hands the selected elements to the
//! per-type setters. The result is one `IndexOutcome` of rows grouped by
//! index table.
//!
//! Malformed values inside a resource are skipped so one bad element never
//! blocks the rest of the resource. A datatype a setter was never taught
//! is different: that is a definition/extraction mismatch and fails the
//! whole extraction.

pub mod datetime;
pub mod evaluator;
pub mod quantity;
pub mod reference;
pub mod rows;
pub mod string;
pub mod token;
pub mod uri;

pub use evaluator::{
    EvaluationError, PathEvaluator, ReferenceTypeResolver, ShapeReferenceTypeResolver,
};
pub use rows::{
    IndexDateTime, IndexOutcome, IndexQuantity, IndexReference, IndexString, IndexToken, IndexUri,
    ValueComparator,
};

pub use datetime::set_datetime;
pub use quantity::set_quantity;
pub use reference::set_reference;
pub use string::set_string;
pub use token::set_token;
pub use uri::set_uri;

use std::sync::Arc;

use emberfhir_core::{CoreError, ResourceType, ServiceBaseUrlRegistry};
use serde_json::Value;
use time::UtcOffset;

use crate::parameters::SearchParameterType;
use crate::registry::SearchParameterCatalogue;

/// Error type for index extraction.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The resource carries no `id`; rows cannot be attributed.
    #[error("resource has no id")]
    MissingResourceId,

    /// A setter received a datatype it has no mapping for.
    #[error("{setter} index cannot handle datatype '{datatype}' (parameter {parameter_id})")]
    UnexpectedDataType {
        setter: &'static str,
        datatype: &'static str,
        parameter_id: String,
    },

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Extraction settings.
#[derive(Debug, Clone, Copy)]
pub struct IndexerSettings {
    /// Offset assumed for date literals that state no timezone.
    pub local_offset: UtcOffset,
}

impl Default for IndexerSettings {
    fn default() -> Self {
        Self {
            local_offset: UtcOffset::UTC,
        }
    }
}

/// Extracts search index rows from resources.
pub struct ResourceIndexer {
    catalogue: Arc<dyn SearchParameterCatalogue>,
    evaluator: Arc<dyn PathEvaluator>,
    base_urls: Arc<dyn ServiceBaseUrlRegistry>,
    resolver: Arc<dyn ReferenceTypeResolver>,
    settings: IndexerSettings,
}

impl ResourceIndexer {
    /// Create an indexer with the default shape-based reference resolver
    /// and UTC settings.
    pub fn new(
        catalogue: Arc<dyn SearchParameterCatalogue>,
        evaluator: Arc<dyn PathEvaluator>,
        base_urls: Arc<dyn ServiceBaseUrlRegistry>,
    ) -> Self {
        Self {
            catalogue,
            evaluator,
            base_urls,
            resolver: Arc::new(ShapeReferenceTypeResolver),
            settings: IndexerSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: IndexerSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn ReferenceTypeResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Extract all index rows for one resource.
    ///
    /// Composite definitions contribute nothing directly; their component
    /// parameters index under their own definitions. Special parameters
    /// have no extraction and are logged once per resource.
    pub async fn process(
        &self,
        resource: &Value,
        resource_type: &ResourceType,
    ) -> Result<IndexOutcome, IndexError> {
        let resource_id = resource
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or(IndexError::MissingResourceId)?;

        let definitions = self.catalogue.by_resource_type(resource_type.as_str()).await;
        let mut outcome = IndexOutcome::new();

        for definition in definitions {
            match definition.param_type {
                SearchParameterType::Composite => continue,
                SearchParameterType::Special => {
                    tracing::warn!(
                        code = %definition.code,
                        "Special search parameter has no index extraction"
                    );
                    continue;
                }
                _ => {}
            }

            let Some(expression) = definition.expression.as_deref() else {
                continue;
            };

            let elements = self
                .evaluator
                .select(resource, expression, self.resolver.as_ref())?;

            for element in &elements {
                match definition.param_type {
                    SearchParameterType::Number | SearchParameterType::Quantity => {
                        outcome
                            .quantities
                            .extend(set_quantity(element, resource_id, &definition.id)?);
                    }
                    SearchParameterType::Date => {
                        outcome.datetimes.extend(set_datetime(
                            element,
                            resource_id,
                            &definition.id,
                            self.settings.local_offset,
                        )?);
                    }
                    SearchParameterType::String => {
                        outcome
                            .strings
                            .extend(set_string(element, resource_id, &definition.id)?);
                    }
                    SearchParameterType::Token => {
                        outcome
                            .tokens
                            .extend(set_token(element, resource_id, &definition.id)?);
                    }
                    SearchParameterType::Reference => {
                        outcome.references.extend(
                            set_reference(
                                element,
                                resource_id,
                                &definition.id,
                                self.base_urls.as_ref(),
                            )
                            .await?,
                        );
                    }
                    SearchParameterType::Uri => {
                        outcome
                            .uris
                            .extend(set_uri(element, resource_id, &definition.id)?);
                    }
                    SearchParameterType::Composite | SearchParameterType::Special => {}
                }
            }
        }

        tracing::debug!(
            resource_id = %resource_id,
            resource_type = %resource_type,
            rows = outcome.total(),
            "Extracted index rows"
        );
        Ok(outcome)
    }
}
