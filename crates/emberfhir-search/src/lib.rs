pub mod chaining;
pub mod common;
pub mod include;
pub mod index;
pub mod loader;
pub mod parameters;
pub mod parser;
pub mod registry;
pub mod reverse_chaining;
pub mod service;
pub mod values;

pub use chaining::{ChainingError, resolve_chain};
pub use include::{IncludeError, ResolvedInclude, resolve_include, resolve_revinclude};
pub use index::{
    EvaluationError, IndexError, IndexOutcome, IndexerSettings, PathEvaluator,
    ReferenceTypeResolver, ResourceIndexer,
};
pub use loader::{LoaderError, load_search_parameters, parse_search_parameter};
pub use parameters::{
    ComponentDefinition, DefinitionStatus, SearchComparator, SearchModifier,
    SearchParameterDefinition, SearchParameterType,
};
pub use parser::{FhirQuery, QueryTermParser};
pub use registry::{SearchParameterCatalogue, SearchParameterRegistry};
pub use reverse_chaining::{HasConstraint, HasParameter, ReverseChainError, resolve_has};
pub use service::{SearchQueryOutcome, SearchQueryService, UnsupportedTerm};
pub use values::{QueryValues, SearchQueryParameter, ValueError};
