//! Common search parameters that apply to all FHIR resources.
//!
//! These parameters are defined in the FHIR specification and are available
//! for all resource types. They are registered before loading package-specific
//! search parameters.

use crate::parameters::{SearchParameterDefinition, SearchParameterType};
use crate::registry::SearchParameterRegistry;

/// Register all common (Resource-level) search parameters.
///
/// These parameters are available for all resource types as defined
/// in the FHIR specification. They are registered with base "Resource"
/// so they apply universally.
///
/// `_text` and `_content` are deliberately absent: the query parser
/// captures them verbatim as whole-resource text expressions, so they
/// never go through definition lookup.
pub fn register_common_parameters(registry: &SearchParameterRegistry) {
    // _id - logical id of the resource
    registry.register(
        SearchParameterDefinition::new(
            "Resource-id",
            "_id",
            "http://hl7.org/fhir/SearchParameter/Resource-id",
            SearchParameterType::Token,
            vec!["Resource".to_string()],
        )
        .with_expression("Resource.id")
        .with_description("Logical id of this artifact"),
    );

    // _lastUpdated - when the resource was last changed
    registry.register(
        SearchParameterDefinition::new(
            "Resource-lastUpdated",
            "_lastUpdated",
            "http://hl7.org/fhir/SearchParameter/Resource-lastUpdated",
            SearchParameterType::Date,
            vec!["Resource".to_string()],
        )
        .with_expression("Resource.meta.lastUpdated")
        .with_description("When the resource version last changed"),
    );

    // _tag - tags applied to this resource
    registry.register(
        SearchParameterDefinition::new(
            "Resource-tag",
            "_tag",
            "http://hl7.org/fhir/SearchParameter/Resource-tag",
            SearchParameterType::Token,
            vec!["Resource".to_string()],
        )
        .with_expression("Resource.meta.tag")
        .with_description("Tags applied to this resource"),
    );

    // _profile - profiles this resource claims to conform to
    registry.register(
        SearchParameterDefinition::new(
            "Resource-profile",
            "_profile",
            "http://hl7.org/fhir/SearchParameter/Resource-profile",
            SearchParameterType::Uri,
            vec!["Resource".to_string()],
        )
        .with_expression("Resource.meta.profile")
        .with_description("Profiles this resource claims to conform to"),
    );

    // _security - security labels applied to this resource
    registry.register(
        SearchParameterDefinition::new(
            "Resource-security",
            "_security",
            "http://hl7.org/fhir/SearchParameter/Resource-security",
            SearchParameterType::Token,
            vec!["Resource".to_string()],
        )
        .with_expression("Resource.meta.security")
        .with_description("Security Labels applied to this resource"),
    );

    // _source - identifies where the resource comes from (R4+)
    registry.register(
        SearchParameterDefinition::new(
            "Resource-source",
            "_source",
            "http://hl7.org/fhir/SearchParameter/Resource-source",
            SearchParameterType::Uri,
            vec!["Resource".to_string()],
        )
        .with_expression("Resource.meta.source")
        .with_description("Identifies where the resource comes from"),
    );

    tracing::debug!(count = 6, "Registered common search parameters");
}
