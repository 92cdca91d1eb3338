//! Reference index extraction.
//!
//! Reference rows store the target decomposed: which service authority it
//! lives under (by registry id), the target type and id, and version
//! information. Local references resolve to the server's primary base URL;
//! remote authorities are registered lazily on first sight. Contained and
//! URN references are never indexable and are skipped.

use emberfhir_core::{
    CoreError, Element, ReferenceTarget, ServiceBaseUrl, ServiceBaseUrlRegistry, parse_reference,
};
use emberfhir_core::reference::split_canonical;
use uuid::Uuid;

use super::IndexError;
use super::rows::IndexReference;

/// Extract reference index rows from one element.
///
/// `uri`, `url` and `Attachment.url` literals index when they are shaped as
/// a REST resource identity; `Identifier.value` likewise. Canonicals carry
/// their pinned `|version` in `canonical_version`.
pub async fn set_reference(
    element: &Element,
    resource_id: &str,
    parameter_id: &str,
    base_urls: &dyn ServiceBaseUrlRegistry,
) -> Result<Vec<IndexReference>, IndexError> {
    let (literal, canonical_version) = match element {
        Element::Reference(reference) => match &reference.reference {
            Some(literal) => (literal.clone(), None),
            None => return Ok(Vec::new()),
        },
        Element::Uri(raw) | Element::Url(raw) => (raw.clone(), None),
        Element::Canonical(raw) => {
            let (url, version) = split_canonical(raw);
            (url.to_string(), version.map(String::from))
        }
        Element::Attachment(attachment) => match &attachment.url {
            Some(url) => (url.clone(), None),
            None => return Ok(Vec::new()),
        },
        Element::Identifier(identifier) => match &identifier.value {
            Some(value) => (value.clone(), None),
            None => return Ok(Vec::new()),
        },
        other => {
            return Err(IndexError::UnexpectedDataType {
                setter: "reference",
                datatype: other.type_name(),
                parameter_id: parameter_id.to_string(),
            });
        }
    };

    let target = match parse_reference(&literal) {
        Ok(target) => target,
        Err(unindexable) => {
            tracing::trace!(
                parameter_id = %parameter_id,
                reason = %unindexable,
                "Skipping unindexable reference"
            );
            return Ok(Vec::new());
        }
    };

    let (service_base_url_id, identity) = match target {
        ReferenceTarget::Local(identity) => {
            let primary = base_urls.get_primary().await?.ok_or_else(|| {
                CoreError::configuration("no primary service base URL registered")
            })?;
            (primary.id, identity)
        }
        ReferenceTarget::Remote {
            service_base,
            identity,
        } => (resolve_authority(&service_base, base_urls).await?, identity),
    };

    Ok(vec![IndexReference {
        resource_id: resource_id.to_string(),
        parameter_id: parameter_id.to_string(),
        service_base_url_id,
        target_type: Some(identity.resource_type),
        target_id: identity.id,
        version_id: identity.version,
        canonical_version,
    }])
}

/// Map an absolute authority to its registry id, registering it on first
/// sight.
async fn resolve_authority(
    service_base: &str,
    base_urls: &dyn ServiceBaseUrlRegistry,
) -> Result<Uuid, IndexError> {
    if let Some(existing) = base_urls.get_by_url(service_base).await? {
        return Ok(existing.id);
    }
    let added = base_urls.add(ServiceBaseUrl::new(service_base, false)?).await?;
    Ok(added.id)
}
