//! FHIR reference parsing.
//!
//! Classifies a reference literal into one of the shapes the search core
//! cares about:
//! - Relative: `Patient/123`, optionally versioned `Patient/123/_history/1`
//! - Absolute: `http://example.org/fhir/Patient/123` — split into the
//!   authority (a service base URL) and the trailing REST identity
//! - Contained (`#local-id`) and URN (`urn:uuid:...`) references, which are
//!   never indexable
//!
//! Anything that is not syntactically shaped as a REST resource identity is
//! reported as such so callers can skip it without guessing.

use crate::fhir::is_valid_resource_type_name;
use std::fmt;

/// The `Type/id[/_history/version]` tail of a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceIdentity {
    pub resource_type: String,
    pub id: String,
    pub version: Option<String>,
}

impl ReferenceIdentity {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            version: None,
        }
    }

    pub fn with_version(
        resource_type: impl Into<String>,
        id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            version: Some(version.into()),
        }
    }

    /// Returns the identity as a relative string (Type/id).
    pub fn to_relative(&self) -> String {
        format!("{}/{}", self.resource_type, self.id)
    }

    /// Returns the identity with version if present (Type/id/_history/version).
    pub fn to_versioned(&self) -> String {
        match &self.version {
            Some(v) => format!("{}/{}/_history/{}", self.resource_type, self.id, v),
            None => self.to_relative(),
        }
    }
}

impl fmt::Display for ReferenceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_relative())
    }
}

/// Where a parsed reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceTarget {
    /// Relative to the current server.
    Local(ReferenceIdentity),
    /// On some absolute authority; `service_base` carries no trailing slash.
    Remote {
        service_base: String,
        identity: ReferenceIdentity,
    },
}

impl ReferenceTarget {
    pub fn identity(&self) -> &ReferenceIdentity {
        match self {
            ReferenceTarget::Local(identity) => identity,
            ReferenceTarget::Remote { identity, .. } => identity,
        }
    }
}

/// A reference that cannot be turned into an index row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnindexableReference {
    /// A contained reference (starts with `#`)
    Contained(String),
    /// A URN reference (`urn:uuid:xxx` or `urn:oid:xxx`)
    Urn(String),
    /// Not shaped as a REST resource identity
    NotAnIdentity(String),
    /// Empty or whitespace-only
    Empty,
}

impl fmt::Display for UnindexableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contained(id) => write!(f, "contained reference: #{id}"),
            Self::Urn(urn) => write!(f, "URN reference: {urn}"),
            Self::NotAnIdentity(value) => write!(f, "not a resource identity: {value}"),
            Self::Empty => write!(f, "empty reference"),
        }
    }
}

impl std::error::Error for UnindexableReference {}

/// Check id conformance: 1 to 64 characters from `A-Z a-z 0-9 - .`
pub fn is_fhir_id(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 64
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.')
}

/// Parse a FHIR reference string into its target shape.
pub fn parse_reference(raw: &str) -> Result<ReferenceTarget, UnindexableReference> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UnindexableReference::Empty);
    }

    if let Some(contained_id) = raw.strip_prefix('#') {
        return Err(UnindexableReference::Contained(contained_id.to_string()));
    }

    if raw.starts_with("urn:") {
        return Err(UnindexableReference::Urn(raw.to_string()));
    }

    if let Some(scheme_end) = raw.find("://") {
        let scheme = &raw[..scheme_end];
        if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
            return Err(UnindexableReference::NotAnIdentity(raw.to_string()));
        }

        let rest = &raw[scheme_end + 3..];
        let Some(slash) = rest.find('/') else {
            return Err(UnindexableReference::NotAnIdentity(raw.to_string()));
        };
        let authority = &rest[..slash];
        if authority.is_empty() {
            return Err(UnindexableReference::NotAnIdentity(raw.to_string()));
        }

        let path = rest[slash + 1..].trim_end_matches('/');
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((lead, identity)) = split_identity_tail(&segments) else {
            return Err(UnindexableReference::NotAnIdentity(raw.to_string()));
        };

        let mut service_base = format!("{scheme}://{authority}");
        for segment in lead {
            service_base.push('/');
            service_base.push_str(segment);
        }

        return Ok(ReferenceTarget::Remote {
            service_base,
            identity,
        });
    }

    // Relative reference: exactly Type/id or Type/id/_history/version
    let parts: Vec<&str> = raw.split('/').collect();
    let identity = match parts.as_slice() {
        [resource_type, id] => identity_from_parts(resource_type, id, None),
        [resource_type, id, history, version] if *history == "_history" => {
            identity_from_parts(resource_type, id, Some(version))
        }
        _ => None,
    };

    identity
        .map(ReferenceTarget::Local)
        .ok_or_else(|| UnindexableReference::NotAnIdentity(raw.to_string()))
}

/// Split path segments into a leading service-base part and the trailing
/// `Type/id[/_history/version]` identity, if one is present.
fn split_identity_tail<'s>(
    segments: &'s [&'s str],
) -> Option<(&'s [&'s str], ReferenceIdentity)> {
    let len = segments.len();
    if len >= 4 && segments[len - 2] == "_history" {
        let identity = identity_from_parts(
            segments[len - 4],
            segments[len - 3],
            Some(segments[len - 1]),
        )?;
        return Some((&segments[..len - 4], identity));
    }
    if len >= 2 {
        let identity = identity_from_parts(segments[len - 2], segments[len - 1], None)?;
        return Some((&segments[..len - 2], identity));
    }
    None
}

fn identity_from_parts(
    resource_type: &str,
    id: &str,
    version: Option<&str>,
) -> Option<ReferenceIdentity> {
    if !is_valid_resource_type_name(resource_type) || !is_fhir_id(id) {
        return None;
    }
    if let Some(v) = version
        && !is_fhir_id(v)
    {
        return None;
    }
    Some(ReferenceIdentity {
        resource_type: resource_type.to_string(),
        id: id.to_string(),
        version: version.map(str::to_string),
    })
}

/// Split a canonical reference into its URL and optional `|version` suffix.
pub fn split_canonical(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once('|') {
        Some((url, version)) if !version.is_empty() => (url, Some(version)),
        Some((url, _)) => (url, None),
        None => (raw, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_relative_reference() {
        let target = parse_reference("Patient/123").unwrap();
        let ReferenceTarget::Local(identity) = target else {
            panic!("expected local reference");
        };
        assert_eq!(identity.resource_type, "Patient");
        assert_eq!(identity.id, "123");
        assert_eq!(identity.version, None);
    }

    #[test]
    fn test_versioned_relative_reference() {
        let target = parse_reference("Patient/123/_history/2").unwrap();
        assert_eq!(
            target.identity(),
            &ReferenceIdentity::with_version("Patient", "123", "2")
        );
    }

    #[test]
    fn test_absolute_reference() {
        let target = parse_reference("http://example.org/fhir/Patient/123").unwrap();
        let ReferenceTarget::Remote {
            service_base,
            identity,
        } = target
        else {
            panic!("expected remote reference");
        };
        assert_eq!(service_base, "http://example.org/fhir");
        assert_eq!(identity, ReferenceIdentity::new("Patient", "123"));
    }

    #[test]
    fn test_absolute_versioned_reference() {
        let target =
            parse_reference("https://fhir.example.org/r4/Observation/obs-1/_history/3").unwrap();
        let ReferenceTarget::Remote {
            service_base,
            identity,
        } = target
        else {
            panic!("expected remote reference");
        };
        assert_eq!(service_base, "https://fhir.example.org/r4");
        assert_eq!(identity.version.as_deref(), Some("3"));
    }

    #[test]
    fn test_absolute_reference_without_base_path() {
        let target = parse_reference("http://example.org/Patient/123").unwrap();
        let ReferenceTarget::Remote { service_base, .. } = target else {
            panic!("expected remote reference");
        };
        assert_eq!(service_base, "http://example.org");
    }

    #[test]
    fn test_contained_reference() {
        let err = parse_reference("#med-1").unwrap_err();
        assert!(matches!(err, UnindexableReference::Contained(id) if id == "med-1"));
    }

    #[test]
    fn test_urn_references() {
        let err = parse_reference("urn:uuid:550e8400-e29b-41d4-a716-446655440000").unwrap_err();
        assert!(matches!(err, UnindexableReference::Urn(_)));

        let err = parse_reference("urn:oid:2.16.840.1.113883.4.642.3.1").unwrap_err();
        assert!(matches!(err, UnindexableReference::Urn(_)));
    }

    #[test]
    fn test_non_identity_shapes() {
        assert!(matches!(
            parse_reference("patient/123"),
            Err(UnindexableReference::NotAnIdentity(_))
        ));
        assert!(matches!(
            parse_reference("Patient/"),
            Err(UnindexableReference::NotAnIdentity(_))
        ));
        assert!(matches!(
            parse_reference("Patient"),
            Err(UnindexableReference::NotAnIdentity(_))
        ));
        assert!(matches!(
            parse_reference("Patient/123/extra"),
            Err(UnindexableReference::NotAnIdentity(_))
        ));
        assert!(matches!(
            parse_reference("http://example.org"),
            Err(UnindexableReference::NotAnIdentity(_))
        ));
        assert!(matches!(
            parse_reference("ftp://example.org/Patient/123"),
            Err(UnindexableReference::NotAnIdentity(_))
        ));
    }

    #[test]
    fn test_empty_reference() {
        assert!(matches!(
            parse_reference(""),
            Err(UnindexableReference::Empty)
        ));
        assert!(matches!(
            parse_reference("   "),
            Err(UnindexableReference::Empty)
        ));
    }

    #[test]
    fn test_is_fhir_id() {
        assert!(is_fhir_id("abc-123.DEF"));
        assert!(!is_fhir_id(""));
        assert!(!is_fhir_id("has space"));
        assert!(!is_fhir_id(&"x".repeat(65)));
    }

    #[test]
    fn test_split_canonical() {
        assert_eq!(
            split_canonical("http://example.org/ValueSet/vs|1.0.2"),
            ("http://example.org/ValueSet/vs", Some("1.0.2"))
        );
        assert_eq!(
            split_canonical("http://example.org/ValueSet/vs"),
            ("http://example.org/ValueSet/vs", None)
        );
        assert_eq!(
            split_canonical("http://example.org/ValueSet/vs|"),
            ("http://example.org/ValueSet/vs", None)
        );
    }

    #[test]
    fn test_to_versioned_and_display() {
        let identity = ReferenceIdentity::with_version("Patient", "123", "2");
        assert_eq!(identity.to_versioned(), "Patient/123/_history/2");
        assert_eq!(format!("{identity}"), "Patient/123");
    }
}
