//! Uri parameter values.

use super::ValueError;

/// One uri alternative, kept verbatim. URIs match case-sensitively and
/// the `:below`/`:above` modifiers operate on the exact written form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriValue {
    pub uri: String,
}

pub(super) fn parse_branch(branch: &str) -> Result<UriValue, ValueError> {
    if branch.is_empty() {
        return Err(ValueError::Empty);
    }
    Ok(UriValue {
        uri: branch.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kept_verbatim() {
        let value = parse_branch("http://acme.org/fhir/ValueSet/123").unwrap();
        assert_eq!(value.uri, "http://acme.org/fhir/ValueSet/123");
    }

    #[test]
    fn test_urn_form() {
        let value = parse_branch("urn:oid:1.2.3.4.5").unwrap();
        assert_eq!(value.uri, "urn:oid:1.2.3.4.5");
    }

    #[test]
    fn test_empty_branch_rejected() {
        assert_eq!(parse_branch("").unwrap_err(), ValueError::Empty);
    }
}
