//! String parameter values.

use super::ValueError;

/// One string alternative, kept verbatim.
///
/// Case folding and accent stripping happen on the indexed side, so the
/// query keeps what the client sent and matching stays symmetric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringValue {
    pub value: String,
}

pub(super) fn parse_branch(branch: &str) -> Result<StringValue, ValueError> {
    if branch.is_empty() {
        return Err(ValueError::Empty);
    }
    Ok(StringValue {
        value: branch.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kept_verbatim() {
        let value = parse_branch("EveAnyday").unwrap();
        assert_eq!(value.value, "EveAnyday");
    }

    #[test]
    fn test_empty_branch_rejected() {
        assert_eq!(parse_branch("").unwrap_err(), ValueError::Empty);
    }
}
