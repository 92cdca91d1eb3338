//! Number parameter values.

use rust_decimal::Decimal;

use crate::parameters::{SearchComparator, SearchParameterDefinition};

use super::{extract_comparator, ValueError};

/// One number alternative: an optional comparator and a decimal.
///
/// Decimals keep their written scale, so `100` and `100.00` carry
/// different implicit ranges into matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberValue {
    pub comparator: Option<SearchComparator>,
    pub value: Decimal,
}

pub(super) fn parse_branch(
    branch: &str,
    definition: &SearchParameterDefinition,
) -> Result<NumberValue, ValueError> {
    let (comparator, rest) = extract_comparator(branch, definition)?;
    let value = parse_decimal(rest).ok_or_else(|| ValueError::InvalidNumber(branch.to_string()))?;
    Ok(NumberValue { comparator, value })
}

/// Plain decimal first, exponent notation as the fallback.
pub(super) fn parse_decimal(raw: &str) -> Option<Decimal> {
    raw.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::SearchParameterType;

    fn definition() -> SearchParameterDefinition {
        SearchParameterDefinition::new(
            "RiskAssessment-probability",
            "probability",
            "http://hl7.org/fhir/SearchParameter/RiskAssessment-probability",
            SearchParameterType::Number,
            vec!["RiskAssessment".to_string()],
        )
    }

    #[test]
    fn test_plain_number() {
        let value = parse_branch("100", &definition()).unwrap();
        assert_eq!(value.comparator, None);
        assert_eq!(value.value, Decimal::new(100, 0));
    }

    #[test]
    fn test_comparator_prefix() {
        let value = parse_branch("lt0.5", &definition()).unwrap();
        assert_eq!(value.comparator, Some(SearchComparator::Lt));
        assert_eq!(value.value, Decimal::new(5, 1));
    }

    #[test]
    fn test_scale_preserved() {
        let value = parse_branch("100.00", &definition()).unwrap();
        assert_eq!(value.value.scale(), 2);
    }

    #[test]
    fn test_exponent_notation() {
        let value = parse_branch("1e2", &definition()).unwrap();
        assert_eq!(value.value, Decimal::new(100, 0));
    }

    #[test]
    fn test_negative_number() {
        let value = parse_branch("-30", &definition()).unwrap();
        assert_eq!(value.comparator, None);
        assert_eq!(value.value, Decimal::new(-30, 0));
    }

    #[test]
    fn test_garbage_rejected() {
        let err = parse_branch("gtpizza", &definition()).unwrap_err();
        assert_eq!(err, ValueError::InvalidNumber("gtpizza".to_string()));
    }
}
