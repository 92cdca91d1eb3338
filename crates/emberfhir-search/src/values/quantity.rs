//! Quantity parameter values.
//!
//! Grammar: `[comparator]number[|system|code]`. The number alone matches
//! on value regardless of unit; the full triple pins the unit, with an
//! empty system or code segment standing for "unconstrained".

use rust_decimal::Decimal;

use crate::parameters::{SearchComparator, SearchParameterDefinition};

use super::{extract_comparator, number::parse_decimal, ValueError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantityValue {
    pub comparator: Option<SearchComparator>,
    pub value: Decimal,
    pub system: Option<String>,
    pub code: Option<String>,
}

pub(super) fn parse_branch(
    branch: &str,
    definition: &SearchParameterDefinition,
) -> Result<QuantityValue, ValueError> {
    let (comparator, rest) = extract_comparator(branch, definition)?;

    let segments: Vec<&str> = rest.split('|').collect();
    let (number, system, code) = match segments.as_slice() {
        [number] => (*number, None, None),
        [number, system, code] => (
            *number,
            (!system.is_empty()).then(|| system.to_string()),
            (!code.is_empty()).then(|| code.to_string()),
        ),
        _ => return Err(ValueError::InvalidQuantity(branch.to_string())),
    };

    let value =
        parse_decimal(number).ok_or_else(|| ValueError::InvalidQuantity(branch.to_string()))?;

    Ok(QuantityValue {
        comparator,
        value,
        system,
        code,
    })
}
