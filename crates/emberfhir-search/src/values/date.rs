//! Date parameter values.

use emberfhir_core::time::FhirDateTime;
use time::UtcOffset;

use crate::parameters::{SearchComparator, SearchParameterDefinition};

use super::{extract_comparator, ValueError};

/// One date alternative: an optional comparator and a parsed instant
/// or partial date.
///
/// The value keeps its precision; matching works on the implied
/// interval, not a collapsed point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateValue {
    pub comparator: Option<SearchComparator>,
    pub value: FhirDateTime,
}

pub(super) fn parse_branch(
    branch: &str,
    definition: &SearchParameterDefinition,
) -> Result<DateValue, ValueError> {
    let (comparator, rest) = extract_comparator(branch, definition)?;
    // Query dates without an offset are read as UTC; the written offset
    // wins when present.
    let value = FhirDateTime::parse(rest, UtcOffset::UTC)
        .map_err(|_| ValueError::InvalidDate(branch.to_string()))?;
    Ok(DateValue { comparator, value })
}
