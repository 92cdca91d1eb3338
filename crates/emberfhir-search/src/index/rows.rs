//! Row types produced by search index extraction.
//!
//! Each row carries the owning resource id and the definition id of the
//! search parameter it was extracted for, ready for insertion into the
//! per-type denormalized index tables.

use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

/// Comparator attached to an indexed quantity bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueComparator {
    LessThan,
    LessOrEqual,
    GreaterOrEqual,
    GreaterThan,
}

impl ValueComparator {
    /// Parse the FHIR Quantity.comparator code.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "<" => Some(Self::LessThan),
            "<=" => Some(Self::LessOrEqual),
            ">=" => Some(Self::GreaterOrEqual),
            ">" => Some(Self::GreaterThan),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
            Self::GreaterOrEqual => ">=",
            Self::GreaterThan => ">",
        }
    }
}

/// An extracted string value ready for indexing.
///
/// `value` is already case-folded and accent-stripped.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexString {
    pub resource_id: String,
    pub parameter_id: String,
    pub value: String,
}

/// An extracted token ready for indexing.
///
/// At least one of `system` and `code` is present.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexToken {
    pub resource_id: String,
    pub parameter_id: String,
    pub system: Option<String>,
    pub code: Option<String>,
}

/// An extracted reference ready for indexing.
///
/// References are stored decomposed: the service base URL they live under
/// (by registry id), the target type when known, and the target id. For
/// canonical references the pinned version, if any, lands in
/// `canonical_version`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexReference {
    pub resource_id: String,
    pub parameter_id: String,
    pub service_base_url_id: Uuid,
    pub target_type: Option<String>,
    pub target_id: String,
    pub version_id: Option<String>,
    pub canonical_version: Option<String>,
}

/// An extracted quantity ready for indexing.
///
/// Plain quantities fill only the base fields. Ranges land in a single row:
/// the low bound in the base fields, the high bound in the `*_high` fields.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexQuantity {
    pub resource_id: String,
    pub parameter_id: String,
    pub comparator: Option<ValueComparator>,
    pub value: Option<Decimal>,
    pub system: Option<String>,
    pub code: Option<String>,
    pub unit: Option<String>,
    pub comparator_high: Option<ValueComparator>,
    pub value_high: Option<Decimal>,
    pub system_high: Option<String>,
    pub code_high: Option<String>,
    pub unit_high: Option<String>,
}

/// An extracted date range ready for indexing.
///
/// FHIR date precision (year, month, day, instant) is widened into an
/// explicit UTC low/high span. Open-ended periods leave one side empty.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDateTime {
    pub resource_id: String,
    pub parameter_id: String,
    pub low_utc: Option<OffsetDateTime>,
    pub high_utc: Option<OffsetDateTime>,
}

/// An extracted URI value ready for indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexUri {
    pub resource_id: String,
    pub parameter_id: String,
    pub uri: String,
}

/// All rows extracted from one resource, grouped by index table.
#[derive(Debug, Clone, Default)]
pub struct IndexOutcome {
    pub strings: Vec<IndexString>,
    pub tokens: Vec<IndexToken>,
    pub references: Vec<IndexReference>,
    pub quantities: Vec<IndexQuantity>,
    pub datetimes: Vec<IndexDateTime>,
    pub uris: Vec<IndexUri>,
}

impl IndexOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no setter produced any row.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
            && self.tokens.is_empty()
            && self.references.is_empty()
            && self.quantities.is_empty()
            && self.datetimes.is_empty()
            && self.uris.is_empty()
    }

    /// Total row count across all index tables.
    pub fn total(&self) -> usize {
        self.strings.len()
            + self.tokens.len()
            + self.references.len()
            + self.quantities.len()
            + self.datetimes.len()
            + self.uris.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_comparator_round_trip() {
        for raw in ["<", "<=", ">=", ">"] {
            let parsed = ValueComparator::parse(raw).unwrap();
            assert_eq!(parsed.as_str(), raw);
        }
        assert!(ValueComparator::parse("=").is_none());
        assert!(ValueComparator::parse("ad").is_none());
    }

    #[test]
    fn test_outcome_counts() {
        let mut outcome = IndexOutcome::new();
        assert!(outcome.is_empty());
        assert_eq!(outcome.total(), 0);

        outcome.strings.push(IndexString {
            resource_id: "pat-1".into(),
            parameter_id: "Patient-name".into(),
            value: "chalmers".into(),
        });
        outcome.uris.push(IndexUri {
            resource_id: "pat-1".into(),
            parameter_id: "Resource-source".into(),
            uri: "http://example.org/source".into(),
        });

        assert!(!outcome.is_empty());
        assert_eq!(outcome.total(), 2);
    }
}
