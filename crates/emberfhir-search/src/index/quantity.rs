//! Quantity index extraction.
//!
//! Covers bare numbers, UCUM-coded quantities, money and ranges. Unit
//! systems and codes are stored verbatim: UCUM codes are case-sensitive.

use emberfhir_core::Element;
use emberfhir_core::element::{Money, Quantity, Range};
use rust_decimal::Decimal;

use super::IndexError;
use super::rows::{IndexQuantity, ValueComparator};

/// Currency code system for Money values.
const CURRENCY_SYSTEM: &str = "urn:iso:std:iso:4217";

/// Extract quantity index rows from one element.
///
/// A `Range` lands in a single row: the low bound in the base fields with a
/// `>=` comparator, the high bound in the `*_high` fields with `<=`.
/// Quantities without a value produce no rows.
pub fn set_quantity(
    element: &Element,
    resource_id: &str,
    parameter_id: &str,
) -> Result<Vec<IndexQuantity>, IndexError> {
    let row = match element {
        Element::Integer(value) => Some(number_row(resource_id, parameter_id, Decimal::from(*value))),
        Element::PositiveInt(value) => {
            Some(number_row(resource_id, parameter_id, Decimal::from(*value)))
        }
        Element::Decimal(value) => Some(number_row(resource_id, parameter_id, *value)),
        Element::Quantity(quantity) | Element::Duration(quantity) => {
            quantity_row(resource_id, parameter_id, quantity)
        }
        Element::Money(money) => money_row(resource_id, parameter_id, money),
        Element::Range(range) => range_row(resource_id, parameter_id, range),
        other => {
            return Err(IndexError::UnexpectedDataType {
                setter: "quantity",
                datatype: other.type_name(),
                parameter_id: parameter_id.to_string(),
            });
        }
    };

    Ok(row.into_iter().collect())
}

fn blank_row(resource_id: &str, parameter_id: &str) -> IndexQuantity {
    IndexQuantity {
        resource_id: resource_id.to_string(),
        parameter_id: parameter_id.to_string(),
        comparator: None,
        value: None,
        system: None,
        code: None,
        unit: None,
        comparator_high: None,
        value_high: None,
        system_high: None,
        code_high: None,
        unit_high: None,
    }
}

fn number_row(resource_id: &str, parameter_id: &str, value: Decimal) -> IndexQuantity {
    let mut row = blank_row(resource_id, parameter_id);
    row.value = Some(value);
    row
}

fn quantity_row(
    resource_id: &str,
    parameter_id: &str,
    quantity: &Quantity,
) -> Option<IndexQuantity> {
    let value = quantity.value?;
    let mut row = blank_row(resource_id, parameter_id);
    row.comparator = quantity
        .comparator
        .as_deref()
        .and_then(ValueComparator::parse);
    row.value = Some(value);
    row.system = quantity.system.clone();
    row.code = quantity.code.clone();
    row.unit = quantity.unit.clone();
    Some(row)
}

fn money_row(resource_id: &str, parameter_id: &str, money: &Money) -> Option<IndexQuantity> {
    let value = money.value?;
    let mut row = blank_row(resource_id, parameter_id);
    row.value = Some(value);
    row.system = Some(CURRENCY_SYSTEM.to_string());
    row.code = money.currency.clone();
    Some(row)
}

fn range_row(resource_id: &str, parameter_id: &str, range: &Range) -> Option<IndexQuantity> {
    let low = range.low.as_ref().filter(|q| q.value.is_some());
    let high = range.high.as_ref().filter(|q| q.value.is_some());
    if low.is_none() && high.is_none() {
        return None;
    }

    let mut row = blank_row(resource_id, parameter_id);
    if let Some(low) = low {
        row.comparator = Some(ValueComparator::GreaterOrEqual);
        row.value = low.value;
        row.system = low.system.clone();
        row.code = low.code.clone();
        row.unit = low.unit.clone();
    }
    if let Some(high) = high {
        row.comparator_high = Some(ValueComparator::LessOrEqual);
        row.value_high = high.value;
        row.system_high = high.system.clone();
        row.code_high = high.code.clone();
        row.unit_high = high.unit.clone();
    }
    Some(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ucum(value: &str, code: &str) -> Quantity {
        Quantity {
            value: Some(value.parse().unwrap()),
            comparator: None,
            unit: Some(code.to_string()),
            system: Some("http://unitsofmeasure.org".to_string()),
            code: Some(code.to_string()),
        }
    }

    fn one_row(element: &Element) -> IndexQuantity {
        let mut rows = set_quantity(element, "res-1", "param-1").unwrap();
        assert_eq!(rows.len(), 1);
        rows.remove(0)
    }

    #[test]
    fn test_integer() {
        let row = one_row(&Element::Integer(-5));
        assert_eq!(row.value, Some(Decimal::from(-5)));
        assert_eq!(row.system, None);
        assert_eq!(row.comparator, None);
    }

    #[test]
    fn test_decimal_preserves_scale() {
        let row = one_row(&Element::Decimal("5.40".parse().unwrap()));
        assert_eq!(row.value.unwrap().to_string(), "5.40");
    }

    #[test]
    fn test_quantity_with_ucum_code() {
        let row = one_row(&Element::Quantity(ucum("185.5", "[lb_av]")));
        assert_eq!(row.value.unwrap().to_string(), "185.5");
        assert_eq!(row.system.as_deref(), Some("http://unitsofmeasure.org"));
        assert_eq!(row.code.as_deref(), Some("[lb_av]"));
        assert_eq!(row.unit.as_deref(), Some("[lb_av]"));
    }

    #[test]
    fn test_quantity_code_kept_verbatim() {
        // UCUM is case-sensitive: mg (milligram) vs Mg (megagram)
        let row = one_row(&Element::Quantity(ucum("10", "Mg")));
        assert_eq!(row.code.as_deref(), Some("Mg"));
    }

    #[test]
    fn test_quantity_comparator() {
        let mut quantity = ucum("2.5", "mg");
        quantity.comparator = Some("<".to_string());
        let row = one_row(&Element::Quantity(quantity));
        assert_eq!(row.comparator, Some(ValueComparator::LessThan));
    }

    #[test]
    fn test_quantity_without_value_skipped() {
        let quantity = Quantity {
            unit: Some("mg".into()),
            ..Default::default()
        };
        let rows = set_quantity(&Element::Quantity(quantity), "res-1", "param-1").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_duration() {
        let row = one_row(&Element::Duration(ucum("30", "min")));
        assert_eq!(row.value, Some(Decimal::from(30)));
        assert_eq!(row.code.as_deref(), Some("min"));
    }

    #[test]
    fn test_money_uses_currency_system() {
        let money = Money {
            value: Some("19.99".parse().unwrap()),
            currency: Some("USD".into()),
        };
        let row = one_row(&Element::Money(money));
        assert_eq!(row.system.as_deref(), Some("urn:iso:std:iso:4217"));
        assert_eq!(row.code.as_deref(), Some("USD"));
    }

    #[test]
    fn test_range_fills_both_bounds_in_one_row() {
        let range = Range {
            low: Some(ucum("1.5", "mg")),
            high: Some(ucum("2.5", "mg")),
        };
        let row = one_row(&Element::Range(range));
        assert_eq!(row.comparator, Some(ValueComparator::GreaterOrEqual));
        assert_eq!(row.value.unwrap().to_string(), "1.5");
        assert_eq!(row.code.as_deref(), Some("mg"));
        assert_eq!(row.comparator_high, Some(ValueComparator::LessOrEqual));
        assert_eq!(row.value_high.unwrap().to_string(), "2.5");
        assert_eq!(row.code_high.as_deref(), Some("mg"));
    }

    #[test]
    fn test_range_with_only_high_bound() {
        let range = Range {
            low: None,
            high: Some(ucum("100", "mg")),
        };
        let row = one_row(&Element::Range(range));
        assert_eq!(row.comparator, None);
        assert_eq!(row.value, None);
        assert_eq!(row.comparator_high, Some(ValueComparator::LessOrEqual));
        assert_eq!(row.value_high, Some(Decimal::from(100)));
    }

    #[test]
    fn test_empty_range_skipped() {
        let rows =
            set_quantity(&Element::Range(Range::default()), "res-1", "param-1").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_unexpected_datatype_errors() {
        let err = set_quantity(&Element::String("5".into()), "res-1", "param-1").unwrap_err();
        assert!(matches!(
            err,
            IndexError::UnexpectedDataType {
                setter: "quantity",
                ..
            }
        ));
    }
}
