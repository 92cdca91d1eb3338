//! Date index extraction.
//!
//! Every date-bearing element is widened into an explicit UTC `[low, high]`
//! span so precision comparisons become plain interval checks. Values that
//! fail to parse are skipped; the surrounding resource still indexes.

use emberfhir_core::{Element, FhirDateTime};
use emberfhir_core::element::{Period, Timing};
use time::{OffsetDateTime, UtcOffset};

use super::IndexError;
use super::rows::IndexDateTime;

/// Extract date index rows from one element.
///
/// `local_offset` applies to literals that carry no timezone of their own.
/// A `Period` keeps whichever sides it has; a `Timing` collapses to one row
/// spanning the earliest and latest of its events and repeat bounds. Plain
/// strings index only when they parse as date literals.
pub fn set_datetime(
    element: &Element,
    resource_id: &str,
    parameter_id: &str,
    local_offset: UtcOffset,
) -> Result<Vec<IndexDateTime>, IndexError> {
    let bounds = match element {
        Element::Date(raw)
        | Element::DateTime(raw)
        | Element::Instant(raw)
        | Element::String(raw) => parse_span(raw, parameter_id, local_offset)
            .map(|(low, high)| (Some(low), Some(high))),
        Element::Period(period) => period_bounds(period, parameter_id, local_offset),
        Element::Timing(timing) => timing_bounds(timing, parameter_id, local_offset),
        other => {
            return Err(IndexError::UnexpectedDataType {
                setter: "datetime",
                datatype: other.type_name(),
                parameter_id: parameter_id.to_string(),
            });
        }
    };

    let Some((low_utc, high_utc)) = bounds else {
        return Ok(Vec::new());
    };

    Ok(vec![IndexDateTime {
        resource_id: resource_id.to_string(),
        parameter_id: parameter_id.to_string(),
        low_utc,
        high_utc,
    }])
}

fn parse_span(
    raw: &str,
    parameter_id: &str,
    local_offset: UtcOffset,
) -> Option<(OffsetDateTime, OffsetDateTime)> {
    match FhirDateTime::parse(raw, local_offset) {
        Ok(parsed) => Some(parsed.span_utc()),
        Err(error) => {
            tracing::trace!(
                parameter_id = %parameter_id,
                value = %raw,
                error = %error,
                "Skipping unparseable date value"
            );
            None
        }
    }
}

/// A period keeps whichever bounds it states; missing or unparseable sides
/// stay open.
fn period_bounds(
    period: &Period,
    parameter_id: &str,
    local_offset: UtcOffset,
) -> Option<(Option<OffsetDateTime>, Option<OffsetDateTime>)> {
    let low = period
        .start
        .as_deref()
        .and_then(|raw| parse_span(raw, parameter_id, local_offset))
        .map(|(low, _)| low);
    let high = period
        .end
        .as_deref()
        .and_then(|raw| parse_span(raw, parameter_id, local_offset))
        .map(|(_, high)| high);

    if low.is_none() && high.is_none() {
        return None;
    }
    Some((low, high))
}

/// A timing collapses to the envelope of its events and repeat bounds.
fn timing_bounds(
    timing: &Timing,
    parameter_id: &str,
    local_offset: UtcOffset,
) -> Option<(Option<OffsetDateTime>, Option<OffsetDateTime>)> {
    let mut lows: Vec<OffsetDateTime> = Vec::new();
    let mut highs: Vec<OffsetDateTime> = Vec::new();

    for event in &timing.event {
        if let Some((low, high)) = parse_span(event, parameter_id, local_offset) {
            lows.push(low);
            highs.push(high);
        }
    }

    if let Some(bounds) = timing.repeat.as_ref().and_then(|r| r.bounds_period.as_ref())
        && let Some((low, high)) = period_bounds(bounds, parameter_id, local_offset)
    {
        if let Some(low) = low {
            lows.push(low);
        }
        if let Some(high) = high {
            highs.push(high);
        }
    }

    let low = lows.into_iter().min();
    let high = highs.into_iter().max();
    if low.is_none() && high.is_none() {
        return None;
    }
    Some((low, high))
}
