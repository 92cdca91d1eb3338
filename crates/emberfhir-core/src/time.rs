//! FHIR date/dateTime parsing with precision capture.
//!
//! A FHIR date literal carries an implicit span: `2023` covers the whole
//! year, `2023-09-30` the whole day, and a second-precision timestamp the
//! 999ms up to the next second. Search indexing and date-typed query values
//! both need that span, so parsing keeps the stated precision and exposes
//! the closed `[low, high]` UTC interval it implies.

use crate::error::{CoreError, Result};
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Precision stated by a FHIR date/dateTime literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DatePrecision {
    Year,
    Month,
    Day,
    Minute,
    Second,
    Millisecond,
}

/// A parsed FHIR date/dateTime: the lowest instant of the stated period
/// plus the precision that determines how far the period extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FhirDateTime {
    value: OffsetDateTime,
    precision: DatePrecision,
}

impl FhirDateTime {
    /// Parse a FHIR date/dateTime literal.
    ///
    /// `default_offset` applies to values that carry no timezone of their
    /// own (bare dates, and lenient stores with zoneless timestamps).
    pub fn parse(raw: &str, default_offset: UtcOffset) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::invalid_date_time("empty date value"));
        }

        let (date_part, time_part) = match trimmed.split_once('T') {
            Some((d, t)) => (d, Some(t)),
            None => (trimmed, None),
        };

        let (date, date_precision) = parse_date_part(date_part, trimmed)?;

        match time_part {
            None => Ok(Self {
                value: PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_offset(default_offset),
                precision: date_precision,
            }),
            Some(t) => {
                if date_precision != DatePrecision::Day {
                    return Err(CoreError::invalid_date_time(format!(
                        "time component requires a full calendar date: {trimmed}"
                    )));
                }
                let (time, precision, offset) = parse_time_part(t, trimmed, default_offset)?;
                Ok(Self {
                    value: PrimitiveDateTime::new(date, time).assume_offset(offset),
                    precision,
                })
            }
        }
    }

    /// The lowest instant of the stated period.
    pub fn value(&self) -> OffsetDateTime {
        self.value
    }

    pub fn precision(&self) -> DatePrecision {
        self.precision
    }

    /// Inclusive lower bound of the period, in UTC.
    pub fn low_utc(&self) -> OffsetDateTime {
        self.value.to_offset(UtcOffset::UTC)
    }

    /// Inclusive upper bound of the period, in UTC.
    ///
    /// One whole unit of the stated precision minus a millisecond, so a
    /// second-precision value ends at low + 999ms and a millisecond-precision
    /// instant collapses to a point interval.
    pub fn high_utc(&self) -> OffsetDateTime {
        let span = match self.precision {
            DatePrecision::Year => {
                Duration::days(i64::from(time::util::days_in_year(self.value.year())))
            }
            DatePrecision::Month => Duration::days(i64::from(time::util::days_in_year_month(
                self.value.year(),
                self.value.month(),
            ))),
            DatePrecision::Day => Duration::days(1),
            DatePrecision::Minute => Duration::minutes(1),
            DatePrecision::Second => Duration::seconds(1),
            DatePrecision::Millisecond => Duration::milliseconds(1),
        };
        (self.value + span - Duration::milliseconds(1)).to_offset(UtcOffset::UTC)
    }

    /// The closed `[low, high]` UTC interval implied by the literal.
    pub fn span_utc(&self) -> (OffsetDateTime, OffsetDateTime) {
        (self.low_utc(), self.high_utc())
    }
}

fn parse_digits<T: std::str::FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_date_part(s: &str, original: &str) -> Result<(Date, DatePrecision)> {
    let invalid = || CoreError::invalid_date_time(format!("unrecognized date value: {original}"));

    match s.len() {
        // "2023"
        4 => {
            let year = parse_digits::<i32>(s).ok_or_else(invalid)?;
            let date = Date::from_calendar_date(year, Month::January, 1).map_err(|_| invalid())?;
            Ok((date, DatePrecision::Year))
        }
        // "2023-09"
        7 => {
            if s.as_bytes()[4] != b'-' {
                return Err(invalid());
            }
            let year = parse_digits::<i32>(&s[..4]).ok_or_else(invalid)?;
            let month_num = parse_digits::<u8>(&s[5..7]).ok_or_else(invalid)?;
            let month = Month::try_from(month_num).map_err(|_| invalid())?;
            let date = Date::from_calendar_date(year, month, 1).map_err(|_| invalid())?;
            Ok((date, DatePrecision::Month))
        }
        // "2023-09-30"
        10 => {
            if s.as_bytes()[4] != b'-' || s.as_bytes()[7] != b'-' {
                return Err(invalid());
            }
            let year = parse_digits::<i32>(&s[..4]).ok_or_else(invalid)?;
            let month_num = parse_digits::<u8>(&s[5..7]).ok_or_else(invalid)?;
            let day = parse_digits::<u8>(&s[8..10]).ok_or_else(invalid)?;
            let month = Month::try_from(month_num).map_err(|_| invalid())?;
            let date = Date::from_calendar_date(year, month, day).map_err(|_| invalid())?;
            Ok((date, DatePrecision::Day))
        }
        _ => Err(invalid()),
    }
}

fn parse_time_part(
    s: &str,
    original: &str,
    default_offset: UtcOffset,
) -> Result<(Time, DatePrecision, UtcOffset)> {
    let invalid =
        || CoreError::invalid_date_time(format!("unrecognized time component: {original}"));

    let (hms, offset) = split_offset(s, default_offset, original)?;
    let bytes = hms.as_bytes();
    if hms.len() < 5 || bytes[2] != b':' {
        return Err(invalid());
    }
    let hour = parse_digits::<u8>(&hms[..2]).ok_or_else(invalid)?;
    let minute = parse_digits::<u8>(&hms[3..5]).ok_or_else(invalid)?;

    match hms.len() {
        // "14:30"
        5 => {
            let time = Time::from_hms(hour, minute, 0).map_err(|_| invalid())?;
            Ok((time, DatePrecision::Minute, offset))
        }
        // "14:30:00"
        8 => {
            if bytes[5] != b':' {
                return Err(invalid());
            }
            let second = parse_digits::<u8>(&hms[6..8]).ok_or_else(invalid)?;
            let time = Time::from_hms(hour, minute, second).map_err(|_| invalid())?;
            Ok((time, DatePrecision::Second, offset))
        }
        // "14:30:00.123" with 1 to 9 fraction digits
        len if len >= 10 => {
            if bytes[5] != b':' || bytes[8] != b'.' {
                return Err(invalid());
            }
            let second = parse_digits::<u8>(&hms[6..8]).ok_or_else(invalid)?;
            let frac = &hms[9..];
            if frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let time =
                Time::from_hms_milli(hour, minute, second, fraction_to_millis(frac))
                    .map_err(|_| invalid())?;
            Ok((time, DatePrecision::Millisecond, offset))
        }
        _ => Err(invalid()),
    }
}

/// Truncate a fractional-second string to millisecond resolution.
fn fraction_to_millis(frac: &str) -> u16 {
    const PLACE: [u16; 3] = [100, 10, 1];
    frac.bytes()
        .take(3)
        .enumerate()
        .map(|(idx, b)| u16::from(b - b'0') * PLACE[idx])
        .sum()
}

fn split_offset<'a>(
    s: &'a str,
    default_offset: UtcOffset,
    original: &str,
) -> Result<(&'a str, UtcOffset)> {
    let invalid =
        || CoreError::invalid_date_time(format!("unrecognized timezone offset: {original}"));

    if let Some(hms) = s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
        return Ok((hms, UtcOffset::UTC));
    }

    if let Some(pos) = s.rfind(['+', '-']) {
        let (hms, offset_str) = (&s[..pos], &s[pos..]);
        let bytes = offset_str.as_bytes();
        if offset_str.len() != 6 || bytes[3] != b':' {
            return Err(invalid());
        }
        let hours = parse_digits::<i8>(&offset_str[1..3]).ok_or_else(invalid)?;
        let minutes = parse_digits::<i8>(&offset_str[4..6]).ok_or_else(invalid)?;
        if hours > 14 || minutes > 59 {
            return Err(invalid());
        }
        let sign = if bytes[0] == b'+' { 1 } else { -1 };
        let offset = UtcOffset::from_hms(sign * hours, sign * minutes, 0).map_err(|_| invalid())?;
        return Ok((hms, offset));
    }

    Ok((s, default_offset))
}
