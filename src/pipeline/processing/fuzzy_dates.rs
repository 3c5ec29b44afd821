use chrono::{DateTime, Duration, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{InferenceError, Result};

/// Earliest and latest instants a fuzzy date expression can denote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyBounds {
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
}

/// Signature of a fuzzy date resolution policy.
pub type DateResolver = fn(&str) -> Result<FuzzyBounds>;

static CALENDAR_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})(?:-(\d{2})(?:-(\d{2}))?)?$").expect("calendar date regex"));
static DECADE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{3})0s$").expect("decade regex"));
static UNSPECIFIED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3})([uxX]{1,3})$").expect("unspecified digits regex"));

/// Resolve a fuzzy date expression into the range of instants it may denote.
///
/// Accepted forms: `1920`, `1920-05`, `1920-05-17`, `1920s`, `192x`/`19uu`,
/// RFC 3339 timestamps, each optionally suffixed with the qualifiers `~` or `?`.
/// Qualifiers are accepted but do not widen the bounds.
pub fn resolve(input: &str) -> Result<FuzzyBounds> {
    let trimmed = input.trim().trim_end_matches(['~', '?', '%']);
    if trimmed.is_empty() {
        return Err(InferenceError::fuzzy_date(input, "empty date"));
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        let instant = instant.with_timezone(&Utc);
        return Ok(FuzzyBounds { earliest: instant, latest: instant });
    }

    if let Some(caps) = CALENDAR_DATE.captures(trimmed) {
        let year: i32 = parse_number(input, &caps[1])?;
        return match (caps.get(2), caps.get(3)) {
            (None, _) => years_span(input, year, year),
            (Some(month), None) => {
                let month: u32 = parse_number(input, month.as_str())?;
                let start = date(input, year, month, 1)?;
                let end = if month == 12 {
                    date(input, year + 1, 1, 1)?
                } else {
                    date(input, year, month + 1, 1)?
                };
                Ok(span(start, end))
            }
            (Some(month), Some(day)) => {
                let month: u32 = parse_number(input, month.as_str())?;
                let day: u32 = parse_number(input, day.as_str())?;
                let start = date(input, year, month, day)?;
                Ok(span(start, start + Duration::days(1)))
            }
        };
    }

    if let Some(caps) = DECADE.captures(trimmed) {
        let decade: i32 = parse_number(input, &caps[1])?;
        return years_span(input, decade * 10, decade * 10 + 9);
    }

    if let Some(caps) = UNSPECIFIED.captures(trimmed) {
        let (known, unknown) = (&caps[1], &caps[2]);
        if known.len() + unknown.len() != 4 {
            return Err(InferenceError::fuzzy_date(input, "year must have four digits"));
        }
        let low: i32 = parse_number(input, &format!("{}{}", known, "0".repeat(unknown.len())))?;
        let high: i32 = parse_number(input, &format!("{}{}", known, "9".repeat(unknown.len())))?;
        return years_span(input, low, high);
    }

    Err(InferenceError::fuzzy_date(input, "unrecognised format"))
}

fn parse_number<T: std::str::FromStr>(input: &str, digits: &str) -> Result<T> {
    digits
        .parse()
        .map_err(|_| InferenceError::fuzzy_date(input, format!("invalid number '{}'", digits)))
}

fn date(input: &str, year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| InferenceError::fuzzy_date(input, "no such calendar date"))
}

fn years_span(input: &str, first: i32, last: i32) -> Result<FuzzyBounds> {
    Ok(span(date(input, first, 1, 1)?, date(input, last + 1, 1, 1)?))
}

/// `[start, end)` as inclusive millisecond bounds.
fn span(start: NaiveDate, end: NaiveDate) -> FuzzyBounds {
    let earliest = start.and_time(chrono::NaiveTime::MIN).and_utc();
    let latest = end.and_time(chrono::NaiveTime::MIN).and_utc() - Duration::milliseconds(1);
    FuzzyBounds { earliest, latest }
}
