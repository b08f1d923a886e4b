//! # Temporal Module
//!
//! Partial-precision dates for genealogical facts. Every date is a closed
//! interval of `yyyymmdd` sort keys, so a year-only date spans the whole year
//! and an unknown date spans all time. Checks built on top of these ranges
//! only fire when every resolution of the unknown components is inconsistent.

use serde::{Deserialize, Serialize};
use std::cmp::{max, min};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use time::{Date, Month};

/// A calendar position encoded as `year * 10000 + month * 100 + day`.
pub type DateKey = i32;

/// Sentinel for an unknown lower bound.
pub const MIN_KEY: DateKey = i32::MIN;
/// Sentinel for an unknown upper bound.
pub const MAX_KEY: DateKey = i32::MAX;

/// Earliest year a date can carry.
pub const MIN_YEAR: i32 = 1;
/// Latest year a date can carry.
pub const MAX_YEAR: i32 = 9999;

/// Years of slack applied to `ABT`/`CAL`/`EST` qualified dates.
pub const APPROXIMATE_SLACK_YEARS: i32 = 2;

const GEDCOM_MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Errors produced while building or parsing a date.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateParseError {
    #[error("unrecognised date text: {0:?}")]
    Unrecognised(String),
    #[error("invalid calendar date {year}-{month:02}-{day:02}")]
    InvalidCalendarDate { year: i32, month: u8, day: u8 },
    #[error("date range ends before it starts: {0}..{1}")]
    Inverted(DateKey, DateKey),
}

/// Encode a calendar position as a sort key.
#[inline]
pub fn date_key(year: i32, month: u8, day: u8) -> DateKey {
    year.saturating_mul(10_000)
        .saturating_add(i32::from(month) * 100 + i32::from(day))
}

/// Extract the year from a sort key, `None` for the sentinels.
#[inline]
pub fn key_year(key: DateKey) -> Option<i32> {
    if key == MIN_KEY || key == MAX_KEY {
        None
    } else {
        Some(key.div_euclid(10_000))
    }
}

fn key_to_date(key: DateKey) -> Option<Date> {
    let year = key_year(key)?;
    let rest = key.rem_euclid(10_000);
    let month = Month::try_from(u8::try_from(rest / 100).ok()?).ok()?;
    let day = u8::try_from(rest % 100).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

fn date_to_key(date: Date) -> DateKey {
    date_key(date.year(), u8::from(date.month()), date.day())
}

fn previous_key(key: DateKey) -> DateKey {
    key_to_date(key)
        .and_then(|date| date.previous_day())
        .map(date_to_key)
        .unwrap_or(key)
}

fn next_key(key: DateKey) -> DateKey {
    key_to_date(key)
        .and_then(|date| date.next_day())
        .map(date_to_key)
        .unwrap_or(key)
}

fn month_from_number(month: u8) -> Result<Month, DateParseError> {
    Month::try_from(month).map_err(|_| DateParseError::InvalidCalendarDate {
        year: 0,
        month,
        day: 1,
    })
}

/// A closed interval `[earliest, latest]` of possible dates for one fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DateRepr")]
pub struct DateRange {
    /// Earliest possible date (inclusive), `MIN_KEY` when unknown
    pub earliest: DateKey,
    /// Latest possible date (inclusive), `MAX_KEY` when unknown
    pub latest: DateKey,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DateRepr {
    Text(String),
    Bounds { earliest: DateKey, latest: DateKey },
}

impl TryFrom<DateRepr> for DateRange {
    type Error = DateParseError;

    fn try_from(repr: DateRepr) -> Result<Self, Self::Error> {
        match repr {
            DateRepr::Text(text) => text.parse(),
            DateRepr::Bounds { earliest, latest } => DateRange::new(earliest, latest),
        }
    }
}

impl DateRange {
    /// Create a range with validation
    pub fn new(earliest: DateKey, latest: DateKey) -> Result<Self, DateParseError> {
        if earliest > latest {
            return Err(DateParseError::Inverted(earliest, latest));
        }
        Ok(Self { earliest, latest })
    }

    /// A date about which nothing is known
    pub fn unknown() -> Self {
        Self {
            earliest: MIN_KEY,
            latest: MAX_KEY,
        }
    }

    /// Year-only precision
    pub fn year(year: i32) -> Self {
        Self {
            earliest: date_key(year, 1, 1),
            latest: date_key(year, 12, 31),
        }
    }

    /// Year and month precision
    pub fn year_month(year: i32, month: u8) -> Result<Self, DateParseError> {
        let calendar_month = month_from_number(month).map_err(|_| {
            DateParseError::InvalidCalendarDate {
                year,
                month,
                day: 1,
            }
        })?;
        let last_day = time::util::days_in_year_month(year, calendar_month);
        Ok(Self {
            earliest: date_key(year, month, 1),
            latest: date_key(year, month, last_day),
        })
    }

    /// Full day precision
    pub fn ymd(year: i32, month: u8, day: u8) -> Result<Self, DateParseError> {
        let invalid = DateParseError::InvalidCalendarDate { year, month, day };
        let calendar_month = month_from_number(month).map_err(|_| invalid.clone())?;
        Date::from_calendar_date(year, calendar_month, day).map_err(|_| invalid)?;
        let key = date_key(year, month, day);
        Ok(Self {
            earliest: key,
            latest: key,
        })
    }

    /// Any date strictly before the start of `bound`
    pub fn before(bound: DateRange) -> Self {
        if bound.earliest == MIN_KEY {
            return Self::unknown();
        }
        Self {
            earliest: MIN_KEY,
            latest: previous_key(bound.earliest),
        }
    }

    /// Any date strictly after the end of `bound`
    pub fn after(bound: DateRange) -> Self {
        if bound.latest == MAX_KEY {
            return Self::unknown();
        }
        Self {
            earliest: next_key(bound.latest),
            latest: MAX_KEY,
        }
    }

    /// Span covering both endpoints
    pub fn between(from: DateRange, to: DateRange) -> Result<Self, DateParseError> {
        Self::new(min(from.earliest, to.earliest), max(from.latest, to.latest))
    }

    /// Widen by a number of years on each known side
    pub fn widen_years(self, years: i32) -> Self {
        let shift = years.saturating_mul(10_000);
        Self {
            earliest: if self.earliest == MIN_KEY {
                MIN_KEY
            } else {
                self.earliest.saturating_sub(shift)
            },
            latest: if self.latest == MAX_KEY {
                MAX_KEY
            } else {
                self.latest.saturating_add(shift)
            },
        }
    }

    /// Nothing is known about this date
    pub fn is_unknown(&self) -> bool {
        self.earliest == MIN_KEY && self.latest == MAX_KEY
    }

    /// Both ends are known
    pub fn is_bounded(&self) -> bool {
        self.earliest != MIN_KEY && self.latest != MAX_KEY
    }

    /// Earliest possible year, `None` when open-ended
    pub fn earliest_year(&self) -> Option<i32> {
        key_year(self.earliest)
    }

    /// Latest possible year, `None` when open-ended
    pub fn latest_year(&self) -> Option<i32> {
        key_year(self.latest)
    }

    /// True when every resolution of `self` lies before every resolution of `other`
    pub fn definitely_before(&self, other: &DateRange) -> bool {
        self.latest != MAX_KEY && other.earliest != MIN_KEY && self.latest < other.earliest
    }

    /// True when every resolution of `self` lies after every resolution of `other`
    pub fn definitely_after(&self, other: &DateRange) -> bool {
        other.definitely_before(self)
    }

    /// True when the two ranges share at least one possible date
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.earliest <= other.latest && other.earliest <= self.latest
    }

    /// Distance in whole years between two bounded ranges, 0 when their years overlap
    pub fn year_gap(&self, other: &DateRange) -> Option<u32> {
        if !self.is_bounded() || !other.is_bounded() {
            return None;
        }
        let (a_lo, a_hi) = (self.earliest_year()?, self.latest_year()?);
        let (b_lo, b_hi) = (other.earliest_year()?, other.latest_year()?);
        let gap = if a_hi < b_lo {
            b_lo - a_hi
        } else if b_hi < a_lo {
            a_lo - b_hi
        } else {
            0
        };
        u32::try_from(gap).ok()
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::unknown()
    }
}

/// The possible values of `to.year - from.year` across all resolutions.
///
/// `None` on either side means that side is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearSpan {
    pub min: Option<i32>,
    pub max: Option<i32>,
}

impl YearSpan {
    /// Every possible value is below `bound`
    pub fn entirely_below(&self, bound: i32) -> bool {
        matches!(self.max, Some(max) if max < bound)
    }

    /// Every possible value is above `bound`
    pub fn entirely_above(&self, bound: i32) -> bool {
        matches!(self.min, Some(min) if min > bound)
    }
}

impl fmt::Display for YearSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) if lo == hi => write!(f, "{}", lo),
            (Some(lo), Some(hi)) => write!(f, "{} to {}", lo, hi),
            (Some(lo), None) => write!(f, "at least {}", lo),
            (None, Some(hi)) => write!(f, "at most {}", hi),
            (None, None) => write!(f, "unknown"),
        }
    }
}

/// Year difference from one date to a later one
pub fn years_between(from: &DateRange, to: &DateRange) -> YearSpan {
    let min = match (to.earliest_year(), from.latest_year()) {
        (Some(to_lo), Some(from_hi)) => Some(to_lo - from_hi),
        _ => None,
    };
    let max = match (to.latest_year(), from.earliest_year()) {
        (Some(to_hi), Some(from_lo)) => Some(to_hi - from_lo),
        _ => None,
    };
    YearSpan { min, max }
}

fn fmt_key(key: DateKey) -> String {
    let year = key.div_euclid(10_000);
    let rest = key.rem_euclid(10_000);
    format!("{:04}-{:02}-{:02}", year, rest / 100, rest % 100)
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            return write!(f, "unknown");
        }
        if self.earliest == MIN_KEY {
            return write!(f, "on or before {}", fmt_key(self.latest));
        }
        if self.latest == MAX_KEY {
            return write!(f, "on or after {}", fmt_key(self.earliest));
        }
        if self.earliest == self.latest {
            return write!(f, "{}", fmt_key(self.earliest));
        }
        let (lo_year, hi_year) = (self.earliest.div_euclid(10_000), self.latest.div_euclid(10_000));
        let (lo_rest, hi_rest) = (self.earliest.rem_euclid(10_000), self.latest.rem_euclid(10_000));
        if lo_year == hi_year && lo_rest == 101 && hi_rest == 1231 {
            return write!(f, "{:04}", lo_year);
        }
        if lo_year == hi_year && lo_rest / 100 == hi_rest / 100 && lo_rest % 100 == 1 {
            if let Ok(month) = DateRange::year_month(lo_year, (lo_rest / 100) as u8) {
                if month == *self {
                    return write!(f, "{:04}-{:02}", lo_year, lo_rest / 100);
                }
            }
        }
        write!(f, "{}..{}", fmt_key(self.earliest), fmt_key(self.latest))
    }
}

impl FromStr for DateRange {
    type Err = DateParseError;

    /// Parse ISO (`1900`, `1900-03`, `1900-03-12`) and GEDCOM
    /// (`12 MAR 1900`, `ABT 1900`, `BEF 1900`, `AFT 1900`, `BET 1900 AND 1905`)
    /// date phrases, plus `1900/1905` ranges.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let text = raw.trim().to_lowercase();
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let unrecognised = || DateParseError::Unrecognised(raw.to_string());

        match tokens.as_slice() {
            [] | ["unknown"] | ["?"] => return Ok(Self::unknown()),
            [first, rest @ ..] if !rest.is_empty() => {
                let qualifier = first.trim_end_matches('.');
                let remainder = rest.join(" ");
                match qualifier {
                    "abt" | "about" | "cal" | "est" | "ca" | "c" | "circa" => {
                        return Ok(parse_point(&remainder)
                            .ok_or_else(unrecognised)?
                            .widen_years(APPROXIMATE_SLACK_YEARS));
                    }
                    "bef" | "before" => {
                        return Ok(Self::before(parse_point(&remainder).ok_or_else(unrecognised)?));
                    }
                    "aft" | "after" => {
                        return Ok(Self::after(parse_point(&remainder).ok_or_else(unrecognised)?));
                    }
                    "bet" | "between" | "from" => {
                        let (lo, hi) = remainder
                            .split_once(" and ")
                            .or_else(|| remainder.split_once(" to "))
                            .ok_or_else(unrecognised)?;
                        let lo = parse_point(lo).ok_or_else(unrecognised)?;
                        let hi = parse_point(hi).ok_or_else(unrecognised)?;
                        return Self::between(lo, hi);
                    }
                    _ => {}
                }
            }
            _ => {}
        }

        if let Some((lo, hi)) = text.split_once('/').or_else(|| text.split_once("..")) {
            let lo = parse_point(lo.trim()).ok_or_else(unrecognised)?;
            let hi = parse_point(hi.trim()).ok_or_else(unrecognised)?;
            return Self::between(lo, hi);
        }

        match parse_point_checked(&text) {
            Some(result) => result,
            None => Err(unrecognised()),
        }
    }
}

fn parse_point(text: &str) -> Option<DateRange> {
    parse_point_checked(text).and_then(Result::ok)
}

/// `None` when the shape is not a date at all, `Some(Err)` when the shape
/// matches but the calendar values are invalid.
fn parse_point_checked(text: &str) -> Option<Result<DateRange, DateParseError>> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    match tokens.as_slice() {
        [single] if single.contains('-') => {
            let parts: Vec<&str> = single.split('-').collect();
            let year = parse_year(parts.first()?)?;
            match parts.as_slice() {
                [_, month] => Some(DateRange::year_month(year, month.parse().ok()?)),
                [_, month, day] => Some(DateRange::ymd(year, month.parse().ok()?, day.parse().ok()?)),
                _ => None,
            }
        }
        [single] => Some(Ok(DateRange::year(parse_year(single)?))),
        [month, year] => {
            let month = gedcom_month(month)?;
            Some(DateRange::year_month(parse_year(year)?, month))
        }
        [day, month, year] => {
            let month = gedcom_month(month)?;
            Some(DateRange::ymd(parse_year(year)?, month, day.parse().ok()?))
        }
        _ => None,
    }
}

fn parse_year(token: &str) -> Option<i32> {
    if token.is_empty() || token.len() > 4 || !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn gedcom_month(token: &str) -> Option<u8> {
    let token = token.trim_end_matches('.');
    GEDCOM_MONTHS
        .iter()
        .position(|month| *month == token)
        .and_then(|index| u8::try_from(index + 1).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_precision_spans_whole_year() {
        let range = DateRange::year(1900);
        assert_eq!(range.earliest, 19000101);
        assert_eq!(range.latest, 19001231);
        assert_eq!(range.earliest_year(), Some(1900));
        assert_eq!(range.to_string(), "1900");
    }

    #[test]
    fn test_huge_years_saturate() {
        let range = DateRange::year(300_000);
        assert!(range.earliest <= range.latest);
        let widened = DateRange::year(9999).widen_years(i32::MAX);
        assert_eq!(widened.latest, MAX_KEY);
    }

    #[test]
    fn test_year_month_uses_calendar_length() {
        let feb = DateRange::year_month(1900, 2).unwrap();
        assert_eq!(feb.latest, 19000228);
        let leap = DateRange::year_month(1904, 2).unwrap();
        assert_eq!(leap.latest, 19040229);
        assert_eq!(leap.to_string(), "1904-02");
    }

    #[test]
    fn test_invalid_day_rejected() {
        assert!(DateRange::ymd(1900, 2, 30).is_err());
        assert!(DateRange::ymd(1900, 13, 1).is_err());
        assert!("1900-02-30".parse::<DateRange>().is_err());
    }

    #[test]
    fn test_parse_iso_and_gedcom_forms() {
        assert_eq!("1900".parse::<DateRange>().unwrap(), DateRange::year(1900));
        assert_eq!(
            "1900-03-12".parse::<DateRange>().unwrap(),
            DateRange::ymd(1900, 3, 12).unwrap()
        );
        assert_eq!(
            "12 MAR 1900".parse::<DateRange>().unwrap(),
            DateRange::ymd(1900, 3, 12).unwrap()
        );
        assert_eq!(
            "Mar 1900".parse::<DateRange>().unwrap(),
            DateRange::year_month(1900, 3).unwrap()
        );
        assert!("".parse::<DateRange>().unwrap().is_unknown());
        assert!("sometime in spring".parse::<DateRange>().is_err());
    }

    #[test]
    fn test_parse_qualifiers() {
        let about = "ABT 1900".parse::<DateRange>().unwrap();
        assert_eq!(about.earliest_year(), Some(1898));
        assert_eq!(about.latest_year(), Some(1902));

        let before = "BEF 1900".parse::<DateRange>().unwrap();
        assert_eq!(before.earliest, MIN_KEY);
        assert_eq!(before.latest, 18991231);

        let after = "aft. 1900".parse::<DateRange>().unwrap();
        assert_eq!(after.earliest, 19010101);
        assert_eq!(after.latest, MAX_KEY);

        let between = "BET 1900 AND 1905".parse::<DateRange>().unwrap();
        assert_eq!(between.earliest_year(), Some(1900));
        assert_eq!(between.latest_year(), Some(1905));

        let slash = "1900/1905".parse::<DateRange>().unwrap();
        assert_eq!(slash, between);
    }

    #[test]
    fn test_definitely_before_requires_known_bounds() {
        let a = DateRange::year(1890);
        let b = DateRange::year(1900);
        assert!(a.definitely_before(&b));
        assert!(!b.definitely_before(&a));
        assert!(!a.definitely_before(&DateRange::unknown()));
        assert!(!DateRange::year(1900).definitely_before(&DateRange::year(1900)));
    }

    #[test]
    fn test_year_gap() {
        assert_eq!(DateRange::year(1900).year_gap(&DateRange::year(1901)), Some(1));
        assert_eq!(DateRange::year(1905).year_gap(&DateRange::year(1900)), Some(5));
        let span = DateRange::between(DateRange::year(1898), DateRange::year(1902)).unwrap();
        assert_eq!(span.year_gap(&DateRange::year(1900)), Some(0));
        assert_eq!(DateRange::year(1900).year_gap(&DateRange::unknown()), None);
    }

    #[test]
    fn test_years_between_partial_dates() {
        let parent = DateRange::year(2000);
        let child = DateRange::year(1950);
        let span = years_between(&parent, &child);
        assert_eq!(span, YearSpan { min: Some(-50), max: Some(-50) });
        assert!(span.entirely_below(14));

        let open = years_between(&DateRange::unknown(), &child);
        assert!(!open.entirely_below(14));
        assert!(!open.entirely_above(60));
    }

    #[test]
    fn test_serde_accepts_text_and_bounds() {
        let from_text: DateRange = serde_json::from_str("\"ABT 1850\"").unwrap();
        assert_eq!(from_text.earliest_year(), Some(1848));

        let from_bounds: DateRange =
            serde_json::from_str(r#"{"earliest": 19000101, "latest": 19001231}"#).unwrap();
        assert_eq!(from_bounds, DateRange::year(1900));

        let json = serde_json::to_string(&DateRange::year(1900)).unwrap();
        let back: DateRange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DateRange::year(1900));
    }
}
