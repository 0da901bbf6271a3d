//! Scalar <-> text conversions
//!
//! Parsers (`to_*`) turn element text into typed values, formatters
//! (`from_*`) turn typed values into the canonical text stored in a tree.
//! Booleans are written as `YES`/`NO`; dates and datetimes are written in
//! ISO 8601 at second precision, and a datetime without an offset is
//! given the local one before formatting.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::error::{Error, ErrorKind, Result};

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const COMPACT_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year][month][day]");
const TIME_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second]");
const NAIVE_DATETIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const OFFSET_DATETIME_FORMAT: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
);

/// A datetime with or without a UTC offset
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateTimeValue {
    Naive(PrimitiveDateTime),
    Offset(OffsetDateTime),
}

impl DateTimeValue {
    /// Calendar date part
    pub fn date(&self) -> Date {
        match self {
            Self::Naive(value) => value.date(),
            Self::Offset(value) => value.date(),
        }
    }

    /// Clock time part
    pub fn time(&self) -> Time {
        match self {
            Self::Naive(value) => value.time(),
            Self::Offset(value) => value.time(),
        }
    }

    /// Attach the local offset to a naive value (UTC if it cannot be determined)
    pub fn assume_local(self) -> OffsetDateTime {
        match self {
            Self::Offset(value) => value,
            Self::Naive(value) => {
                let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
                value.assume_offset(offset)
            }
        }
    }
}

/// A typed scalar that can be stored as element text
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Time(Time),
    Date(Date),
    DateTime(PrimitiveDateTime),
    OffsetDateTime(OffsetDateTime),
}

impl Scalar {
    /// Canonical text, picking the formatter by variant
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Bool(value) => from_bool(*value).to_string(),
            Self::Int(value) => from_int(*value),
            Self::Float(value) => from_float(*value),
            Self::Decimal(value) => from_decimal(value),
            Self::Time(value) => from_time(*value),
            Self::Date(value) => from_date(*value),
            Self::DateTime(value) => from_datetime(DateTimeValue::Naive(*value)),
            Self::OffsetDateTime(value) => from_datetime(DateTimeValue::Offset(*value)),
        }
    }

    /// Variant name used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::Time(_) => "time",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
            Self::OffsetDateTime(_) => "offset datetime",
        }
    }

    fn is_empty_text(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

scalar_from! {
    String => Text,
    &str => Text,
    bool => Bool,
    i32 => Int,
    i64 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    Decimal => Decimal,
    Time => Time,
    Date => Date,
    PrimitiveDateTime => DateTime,
    OffsetDateTime => OffsetDateTime,
}

impl From<DateTimeValue> for Scalar {
    fn from(value: DateTimeValue) -> Self {
        match value {
            DateTimeValue::Naive(value) => Self::DateTime(value),
            DateTimeValue::Offset(value) => Self::OffsetDateTime(value),
        }
    }
}

/// Types that can be parsed from element text
pub trait FromText: Sized {
    fn from_text(text: &str) -> Result<Self>;
}

impl FromText for String {
    fn from_text(text: &str) -> Result<Self> {
        Ok(to_str(text))
    }
}

impl FromText for bool {
    fn from_text(text: &str) -> Result<Self> {
        Ok(to_bool(text))
    }
}

impl FromText for i64 {
    fn from_text(text: &str) -> Result<Self> {
        to_int(text)
    }
}

impl FromText for f64 {
    fn from_text(text: &str) -> Result<Self> {
        to_float(text)
    }
}

impl FromText for Decimal {
    fn from_text(text: &str) -> Result<Self> {
        to_decimal(text)
    }
}

impl FromText for Time {
    fn from_text(text: &str) -> Result<Self> {
        to_time(text)
    }
}

impl FromText for Date {
    fn from_text(text: &str) -> Result<Self> {
        to_date(text)
    }
}

impl FromText for DateTimeValue {
    fn from_text(text: &str) -> Result<Self> {
        to_datetime(text)
    }
}

fn empty_value() -> Error {
    Error::new(ErrorKind::EmptyValue)
}

/// `1/true/yes` are true, `0/false/no` are false (any case); otherwise non-empty is true
pub fn to_bool(value: &str) -> bool {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => true,
        "0" | "false" | "no" => false,
        _ => !value.is_empty(),
    }
}

pub fn to_str(value: &str) -> String {
    value.to_string()
}

/// Decimal integer, surrounding whitespace allowed
pub fn to_int(value: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|e| Error::conversion(format!("invalid integer {value:?}: {e}")))
}

/// Floating point number, surrounding whitespace allowed
pub fn to_float(value: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .map_err(|e| Error::conversion(format!("invalid float {value:?}: {e}")))
}

/// Exact decimal; a leading `+` and scientific notation are accepted
pub fn to_decimal(value: &str) -> Result<Decimal> {
    let trimmed = value.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    Decimal::from_str(unsigned)
        .or_else(|_| Decimal::from_scientific(unsigned))
        .map_err(|e| Error::conversion(format!("invalid decimal {value:?}: {e}")))
}

/// Accepts `HH`, `HHMM`, `HHMMSS`, `HH:MM`, `HH:MM:SS[.ffffff]`; a trailing zone letter is ignored
pub fn to_time(value: &str) -> Result<Time> {
    if value.is_empty() {
        return Err(empty_value());
    }
    let trimmed = value.trim().trim_end_matches(|c: char| c.is_ascii_alphabetic());
    parse_clock(trimmed).ok_or_else(|| Error::conversion(format!("invalid time {value:?}")))
}

/// Accepts `YYYY-MM-DD` or `YYYYMMDD`, optionally followed by a time part which is ignored
pub fn to_date(value: &str) -> Result<Date> {
    if value.is_empty() {
        return Err(empty_value());
    }
    let (date, _) = split_date_time(value.trim());
    parse_date(date, value)
}

/// Accepts `YYYY-MM-DD[(T| )HH[:MM[:SS[.f]]]][Z|±HH:MM|±HHMM]`
pub fn to_datetime(value: &str) -> Result<DateTimeValue> {
    if value.is_empty() {
        return Err(empty_value());
    }
    let (date_part, time_part) = split_date_time(value.trim());
    let date = parse_date(date_part, value)?;

    let Some(time_part) = time_part else {
        return Ok(DateTimeValue::Naive(PrimitiveDateTime::new(date, Time::MIDNIGHT)));
    };

    let (clock, offset) = split_offset(time_part)
        .ok_or_else(|| Error::conversion(format!("invalid utc offset in {value:?}")))?;
    let time = parse_clock(clock)
        .ok_or_else(|| Error::conversion(format!("invalid datetime {value:?}")))?;
    let naive = PrimitiveDateTime::new(date, time);

    Ok(match offset {
        Some(offset) => DateTimeValue::Offset(naive.assume_offset(offset)),
        None => DateTimeValue::Naive(naive),
    })
}

fn split_date_time(value: &str) -> (&str, Option<&str>) {
    match value.find(['T', ' ']) {
        Some(idx) => {
            let (date, rest) = value.split_at(idx);
            (date, rest.get(1..).map(str::trim).filter(|t| !t.is_empty()))
        }
        None => (value, None),
    }
}

fn parse_date(date: &str, original: &str) -> Result<Date> {
    let format = if date.contains('-') {
        DATE_FORMAT
    } else {
        COMPACT_DATE_FORMAT
    };
    Date::parse(date, format)
        .map_err(|e| Error::conversion(format!("invalid date {original:?}: {e}")))
}

/// Split a trailing `Z` or `±HH[:MM]` offset from a clock string
fn split_offset(value: &str) -> Option<(&str, Option<UtcOffset>)> {
    if let Some(clock) = value.strip_suffix(['Z', 'z']) {
        return Some((clock, Some(UtcOffset::UTC)));
    }
    let Some(idx) = value.rfind(['+', '-']) else {
        return Some((value, None));
    };
    let (clock, offset) = value.split_at(idx);
    let negative = offset.starts_with('-');
    let digits: String = offset.chars().skip(1).filter(|c| *c != ':').collect();
    if digits.len() != 2 && digits.len() != 4 {
        return None;
    }
    let hours: i8 = digits.get(..2)?.parse().ok()?;
    let minutes: i8 = digits.get(2..).filter(|m| !m.is_empty()).map_or(Some(0), |m| m.parse().ok())?;
    let (hours, minutes) = if negative {
        (-hours, -minutes)
    } else {
        (hours, minutes)
    };
    let offset = UtcOffset::from_hms(hours, minutes, 0).ok()?;
    Some((clock, Some(offset)))
}

fn parse_clock(value: &str) -> Option<Time> {
    let (main, fraction) = match value.split_once(['.', ',']) {
        Some((main, fraction)) => (main, Some(fraction)),
        None => (value, None),
    };

    let fields: Vec<&str> = if main.contains(':') {
        main.split(':').collect()
    } else {
        if main.len() % 2 != 0 {
            return None;
        }
        (0..main.len() / 2)
            .map(|i| main.get(i * 2..i * 2 + 2))
            .collect::<Option<Vec<_>>>()?
    };
    if fields.is_empty() || fields.len() > 3 {
        return None;
    }

    let mut parts = [0u8; 3];
    for (slot, field) in parts.iter_mut().zip(&fields) {
        if field.len() != 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = field.parse().ok()?;
    }
    let [hour, minute, second] = parts;

    let micro = match fraction {
        Some(fraction) if fraction.bytes().all(|b| b.is_ascii_digit()) && !fraction.is_empty() => {
            let padded: String = fraction.chars().chain("000000".chars()).take(6).collect();
            padded.parse().ok()?
        }
        Some(_) => return None,
        None => 0,
    };

    Time::from_hms_micro(hour, minute, second, micro).ok()
}

/// `YES` or `NO`
pub fn from_bool(value: bool) -> &'static str {
    if value {
        "YES"
    } else {
        "NO"
    }
}

pub fn from_str(value: &str) -> String {
    value.to_string()
}

pub fn from_int(value: i64) -> String {
    value.to_string()
}

/// Floats always keep a fractional part (`5.0`, `-0.0`)
pub fn from_float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        let sign = if value > 0.0 { "" } else { "-" };
        format!("{sign}inf")
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

pub fn from_decimal(value: &Decimal) -> String {
    value.to_string()
}

/// `HH:MM:SS`, with `.ffffff` when there are microseconds
pub fn from_time(value: Time) -> String {
    let base = value
        .format(TIME_FORMAT)
        .unwrap_or_else(|_| "00:00:00".to_string());
    match value.microsecond() {
        0 => base,
        micro => format!("{base}.{micro:06}"),
    }
}

/// `YYYY-MM-DD`
pub fn from_date(value: Date) -> String {
    value
        .format(DATE_FORMAT)
        .unwrap_or_else(|_| value.to_string())
}

/// Second-precision ISO 8601 with offset; naive values get the local offset
pub fn from_datetime(value: DateTimeValue) -> String {
    let value = value.assume_local();
    let value = value.replace_nanosecond(0).unwrap_or(value);
    value
        .format(OFFSET_DATETIME_FORMAT)
        .unwrap_or_else(|_| value.to_string())
}

fn wrong_type(scalar: &Scalar, expected: &str) -> Error {
    Error::conversion(format!(
        "unexpected type {} of value {scalar:?} (expected {expected})",
        scalar.kind_name()
    ))
}

/// Checked boolean formatter
pub fn format_bool(value: &Scalar) -> Result<String> {
    let truth = match value {
        Scalar::Bool(value) => *value,
        Scalar::Text(text) => to_bool(text),
        Scalar::Int(value) => *value != 0,
        Scalar::Float(value) => *value != 0.0,
        other => return Err(wrong_type(other, "bool")),
    };
    Ok(from_bool(truth).to_string())
}

/// Checked time formatter
pub fn format_time(value: &Scalar) -> Result<String> {
    match value {
        Scalar::Time(value) => Ok(from_time(*value)),
        other => Err(wrong_type(other, "time")),
    }
}

/// Checked date formatter; datetimes are written at second precision
pub fn format_date(value: &Scalar) -> Result<String> {
    if value.is_empty_text() {
        return Err(empty_value());
    }
    match value {
        Scalar::Date(value) => Ok(from_date(*value)),
        Scalar::DateTime(value) => Ok(value
            .replace_nanosecond(0)
            .unwrap_or(*value)
            .format(NAIVE_DATETIME_FORMAT)
            .unwrap_or_else(|_| value.to_string())),
        Scalar::OffsetDateTime(value) => Ok(from_datetime(DateTimeValue::Offset(*value))),
        other => Err(wrong_type(other, "date")),
    }
}

/// Checked datetime formatter
pub fn format_datetime(value: &Scalar) -> Result<String> {
    if value.is_empty_text() {
        return Err(empty_value());
    }
    match value {
        Scalar::DateTime(value) => Ok(from_datetime(DateTimeValue::Naive(*value))),
        Scalar::OffsetDateTime(value) => Ok(from_datetime(DateTimeValue::Offset(*value))),
        other => Err(wrong_type(other, "datetime")),
    }
}
