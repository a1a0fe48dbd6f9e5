//! Argument values and slot converters.
//!
//! Lex hands every slot over as a string.  A [`Converter`] turns that string
//! into a richer [`ArgValue`] before it reaches the handler.  Three built-in
//! converters cover the Lex `AMAZON.DATE`, `AMAZON.TIME` and
//! `AMAZON.DURATION` formats and can be named by shorthand (`"date"`,
//! `"time"`, `"timedelta"`).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, TimeDelta, Utc, Weekday};
use serde_json::Value;

use crate::error::ConvertError;

/// A positional argument passed to an intent handler.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Slot absent and no default registered.
    Null,
    /// Raw slot text (or a text default).
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Duration(TimeDelta),
    /// Anything else a custom converter or default produced.
    Json(Value),
}

impl ArgValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ArgValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Text(s) => Some(s),
            ArgValue::Json(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            ArgValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            ArgValue::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<TimeDelta> {
        match self {
            ArgValue::Duration(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Json(v) => v.as_i64(),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ArgValue::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        ArgValue::Text(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        ArgValue::Text(s)
    }
}

impl From<NaiveDate> for ArgValue {
    fn from(d: NaiveDate) -> Self {
        ArgValue::Date(d)
    }
}

impl From<NaiveTime> for ArgValue {
    fn from(t: NaiveTime) -> Self {
        ArgValue::Time(t)
    }
}

impl From<TimeDelta> for ArgValue {
    fn from(d: TimeDelta) -> Self {
        ArgValue::Duration(d)
    }
}

impl From<i64> for ArgValue {
    fn from(n: i64) -> Self {
        ArgValue::Json(Value::from(n))
    }
}

impl From<f64> for ArgValue {
    fn from(n: f64) -> Self {
        ArgValue::Json(Value::from(n))
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        ArgValue::Json(Value::Bool(b))
    }
}

impl From<Value> for ArgValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => ArgValue::Null,
            other => ArgValue::Json(other),
        }
    }
}

type ConvertFn = dyn Fn(&str) -> Result<ArgValue, ConvertError> + Send + Sync;

/// Turns a filled slot value into an [`ArgValue`].
#[derive(Clone)]
pub enum Converter {
    Date,
    Time,
    Timedelta,
    Custom(Arc<ConvertFn>),
}

impl Converter {
    /// Wrap a caller-supplied conversion function.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<ArgValue, ConvertError> + Send + Sync + 'static,
    {
        Converter::Custom(Arc::new(f))
    }

    pub fn convert(&self, raw: &str) -> Result<ArgValue, ConvertError> {
        match self {
            Converter::Date => to_date(raw).map(ArgValue::Date),
            Converter::Time => to_time(raw).map(ArgValue::Time),
            Converter::Timedelta => to_timedelta(raw).map(ArgValue::Duration),
            Converter::Custom(f) => f(raw),
        }
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Converter::Date => f.write_str("Converter::Date"),
            Converter::Time => f.write_str("Converter::Time"),
            Converter::Timedelta => f.write_str("Converter::Timedelta"),
            Converter::Custom(_) => f.write_str("Converter::Custom(..)"),
        }
    }
}

/// Unknown converter shorthand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownConverter(pub String);

impl fmt::Display for UnknownConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown converter shorthand: '{}'", self.0)
    }
}

impl std::error::Error for UnknownConverter {}

impl FromStr for Converter {
    type Err = UnknownConverter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date" => Ok(Converter::Date),
            "time" => Ok(Converter::Time),
            "timedelta" => Ok(Converter::Timedelta),
            other => Err(UnknownConverter(other.to_string())),
        }
    }
}

// ── Built-in parsers ──────────────────────────────────────────────────────────

/// Parse an `AMAZON.DATE` value.
///
/// Besides plain `YYYY-MM-DD`, Lex resolves vague dates to a week
/// (`2017-W23`), a weekend (`2017-W23-WE`), a month, a year or a decade
/// (`201X`).  Each resolves to its first day; weekends to the Saturday.
pub fn to_date(raw: &str) -> Result<NaiveDate, ConvertError> {
    let err = || ConvertError::Date(raw.to_string());

    if raw == "PRESENT_REF" {
        return Ok(Utc::now().date_naive());
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }

    let parts: Vec<&str> = raw.split('-').collect();
    match parts.as_slice() {
        [year, week] if week.starts_with('W') => {
            iso_week_day(year, &week[1..], Weekday::Mon).ok_or_else(err)
        }
        [year, week, "WE"] if week.starts_with('W') => {
            iso_week_day(year, &week[1..], Weekday::Sat).ok_or_else(err)
        }
        [year, month] => {
            let year = parse_year(year).ok_or_else(err)?;
            let month: u32 = month.parse().map_err(|_| err())?;
            NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(err)
        }
        [decade] if decade.len() == 4 && decade.ends_with('X') => {
            let prefix: i32 = decade[..3].parse().map_err(|_| err())?;
            NaiveDate::from_ymd_opt(prefix * 10, 1, 1).ok_or_else(err)
        }
        [year] => {
            let year = parse_year(year).ok_or_else(err)?;
            NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(err)
        }
        _ => Err(err()),
    }
}

fn parse_year(s: &str) -> Option<i32> {
    if s.len() != 4 {
        return None;
    }
    s.parse().ok()
}

fn iso_week_day(year: &str, week: &str, day: Weekday) -> Option<NaiveDate> {
    let year = parse_year(year)?;
    let week: u32 = week.parse().ok()?;
    NaiveDate::from_isoywd_opt(year, week, day)
}

/// Parse an `AMAZON.TIME` value: `HH:MM`, `HH:MM:SS`, or one of the coarse
/// periods Lex emits for vague answers (`MO`, `AF`, `EV`, `NI`, `AM`, `PM`).
pub fn to_time(raw: &str) -> Result<NaiveTime, ConvertError> {
    let period_hour = match raw {
        "AM" => Some(0),
        "PM" | "AF" => Some(12),
        "MO" => Some(5),
        "EV" => Some(17),
        "NI" => Some(21),
        _ => None,
    };
    if let Some(hour) = period_hour {
        return NaiveTime::from_hms_opt(hour, 0, 0).ok_or_else(|| ConvertError::Time(raw.to_string()));
    }

    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| ConvertError::Time(raw.to_string()))
}

/// Parse an ISO-8601 duration (`P1DT2H`, `PT15M`, `P2W`, `PT1.5S`).
///
/// Years count as 365 days and months as 30 days.
pub fn to_timedelta(raw: &str) -> Result<TimeDelta, ConvertError> {
    let err = || ConvertError::Duration(raw.to_string());

    let body = raw.strip_prefix('P').ok_or_else(err)?;
    if body.is_empty() {
        return Err(err());
    }

    let (date_part, time_part) = match body.split_once('T') {
        Some((_, "")) => return Err(err()),
        Some((d, t)) => (d, Some(t)),
        None => (body, None),
    };

    let mut seconds = 0.0_f64;
    seconds += sum_components(date_part, &[('Y', 365.0 * 86_400.0), ('M', 30.0 * 86_400.0), ('W', 7.0 * 86_400.0), ('D', 86_400.0)])
        .ok_or_else(err)?;
    if let Some(time_part) = time_part {
        seconds += sum_components(time_part, &[('H', 3_600.0), ('M', 60.0), ('S', 1.0)]).ok_or_else(err)?;
    }

    let millis = (seconds * 1_000.0).round();
    if !millis.is_finite() || millis >= i64::MAX as f64 {
        return Err(err());
    }
    TimeDelta::try_milliseconds(millis as i64).ok_or_else(err)
}

/// Sum `<number><designator>` pairs.  Designators must appear in the order
/// given by `units`, each at most once.
fn sum_components(part: &str, units: &[(char, f64)]) -> Option<f64> {
    let mut total = 0.0;
    let mut number = String::new();
    let mut next_unit = 0;

    for c in part.chars() {
        if c.is_ascii_digit() || c == '.' || c == ',' {
            number.push(if c == ',' { '.' } else { c });
            continue;
        }
        let offset = units[next_unit..].iter().position(|(unit, _)| *unit == c)?;
        let (_, scale) = units[next_unit + offset];
        let value: f64 = number.parse().ok()?;
        total += value * scale;
        number.clear();
        next_unit += offset + 1;
    }

    if number.is_empty() { Some(total) } else { None }
}
