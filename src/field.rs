//! Structured-Field view over a JSON payload.
//!
//! [`Field`] borrows a JSON object and hands back every nested object as
//! another [`Field`], including objects held inside arrays, so keyed and
//! dotted-path lookups behave the same at any depth.  Raw `serde_json::Map`s
//! never escape through [`Field::get`].
//!
//! Timestamp-named fields are read through the explicit
//! [`Field::timestamp`] accessor.  It fails on absent values instead of
//! returning `None`; callers reading optional timestamps must handle
//! [`FieldError::MissingTimestamp`].

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::error::FieldError;

/// Naive formats accepted after RFC 3339 fails.  Values are taken as UTC.
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Read-only, recursively wrapped view over a JSON object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field<'a> {
    map: &'a Map<String, Value>,
}

/// A present (non-null) value stored under a key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entry<'a> {
    /// Nested object, already wrapped.
    Field(Field<'a>),
    /// Array; elements are wrapped by [`Entry::items`] and [`Entry::item`].
    List(&'a [Value]),
    /// String, number or bool.
    Value(&'a Value),
}

impl<'a> Entry<'a> {
    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Object(map) => Some(Entry::Field(Field { map })),
            Value::Array(items) => Some(Entry::List(items)),
            other => Some(Entry::Value(other)),
        }
    }

    pub fn as_field(&self) -> Option<Field<'a>> {
        match *self {
            Entry::Field(f) => Some(f),
            Entry::List(_) | Entry::Value(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match *self {
            Entry::Value(value) => value.as_str(),
            Entry::Field(_) | Entry::List(_) => None,
        }
    }

    /// Elements of a list entry, `null` elements as `None`.  Empty for
    /// anything that is not a list.
    pub fn items(self) -> impl Iterator<Item = Option<Entry<'a>>> + 'a {
        let items: &'a [Value] = match self {
            Entry::List(items) => items,
            Entry::Field(_) | Entry::Value(_) => &[],
        };
        items.iter().map(Entry::from_value)
    }

    pub fn item(&self, index: usize) -> Option<Entry<'a>> {
        match *self {
            Entry::List(items) => items.get(index).and_then(Entry::from_value),
            Entry::Field(_) | Entry::Value(_) => None,
        }
    }

    /// One path step: a key into a field or an index into a list.
    fn child(&self, segment: &str) -> Option<Entry<'a>> {
        match *self {
            Entry::Field(f) => f.get(segment),
            Entry::List(_) => self.item(segment.parse().ok()?),
            Entry::Value(_) => None,
        }
    }

    /// Text form of the entry: strings verbatim, everything else as JSON.
    pub fn to_text(&self) -> String {
        match self {
            Entry::Value(Value::String(s)) => s.clone(),
            Entry::Value(v) => v.to_string(),
            Entry::Field(f) => Value::Object(f.map.clone()).to_string(),
            Entry::List(items) => Value::Array(items.to_vec()).to_string(),
        }
    }
}

impl<'a> Field<'a> {
    /// Wrap a JSON value; only objects can be wrapped.
    pub fn wrap(value: &'a Value) -> Result<Self, FieldError> {
        match value {
            Value::Object(map) => Ok(Self { map }),
            _ => Err(FieldError::NotAnObject),
        }
    }

    pub fn from_map(map: &'a Map<String, Value>) -> Self {
        Self { map }
    }

    /// Value under `key`.  Missing keys and JSON `null` both read as `None`.
    pub fn get(&self, key: &str) -> Option<Entry<'a>> {
        self.map.get(key).and_then(Entry::from_value)
    }

    /// Dotted lookup, e.g. `"currentIntent.slots.City"`.  Numeric segments
    /// index into lists: `"recentIntentSummaryView.0.intentName"`.
    pub fn path(&self, dotted: &str) -> Option<Entry<'a>> {
        let mut segments = dotted.split('.');
        let mut entry = self.get(segments.next()?)?;
        for segment in segments {
            entry = entry.child(segment)?;
        }
        Some(entry)
    }

    pub fn field(&self, key: &str) -> Option<Field<'a>> {
        self.get(key).and_then(|e| e.as_field())
    }

    pub fn str(&self, key: &str) -> Option<&'a str> {
        self.get(key).and_then(|e| e.as_str())
    }

    /// Parse the value under a timestamp-named key.
    ///
    /// Accepts ISO-8601 strings (naive values are UTC) and numeric epoch
    /// seconds, falling back to epoch milliseconds when the seconds reading
    /// lands past year 9999.  Absent, null or empty values are an error.
    pub fn timestamp(&self, key: &str) -> Result<DateTime<FixedOffset>, FieldError> {
        parse_timestamp(key, self.map.get(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Keys in payload order.
    pub fn keys(self) -> impl Iterator<Item = &'a str> + 'a {
        self.map.keys().map(String::as_str)
    }

    pub fn iter(self) -> impl Iterator<Item = (&'a str, Option<Entry<'a>>)> + 'a {
        self.map.iter().map(|(k, v)| (k.as_str(), Entry::from_value(v)))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn as_map(&self) -> &'a Map<String, Value> {
        self.map
    }
}

fn parse_timestamp(key: &str, value: Option<&Value>) -> Result<DateTime<FixedOffset>, FieldError> {
    let invalid = |value: &Value| FieldError::InvalidTimestamp {
        key: key.to_string(),
        value: value.to_string(),
    };

    let Some(value) = value.filter(|v| !v.is_null() && v.as_str() != Some("")) else {
        return Err(FieldError::MissingTimestamp { key: key.to_string() });
    };

    let parsed = match value {
        Value::String(s) => parse_iso(s),
        Value::Number(n) => n.as_f64().and_then(from_epoch),
        _ => None,
    };
    parsed.ok_or_else(|| invalid(value))
}

fn parse_iso(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc().fixed_offset())
}

fn from_epoch(secs: f64) -> Option<DateTime<FixedOffset>> {
    let mut whole = secs.floor();
    let mut nanos = ((secs - whole) * 1e9).round();
    if nanos >= 1e9 {
        whole += 1.0;
        nanos = 0.0;
    }
    let as_secs = DateTime::<Utc>::from_timestamp(whole as i64, nanos as u32)
        .filter(|dt| dt.year() <= 9999);
    as_secs
        .or_else(|| DateTime::<Utc>::from_timestamp_millis(secs as i64))
        .map(|dt| dt.fixed_offset())
}
