//! Cell values returned by drivers and literal values written by cursors.
//!
//! [`Value`] is what a link hands back for one result cell. [`FieldValue`] is
//! what callers put into cursors and statements; it carries enough type
//! information for the connection to render a safe SQL literal.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// Closed set of column types every driver maps its native codes onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Int,
    Real,
    String,
    Date,
    Time,
    Datetime,
    Timestamp,
    Blob,
    Unknown,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Int => "int",
            SemanticType::Real => "real",
            SemanticType::String => "string",
            SemanticType::Date => "date",
            SemanticType::Time => "time",
            SemanticType::Datetime => "datetime",
            SemanticType::Timestamp => "timestamp",
            SemanticType::Blob => "blob",
            SemanticType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One result cell as produced by a link.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn numeric_prefix() -> &'static regex::Regex {
    static NUMERIC_PREFIX: OnceLock<regex::Regex> = OnceLock::new();
    NUMERIC_PREFIX.get_or_init(|| {
        regex::Regex::new(r"^\s*[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?")
            .expect("failed to compile numeric prefix regex")
    })
}

/// True when the whole string reads as a number.
pub(crate) fn is_numeric(s: &str) -> bool {
    numeric_prefix()
        .find(s)
        .map(|m| s[m.end()..].trim().is_empty())
        .unwrap_or(false)
}

/// Leading numeric portion of `s` as a float, 0 when there is none.
fn leading_real(s: &str) -> f64 {
    numeric_prefix()
        .find(s)
        .and_then(|m| m.as_str().trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// String rendering of the cell; NULL becomes the empty string.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Integer(n) => n.to_string(),
            Value::Real(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }

    /// Integer reading of the cell. Text is read up to its first non-numeric
    /// character, so `"12abc"` gives 12 and `"abc"` gives 0.
    pub fn to_integer(&self) -> i64 {
        match self {
            Value::Null => 0,
            Value::Integer(n) => *n,
            Value::Real(f) => f.trunc() as i64,
            Value::Text(s) => leading_real(s).trunc() as i64,
            Value::Blob(b) => leading_real(&String::from_utf8_lossy(b)).trunc() as i64,
        }
    }

    pub fn to_real(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Integer(n) => *n as f64,
            Value::Real(f) => *f,
            Value::Text(s) => leading_real(s),
            Value::Blob(b) => leading_real(&String::from_utf8_lossy(b)),
        }
    }

    /// False for NULL, zero, the empty string and `"0"`.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Integer(n) => *n != 0,
            Value::Real(f) => *f != 0.0,
            Value::Text(s) => !(s.is_empty() || s == "0"),
            Value::Blob(b) => !(b.is_empty() || b.as_slice() == b"0"),
        }
    }

    /// Date-time reading of a text cell (`YYYY-MM-DD[ HH:MM:SS]`).
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        let text = match self {
            Value::Text(s) => s.trim(),
            _ => return None,
        };
        NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Real(f) => Some(*f),
            Value::Text(s) if is_numeric(s) => Some(leading_real(s)),
            _ => None,
        }
    }

    /// Ordering used by static record sorts: NULL first, numbers compared
    /// numerically when both sides are numeric, text otherwise.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            _ => match (self.numeric(), other.numeric()) {
                (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                _ => self.to_text().cmp(&other.to_text()),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Integer(n) => serializer.serialize_i64(*n),
            Value::Real(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Blob(b) => serializer.serialize_str(&String::from_utf8_lossy(b)),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Integer(n) => serde_json::Value::from(*n),
            Value::Real(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Blob(b) => serde_json::Value::String(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Real(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Integer(i64::from(b))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// A value headed into SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    String(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Date(NaiveDateTime),
    /// Raw SQL expression, emitted verbatim (e.g. `NOW()`).
    Expr(String),
}

impl FieldValue {
    pub fn expr(sql: impl Into<String>) -> Self {
        FieldValue::Expr(sql.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub(crate) fn format_date(date: &NaiveDateTime) -> String {
        date.format(DATETIME_FORMAT).to_string()
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&String> for FieldValue {
    fn from(s: &String) -> Self {
        FieldValue::String(s.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Integer(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Integer(i64::from(n))
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        FieldValue::Integer(i64::from(n))
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Real(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(d: NaiveDateTime) -> Self {
        FieldValue::Date(d)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        d.and_hms_opt(0, 0, 0)
            .map(FieldValue::Date)
            .unwrap_or(FieldValue::Null)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => FieldValue::Null,
            Value::Integer(n) => FieldValue::Integer(n),
            Value::Real(f) => FieldValue::Real(f),
            Value::Text(s) => FieldValue::String(s),
            Value::Blob(b) => FieldValue::String(String::from_utf8_lossy(&b).into_owned()),
        }
    }
}
