use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Display format used for time values.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The kind of a value, as declared by attributes in the context registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Boolean,
    Time,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Boolean => "boolean",
            ValueKind::Time => "time",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A value produced while evaluating a query.
///
/// Every attribute of a filesystem entry and every intermediate result of an
/// expression is one of these. `Null` stands for an absent value: an attribute
/// that could not be resolved for an entry, or the result of an operation on an
/// absent operand.
///
/// # Examples
///
/// ```
/// use fsq_lang::Value;
///
/// let size = Value::Integer(1024);
/// let name = Value::String("notes.txt".to_string());
///
/// assert_eq!(size.as_float(), Some(1024.0));
/// assert_eq!(name.as_str(), Some("notes.txt"));
/// assert!(Value::Null.is_null());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value
    Null,

    /// Boolean (true/false)
    Boolean(bool),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// Floating-point number
    Float(f64),

    /// UTF-8 string
    String(String),

    /// Point in time, stored in UTC and displayed in local time
    Time(DateTime<Utc>),
}

impl Value {
    /// Returns the value's kind, or `None` for `Null`.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(ValueKind::Boolean),
            Value::Integer(_) => Some(ValueKind::Integer),
            Value::Float(_) => Some(ValueKind::Float),
            Value::String(_) => Some(ValueKind::String),
            Value::Time(_) => Some(ValueKind::Time),
        }
    }

    /// Human-readable type name, used in error messages
    pub fn type_name(&self) -> &'static str {
        self.kind().map(ValueKind::as_str).unwrap_or("null")
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as float, widening integers
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Compares two values for the ordering operators (`<`, `<=`, `>`, `>=`).
    ///
    /// Returns `Ok(None)` when either side is null. Integers and floats compare
    /// by exact value; a time compared with a string parses the string as a
    /// date. Every other pairing of distinct kinds is a type mismatch.
    pub fn compare(&self, other: &Value) -> Result<Option<Ordering>, String> {
        use Value::*;
        match (self, other) {
            (Null, _) | (_, Null) => Ok(None),
            (Integer(a), Integer(b)) => Ok(Some(a.cmp(b))),
            (Integer(a), Float(b)) => Ok(Some(cmp_int_float(*a, *b))),
            (Float(a), Integer(b)) => Ok(Some(cmp_int_float(*b, *a).reverse())),
            (Float(a), Float(b)) => Ok(Some(cmp_floats(*a, *b))),
            (String(a), String(b)) => Ok(Some(a.as_str().cmp(b.as_str()))),
            (Boolean(a), Boolean(b)) => Ok(Some(a.cmp(b))),
            (Time(a), Time(b)) => Ok(Some(a.cmp(b))),
            (Time(a), String(s)) => parse_time_literal(s)
                .map(|b| Some(a.cmp(&b)))
                .ok_or_else(|| format!("'{}' is not a valid date or time", s)),
            (String(s), Time(b)) => parse_time_literal(s)
                .map(|a| Some(a.cmp(b)))
                .ok_or_else(|| format!("'{}' is not a valid date or time", s)),
            (a, b) => Err(format!(
                "cannot compare {} with {}",
                a.type_name(),
                b.type_name()
            )),
        }
    }

    /// Equality for `=` and `!=`. Null equals only null.
    pub fn equals(&self, other: &Value) -> Result<bool, String> {
        match (self, other) {
            (Value::Null, Value::Null) => Ok(true),
            (Value::Null, _) | (_, Value::Null) => Ok(false),
            _ => self
                .compare(other)
                .map(|ordering| ordering == Some(Ordering::Equal)),
        }
    }

    /// Total order used by `order by`.
    ///
    /// Values order by kind rank first (null, boolean, number, string, time),
    /// so a string never sorts among times even when it parses as a date.
    /// Within a rank, [`Value::compare`] decides; integers and floats share a
    /// rank and compare exactly.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        self.sort_rank()
            .cmp(&other.sort_rank())
            .then_with(|| match self.compare(other) {
                Ok(Some(ordering)) => ordering,
                _ => Ordering::Equal,
            })
    }

    fn sort_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) | Value::Float(_) => 2,
            Value::String(_) => 3,
            Value::Time(_) => 4,
        }
    }
}

/// NaN sorts above every number; zeros of either sign are equal.
fn cmp_floats(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Compares without rounding `a` through `f64`, which loses precision past 2^53.
fn cmp_int_float(a: i64, b: f64) -> Ordering {
    // 2^63, the first float above i64::MAX
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if b.is_nan() || b >= LIMIT {
        return Ordering::Less;
    }
    if b < -LIMIT {
        return Ordering::Greater;
    }
    let whole = b.trunc();
    a.cmp(&(whole as i64)).then_with(|| cmp_floats(0.0, b - whole))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
            Value::Time(t) => write!(f, "{}", t.with_timezone(&Local).format(TIME_FORMAT)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Time(t)
    }
}

/// Parses a date or time literal as written in a query.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`
/// (all interpreted in local time) and RFC 3339.
pub fn parse_time_literal(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Some(t.with_timezone(&Utc));
    }

    let naive = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}
