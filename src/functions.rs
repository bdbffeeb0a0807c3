//! Bodies of the built-in scalar functions.
//!
//! Arguments arrive already evaluated. A null argument in a position that
//! requires a value makes the result null; a value of the wrong kind is an
//! error message, which the evaluator wraps with the function name.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::format::{Item, StrftimeItems};
use chrono::{Datelike, Local};
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy, prelude::FromPrimitive, prelude::ToPrimitive};

use crate::context::Function;
use crate::mime;
use crate::value::{TIME_FORMAT, Value};

const SIZE_UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Upper bound for precision arguments (`fmtSize`, `round`)
const MAX_PRECISION: i64 = 12;

/// Patterns kept compiled; a pattern computed per row would otherwise grow
/// the cache without bound
const MAX_CACHED_PATTERNS: usize = 64;

/// Compiled `matches` patterns, shared by every row of a query.
#[derive(Debug, Default)]
pub struct RegexCache {
    compiled: RwLock<HashMap<String, Regex>>,
}

impl RegexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the compiled pattern, compiling it on first use.
    pub fn get(&self, pattern: &str) -> Result<Regex, String> {
        if let Ok(compiled) = self.compiled.read()
            && let Some(regex) = compiled.get(pattern)
        {
            return Ok(regex.clone());
        }

        let regex = Regex::new(pattern)
            .map_err(|e| format!("invalid regular expression '{}': {}", pattern, e))?;
        if let Ok(mut compiled) = self.compiled.write()
            && compiled.len() < MAX_CACHED_PATTERNS
        {
            compiled.insert(pattern.to_string(), regex.clone());
        }
        Ok(regex)
    }

    pub fn len(&self) -> usize {
        self.compiled.read().map(|compiled| compiled.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Calls a scalar function. Aggregates are folded by
/// [`Accumulator`](crate::aggregate::Accumulator) instead.
pub fn call(function: Function, args: &[Value], regexes: &RegexCache) -> Result<Value, String> {
    match function {
        Function::Lower => map_string(args, |s| Value::String(s.to_lowercase())),
        Function::Upper => map_string(args, |s| Value::String(s.to_uppercase())),
        Function::Trim => map_string(args, |s| Value::String(s.trim().to_string())),
        Function::Length => map_string(args, |s| Value::Integer(s.chars().count() as i64)),
        Function::Concat => Ok(Value::String(
            args.iter()
                .filter(|v| !v.is_null())
                .map(Value::to_string)
                .collect(),
        )),
        Function::Substr => substr(args),
        Function::Replace => {
            let (Some(s), Some(from), Some(to)) = (
                string_arg(args, 0)?,
                string_arg(args, 1)?,
                string_arg(args, 2)?,
            ) else {
                return Ok(Value::Null);
            };
            Ok(Value::String(s.replace(from, to)))
        }
        Function::Contains => compare_strings(args, |s, needle| s.contains(needle)),
        Function::StartsWith => compare_strings(args, |s, prefix| s.starts_with(prefix)),
        Function::EndsWith => compare_strings(args, |s, suffix| s.ends_with(suffix)),
        Function::Matches => {
            let (Some(s), Some(pattern)) = (string_arg(args, 0)?, string_arg(args, 1)?) else {
                return Ok(Value::Null);
            };
            Ok(Value::Boolean(regexes.get(pattern)?.is_match(s)))
        }
        Function::FmtSize => fmt_size(args),
        Function::FmtTime => fmt_time(args),
        Function::Year => map_time(args, |t| t.year() as i64),
        Function::Month => map_time(args, |t| t.month() as i64),
        Function::Day => map_time(args, |t| t.day() as i64),
        Function::Abs => match arg(args, 0) {
            Value::Null => Ok(Value::Null),
            Value::Integer(n) => n
                .checked_abs()
                .map(Value::Integer)
                .ok_or_else(|| "integer overflow".to_string()),
            Value::Float(n) => Ok(Value::Float(n.abs())),
            other => Err(expected("a number", other)),
        },
        Function::Round => round(args),
        Function::Coalesce => Ok(args
            .iter()
            .find(|v| !v.is_null())
            .cloned()
            .unwrap_or(Value::Null)),
        Function::IsText => classify(args, mime::is_text),
        Function::IsImage => classify(args, mime::is_image),
        Function::IsPdf => classify(args, mime::is_pdf),
        Function::IsAudio => classify(args, mime::is_audio),
        Function::IsVideo => classify(args, mime::is_video),
        Function::IsArchive => classify(args, mime::is_archive),
        Function::Count | Function::Sum | Function::Min | Function::Max | Function::Avg => Err(
            "aggregate function cannot be evaluated against a single row".to_string(),
        ),
    }
}

static NULL: Value = Value::Null;

fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&NULL)
}

fn expected(what: &str, got: &Value) -> String {
    format!("expected {}, got {}", what, got.type_name())
}

fn string_arg(args: &[Value], index: usize) -> Result<Option<&str>, String> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(expected("a string", other)),
    }
}

fn int_arg(args: &[Value], index: usize) -> Result<Option<i64>, String> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Integer(n)) => Ok(Some(*n)),
        Some(other) => Err(expected("an integer", other)),
    }
}

fn precision_arg(args: &[Value], index: usize, default: i64) -> Result<usize, String> {
    let precision = int_arg(args, index)?.unwrap_or(default);
    if !(0..=MAX_PRECISION).contains(&precision) {
        return Err(format!(
            "precision must be between 0 and {}, got {}",
            MAX_PRECISION, precision
        ));
    }
    Ok(precision as usize)
}

fn map_string(args: &[Value], f: impl Fn(&str) -> Value) -> Result<Value, String> {
    Ok(string_arg(args, 0)?.map(f).unwrap_or(Value::Null))
}

fn compare_strings(args: &[Value], f: impl Fn(&str, &str) -> bool) -> Result<Value, String> {
    match (string_arg(args, 0)?, string_arg(args, 1)?) {
        (Some(s), Some(other)) => Ok(Value::Boolean(f(s, other))),
        _ => Ok(Value::Null),
    }
}

fn map_time(args: &[Value], f: impl Fn(chrono::DateTime<Local>) -> i64) -> Result<Value, String> {
    match arg(args, 0) {
        Value::Null => Ok(Value::Null),
        Value::Time(t) => Ok(Value::Integer(f(t.with_timezone(&Local)))),
        other => Err(expected("a time", other)),
    }
}

fn classify(args: &[Value], f: fn(&str) -> bool) -> Result<Value, String> {
    Ok(string_arg(args, 0)?
        .map(|m| Value::Boolean(f(m)))
        .unwrap_or(Value::Null))
}

fn substr(args: &[Value]) -> Result<Value, String> {
    let (Some(s), Some(start)) = (string_arg(args, 0)?, int_arg(args, 1)?) else {
        return Ok(Value::Null);
    };
    let skip = usize::try_from(start.saturating_sub(1)).unwrap_or(0);
    let chars = s.chars().skip(skip);

    let result = match int_arg(args, 2)? {
        Some(len) if len < 0 => return Err(format!("length must not be negative, got {}", len)),
        Some(len) => chars.take(len as usize).collect(),
        None => chars.collect(),
    };
    Ok(Value::String(result))
}

fn fmt_size(args: &[Value]) -> Result<Value, String> {
    let precision = precision_arg(args, 1, 1)?;
    let bytes = match arg(args, 0) {
        Value::Null => return Ok(Value::Null),
        Value::Integer(n) => *n as f64,
        Value::Float(n) => *n,
        other => return Err(expected("a numeric size", other)),
    };
    Ok(Value::String(format_size(bytes, precision)))
}

/// Formats a byte count with binary units: `512 B`, `1.5 KiB`, `3.2 GiB`.
pub fn format_size(bytes: f64, precision: usize) -> String {
    let sign = if bytes < 0.0 { "-" } else { "" };
    let mut size = bytes.abs();
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{}{} {}", sign, size.round(), SIZE_UNITS[0])
    } else {
        format!("{}{:.*} {}", sign, precision, size, SIZE_UNITS[unit])
    }
}

fn fmt_time(args: &[Value]) -> Result<Value, String> {
    let time = match arg(args, 0) {
        Value::Null => return Ok(Value::Null),
        Value::Time(t) => t.with_timezone(&Local),
        other => return Err(expected("a time", other)),
    };
    let pattern = string_arg(args, 1)?.unwrap_or(TIME_FORMAT);

    let items: Vec<Item> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(format!("invalid time format '{}'", pattern));
    }
    Ok(Value::String(
        time.format_with_items(items.into_iter()).to_string(),
    ))
}

fn round(args: &[Value]) -> Result<Value, String> {
    let places = precision_arg(args, 1, 0)?;
    match arg(args, 0) {
        Value::Null => Ok(Value::Null),
        Value::Integer(n) => Ok(Value::Integer(*n)),
        Value::Float(n) => {
            let rounded = Decimal::from_f64(*n)
                .map(|d| {
                    d.round_dp_with_strategy(places as u32, RoundingStrategy::MidpointAwayFromZero)
                })
                .and_then(|d| d.to_f64())
                .unwrap_or_else(|| {
                    let factor = 10f64.powi(places as i32);
                    (n * factor).round() / factor
                });
            Ok(Value::Float(rounded))
        }
        other => Err(expected("a number", other)),
    }
}
