//! Accumulators for the aggregate functions.
//!
//! Each accumulator folds one argument value per matching row. Partial
//! accumulators built by parallel workers are combined with
//! [`Accumulator::merge`]; every combination is associative, and numeric sums
//! are kept in [`Decimal`] so the merged result does not depend on how the rows
//! were split.

use std::cmp::Ordering;

use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};

use crate::context::Function;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// `count()` counts rows, `count(expr)` counts non-null values
    Count { rows: bool, n: i64 },
    Sum { total: Decimal, float: bool },
    Min(Option<Value>),
    Max(Option<Value>),
    Avg { total: Decimal, n: i64 },
}

impl Accumulator {
    /// Creates the accumulator for an aggregate function, or `None` for a
    /// scalar function.
    pub fn new(function: Function, arg_count: usize) -> Option<Self> {
        let acc = match function {
            Function::Count => Accumulator::Count {
                rows: arg_count == 0,
                n: 0,
            },
            Function::Sum => Accumulator::Sum {
                total: Decimal::ZERO,
                float: false,
            },
            Function::Min => Accumulator::Min(None),
            Function::Max => Accumulator::Max(None),
            Function::Avg => Accumulator::Avg {
                total: Decimal::ZERO,
                n: 0,
            },
            _ => return None,
        };
        Some(acc)
    }

    /// Folds one row's argument values into the accumulator.
    pub fn update(&mut self, args: &[Value]) -> Result<(), String> {
        let value = args.first().unwrap_or(&Value::Null);

        match self {
            Accumulator::Count { rows, n } => {
                if *rows || !value.is_null() {
                    *n += 1;
                }
            }
            Accumulator::Sum { total, float } => {
                if let Some((d, is_float)) = to_decimal(value, "sum")? {
                    *total = checked_add(*total, d)?;
                    *float |= is_float;
                }
            }
            Accumulator::Avg { total, n } => {
                if let Some((d, _)) = to_decimal(value, "avg")? {
                    *total = checked_add(*total, d)?;
                    *n += 1;
                }
            }
            Accumulator::Min(current) => keep(current, value, Ordering::Less)?,
            Accumulator::Max(current) => keep(current, value, Ordering::Greater)?,
        }
        Ok(())
    }

    /// Combines two partial accumulators of the same function. `other` holds
    /// rows that come after `self`'s in traversal order.
    pub fn merge(self, other: Accumulator) -> Result<Accumulator, String> {
        use Accumulator::*;
        match (self, other) {
            (Count { rows, n: a }, Count { n: b, .. }) => Ok(Count { rows, n: a + b }),
            (Sum { total: a, float: fa }, Sum { total: b, float: fb }) => Ok(Sum {
                total: checked_add(a, b)?,
                float: fa || fb,
            }),
            (Avg { total: a, n: na }, Avg { total: b, n: nb }) => Ok(Avg {
                total: checked_add(a, b)?,
                n: na + nb,
            }),
            (Min(mut a), Min(b)) => {
                if let Some(b) = b {
                    keep(&mut a, &b, Ordering::Less)?;
                }
                Ok(Min(a))
            }
            (Max(mut a), Max(b)) => {
                if let Some(b) = b {
                    keep(&mut a, &b, Ordering::Greater)?;
                }
                Ok(Max(a))
            }
            (a, b) => Err(format!("cannot merge {:?} with {:?}", a, b)),
        }
    }

    /// Final value. Over zero rows `count` and `sum` yield 0 and the others null.
    pub fn finalize(self) -> Value {
        match self {
            Accumulator::Count { n, .. } => Value::Integer(n),
            Accumulator::Sum { total, float } => {
                if !float && let Some(n) = total.to_i64() {
                    Value::Integer(n)
                } else {
                    total.to_f64().map(Value::Float).unwrap_or(Value::Null)
                }
            }
            Accumulator::Avg { total, n } => {
                if n == 0 {
                    return Value::Null;
                }
                (total / Decimal::from(n))
                    .to_f64()
                    .map(Value::Float)
                    .unwrap_or(Value::Null)
            }
            Accumulator::Min(v) | Accumulator::Max(v) => v.unwrap_or(Value::Null),
        }
    }
}

fn to_decimal(value: &Value, function: &str) -> Result<Option<(Decimal, bool)>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Integer(n) => Ok(Some((Decimal::from(*n), false))),
        Value::Float(f) => Decimal::from_f64(*f)
            .map(|d| Some((d, true)))
            .ok_or_else(|| format!("{} cannot represent {}", function, f)),
        other => Err(format!(
            "{} expects numeric values, got {}",
            function,
            other.type_name()
        )),
    }
}

fn checked_add(a: Decimal, b: Decimal) -> Result<Decimal, String> {
    a.checked_add(b).ok_or_else(|| "numeric overflow".to_string())
}

/// Replaces `current` with `candidate` when it compares as `wanted`.
fn keep(current: &mut Option<Value>, candidate: &Value, wanted: Ordering) -> Result<(), String> {
    if candidate.is_null() {
        return Ok(());
    }
    match current {
        None => *current = Some(candidate.clone()),
        Some(existing) => {
            if candidate.compare(existing)? == Some(wanted) {
                *current = Some(candidate.clone());
            }
        }
    }
    Ok(())
}
