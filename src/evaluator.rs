use std::cmp::Ordering;

use crate::{
    ast::{BinOp, Expr, UnaryOp},
    functions::{self, RegexCache},
    row::Row,
    value::Value,
};

/// Evaluation context: the row columns are read from and, once traversal has
/// finished, the finalized aggregate values.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalContext<'a> {
    /// Current row; `None` after an aggregate query matched nothing
    pub row: Option<&'a Row>,
    /// Finalized aggregates, keyed by the call node they belong to
    pub aggregates: Option<&'a [(&'a Expr, Value)]>,
}

impl<'a> EvalContext<'a> {
    pub fn new(row: &'a Row) -> Self {
        EvalContext {
            row: Some(row),
            aggregates: None,
        }
    }

    /// Context for the final pass of an aggregate query
    pub fn with_aggregates(row: Option<&'a Row>, aggregates: &'a [(&'a Expr, Value)]) -> Self {
        EvalContext {
            row,
            aggregates: Some(aggregates),
        }
    }

    fn aggregate(&self, call: &Expr) -> Option<&'a Value> {
        self.aggregates?
            .iter()
            .find(|(node, _)| std::ptr::eq(*node, call))
            .map(|(_, value)| value)
    }
}

/// Errors that can occur during query evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// Operand kinds that an operator cannot combine
    #[error("type mismatch in '{expr}': {message}")]
    TypeMismatch { expr: String, message: String },

    /// Operation that is not valid in the current context
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("division by zero in '{expr}'")]
    DivisionByZero { expr: String },

    /// Scalar function rejected its arguments
    #[error("{function}: {message}")]
    Function {
        function: &'static str,
        message: String,
    },

    /// Aggregate could not fold a value; aborts the whole query
    #[error("aggregate {function}: {message}")]
    Aggregate {
        function: &'static str,
        message: String,
    },
}

/// Expression evaluator.
///
/// Holds only compiled regular expressions; aggregate state lives in the
/// executor, which hands finalized values back through [`EvalContext`].
#[derive(Debug, Default)]
pub struct Evaluator {
    regexes: RegexCache,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patterns compiled so far by `matches`
    pub fn compiled_patterns(&self) -> usize {
        self.regexes.len()
    }

    /// Evaluates an expression.
    ///
    /// # Examples
    ///
    /// ```
    /// use fsq_lang::{Evaluator, EvalContext, Value};
    /// use fsq_lang::context::Attribute;
    /// use fsq_lang::ast::{BinOp, Expr};
    /// use fsq_lang::row::Row;
    ///
    /// let row = Row::from_values([(Attribute::Size, Value::Integer(2048))]);
    /// let expr = Expr::binary(
    ///     BinOp::Divide,
    ///     Expr::Column(Attribute::Size),
    ///     Expr::Literal(Value::Integer(1024)),
    /// );
    ///
    /// let result = Evaluator::new().eval_expr(&expr, &EvalContext::new(&row)).unwrap();
    /// assert_eq!(result, Value::Integer(2));
    /// ```
    pub fn eval_expr(&self, expr: &Expr, context: &EvalContext) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Column(attribute) => Ok(context
                .row
                .map(|row| row.get(*attribute).clone())
                .unwrap_or(Value::Null)),
            Expr::FunctionCall { function, args } => {
                if function.is_aggregate() {
                    return context.aggregate(expr).cloned().ok_or_else(|| {
                        EvalError::UnsupportedOperation(format!(
                            "aggregate '{}' cannot be evaluated per row",
                            expr
                        ))
                    });
                }

                let values = args
                    .iter()
                    .map(|arg| self.eval_expr(arg, context))
                    .collect::<Result<Vec<_>, _>>()?;
                functions::call(*function, &values, &self.regexes).map_err(|message| {
                    EvalError::Function {
                        function: function.name(),
                        message,
                    }
                })
            }
            Expr::BinaryOp { op, left, right } => {
                let left_val = self.eval_expr(left, context)?;
                let right_val = self.eval_expr(right, context)?;
                self.apply_binop(expr, *op, &left_val, &right_val)
            }
            Expr::UnaryOp { op, operand } => {
                let value = self.eval_expr(operand, context)?;
                self.apply_unary(expr, *op, &value)
            }
        }
    }

    /// Evaluates a `where` predicate. Null counts as not matching.
    pub fn eval_predicate(&self, expr: &Expr, context: &EvalContext) -> Result<bool, EvalError> {
        match self.eval_expr(expr, context)? {
            Value::Boolean(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(mismatch(
                expr,
                format!("predicate must be boolean, got {}", other.type_name()),
            )),
        }
    }

    fn apply_binop(
        &self,
        expr: &Expr,
        op: BinOp,
        left: &Value,
        right: &Value,
    ) -> Result<Value, EvalError> {
        match op {
            BinOp::Add | BinOp::Subtract | BinOp::Multiply | BinOp::Divide => {
                self.apply_arithmetic(expr, op, left, right)
            }
            BinOp::Equal => left
                .equals(right)
                .map(Value::Boolean)
                .map_err(|message| mismatch(expr, message)),
            BinOp::NotEqual => left
                .equals(right)
                .map(|eq| Value::Boolean(!eq))
                .map_err(|message| mismatch(expr, message)),
            BinOp::LessThan | BinOp::GreaterThan | BinOp::LessEqual | BinOp::GreaterEqual => {
                let ordering = left
                    .compare(right)
                    .map_err(|message| mismatch(expr, message))?;
                Ok(match ordering {
                    None => Value::Null,
                    Some(ordering) => Value::Boolean(match op {
                        BinOp::LessThan => ordering == Ordering::Less,
                        BinOp::GreaterThan => ordering == Ordering::Greater,
                        BinOp::LessEqual => ordering != Ordering::Greater,
                        _ => ordering != Ordering::Less,
                    }),
                })
            }
            BinOp::And | BinOp::Or => {
                let (a, b) = (logical_operand(expr, left)?, logical_operand(expr, right)?);
                Ok(match (op, a, b) {
                    (BinOp::And, Some(false), _) | (BinOp::And, _, Some(false)) => {
                        Value::Boolean(false)
                    }
                    (BinOp::Or, Some(true), _) | (BinOp::Or, _, Some(true)) => Value::Boolean(true),
                    (BinOp::And, Some(true), Some(true)) => Value::Boolean(true),
                    (BinOp::Or, Some(false), Some(false)) => Value::Boolean(false),
                    // Unknown operand decides nothing
                    _ => Value::Null,
                })
            }
        }
    }

    fn apply_arithmetic(
        &self,
        expr: &Expr,
        op: BinOp,
        left: &Value,
        right: &Value,
    ) -> Result<Value, EvalError> {
        match (left, right) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Integer(a), Value::Integer(b)) => {
                let (a, b) = (*a, *b);
                let result = match op {
                    BinOp::Add => a.checked_add(b),
                    BinOp::Subtract => a.checked_sub(b),
                    BinOp::Multiply => a.checked_mul(b),
                    _ => {
                        if b == 0 {
                            return Err(EvalError::DivisionByZero {
                                expr: expr.to_string(),
                            });
                        }
                        // Exact division stays integral; i64::MIN / -1 overflows
                        match a.checked_rem(b) {
                            Some(0) => a.checked_div(b),
                            Some(_) => return Ok(Value::Float(a as f64 / b as f64)),
                            None => None,
                        }
                    }
                };
                // Overflow widens to float
                Ok(result
                    .map(Value::Integer)
                    .unwrap_or_else(|| float_op(op, a as f64, b as f64)))
            }
            (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
                let (a, b) = (left.as_float(), right.as_float());
                let (Some(a), Some(b)) = (a, b) else {
                    return Ok(Value::Null);
                };
                if op == BinOp::Divide && b == 0.0 {
                    return Err(EvalError::DivisionByZero {
                        expr: expr.to_string(),
                    });
                }
                Ok(float_op(op, a, b))
            }
            (Value::String(a), Value::String(b)) if op == BinOp::Add => {
                Ok(Value::String(format!("{}{}", a, b)))
            }
            (a, b) => Err(mismatch(
                expr,
                format!(
                    "cannot apply '{}' to {} and {}",
                    op,
                    a.type_name(),
                    b.type_name()
                ),
            )),
        }
    }

    fn apply_unary(&self, expr: &Expr, op: UnaryOp, value: &Value) -> Result<Value, EvalError> {
        match (op, value) {
            (_, Value::Null) => Ok(Value::Null),
            (UnaryOp::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
            (UnaryOp::Negate, Value::Integer(n)) => Ok(n
                .checked_neg()
                .map(Value::Integer)
                .unwrap_or(Value::Float(-(*n as f64)))),
            (UnaryOp::Negate, Value::Float(n)) => Ok(Value::Float(-n)),
            (UnaryOp::Not, other) => Err(mismatch(
                expr,
                format!("'not' requires a boolean, got {}", other.type_name()),
            )),
            (UnaryOp::Negate, other) => Err(mismatch(
                expr,
                format!("cannot negate {}", other.type_name()),
            )),
        }
    }
}

fn float_op(op: BinOp, a: f64, b: f64) -> Value {
    Value::Float(match op {
        BinOp::Add => a + b,
        BinOp::Subtract => a - b,
        BinOp::Multiply => a * b,
        _ => a / b,
    })
}

fn logical_operand(expr: &Expr, value: &Value) -> Result<Option<bool>, EvalError> {
    match value {
        Value::Boolean(b) => Ok(Some(*b)),
        Value::Null => Ok(None),
        other => Err(mismatch(
            expr,
            format!("logical operands must be boolean, got {}", other.type_name()),
        )),
    }
}

fn mismatch(expr: &Expr, message: String) -> EvalError {
    EvalError::TypeMismatch {
        expr: expr.to_string(),
        message,
    }
}
