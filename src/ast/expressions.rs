use std::fmt;

use crate::ast::{BinOp, UnaryOp};
use crate::context::{Attribute, Function};
use crate::value::Value;

/// Abstract Syntax Tree node representing a parsed expression.
///
/// Column and function references are resolved against the context registry
/// while parsing, so an `Expr` never holds an unknown name.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Attribute of the current entry
    ///
    /// # Examples
    /// ```text
    /// size
    /// mtime
    /// ```
    Column(Attribute),

    /// Literal value
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 'txt'
    /// true
    /// ```
    Literal(Value),

    /// Scalar or aggregate function call
    ///
    /// # Examples
    /// ```text
    /// lower(name)
    /// fmtSize(sum(size))
    /// ```
    FunctionCall { function: Function, args: Vec<Expr> },

    /// Binary operation (arithmetic, comparison, logical)
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Unary operation (`not`, `-`)
    UnaryOp { op: UnaryOp, operand: Box<Expr> },
}

impl Expr {
    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// Visits this expression and its children in pre-order.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match self {
            Expr::Column(_) | Expr::Literal(_) => {}
            Expr::FunctionCall { args, .. } => {
                for arg in args {
                    arg.visit(f);
                }
            }
            Expr::BinaryOp { left, right, .. } => {
                left.visit(f);
                right.visit(f);
            }
            Expr::UnaryOp { operand, .. } => operand.visit(f),
        }
    }

    pub fn contains_aggregate(&self) -> bool {
        let mut found = false;
        self.visit(&mut |expr| {
            if let Expr::FunctionCall { function, .. } = expr {
                found |= function.is_aggregate();
            }
        });
        found
    }

    /// Collects the outermost aggregate calls, left to right.
    pub fn collect_aggregates<'a>(&'a self, out: &mut Vec<&'a Expr>) {
        match self {
            Expr::FunctionCall { function, .. } if function.is_aggregate() => out.push(self),
            Expr::FunctionCall { args, .. } => {
                for arg in args {
                    arg.collect_aggregates(out);
                }
            }
            Expr::BinaryOp { left, right, .. } => {
                left.collect_aggregates(out);
                right.collect_aggregates(out);
            }
            Expr::UnaryOp { operand, .. } => operand.collect_aggregates(out),
            Expr::Column(_) | Expr::Literal(_) => {}
        }
    }

    /// Appends every attribute referenced by this expression, without duplicates.
    pub fn collect_attributes(&self, out: &mut Vec<Attribute>) {
        self.visit(&mut |expr| {
            if let Expr::Column(attribute) = expr
                && !out.contains(attribute)
            {
                out.push(*attribute);
            }
        });
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::BinaryOp { op, .. } => op.precedence(),
            Expr::UnaryOp { op, .. } => op.precedence(),
            _ => u8::MAX,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, parenthesize: bool) -> fmt::Result {
        if parenthesize {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

/// Renders the expression back to query syntax; used for column headers and
/// error messages.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(attribute) => f.write_str(attribute.name()),
            Expr::Literal(value) => match value {
                Value::Null => f.write_str("null"),
                Value::String(s) if s.contains('\'') => write!(f, "\"{}\"", s),
                Value::String(s) => write!(f, "'{}'", s),
                Value::Float(n) => write!(f, "{:?}", n),
                Value::Time(_) => write!(f, "'{}'", value),
                other => write!(f, "{}", other),
            },
            Expr::FunctionCall { function, args } => {
                write!(f, "{}(", function.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Expr::BinaryOp { op, left, right } => {
                let precedence = op.precedence();
                left.fmt_child(f, left.precedence() < precedence)?;
                write!(f, " {} ", op)?;
                right.fmt_child(f, right.precedence() <= precedence)
            }
            Expr::UnaryOp { op, operand } => {
                match op {
                    UnaryOp::Not => f.write_str("not ")?,
                    UnaryOp::Negate => f.write_str("-")?,
                }
                operand.fmt_child(f, operand.precedence() < op.precedence())
            }
        }
    }
}
