pub mod aggregate;
pub mod ast;
pub mod cli;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod functions;
pub mod lexer;
pub mod mime;
pub mod output;
pub mod parser;
pub mod row;
pub mod value;
pub mod walker;

pub use ast::{BinOp, Expr, Query, Token};
pub use context::{Attribute, Function, Registry};
pub use error::QueryError;
pub use evaluator::{EvalContext, EvalError, Evaluator};
pub use executor::{ExecOptions, Executor, ResultSet};
pub use lexer::{LexError, Lexer, Position};
pub use output::{to_json, to_json_pretty, to_text};
pub use parser::{ParseError, Parser};
pub use value::{Value, ValueKind};

/// Lexes and parses a query, resolving identifiers against `registry`.
///
/// ```
/// use fsq_lang::{Registry, parse};
///
/// let registry = Registry::builtin();
/// let query = parse("select name, size from . order by 2 desc limit 3", &registry).unwrap();
/// assert_eq!(query.source, ".");
/// assert_eq!(query.limit, Some(3));
/// ```
pub fn parse(text: &str, registry: &Registry) -> Result<Query, QueryError> {
    let tokens = Lexer::tokenize(text)?;
    Ok(Parser::new(tokens, registry).parse_query()?)
}

/// Parses and executes a query in one call.
///
/// Lex and parse errors are reported before the filesystem is touched.
pub fn run_query(
    text: &str,
    registry: &Registry,
    options: &ExecOptions,
) -> Result<ResultSet, QueryError> {
    let query = parse(text, registry)?;
    Executor::new(registry, options.clone()).execute(&query)
}
