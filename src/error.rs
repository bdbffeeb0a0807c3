use std::path::PathBuf;

use crate::{evaluator::EvalError, lexer::LexError, parser::ParseError};

/// Any error a query can fail with, from lexing to execution.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),

    /// The source directory itself could not be listed
    #[error("cannot read source '{}': {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
