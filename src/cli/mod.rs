//! CLI support for fsq-lang
//!
//! Provides programmatic access to the `fsq` subcommands so they can be
//! embedded in other tools without going through argument parsing.

mod listing;
mod run;

pub use listing::{describe, list_attributes, list_functions, list_where_functions};
pub use run::{QueryOptions, execute_query};

use std::io;

use crate::error::QueryError;

/// Errors that can occur during CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// No query argument and nothing on stdin
    #[error("No query provided. Pass one as an argument or pipe it to stdin.")]
    NoQuery,

    #[error("describe requires a term: fsq describe --term <TERM>")]
    TermRequired,

    #[error("Unknown term: '{0}'\nRun 'fsq attributes' or 'fsq functions' to see what is available.")]
    UnknownTerm(String),
}
