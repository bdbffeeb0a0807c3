//! Execute fsq queries from the command line

use std::path::PathBuf;

use super::CliError;
use crate::context::Registry;
use crate::executor::ExecOptions;
use crate::output::{self, Format};

/// Options for the query command
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Query text; the caller has already read stdin if needed
    pub query: Option<String>,
    /// List the source directory only
    pub flat: bool,
    /// Use this directory instead of the one after `from`
    pub source: Option<PathBuf>,
    pub strict: bool,
    pub skip_hidden: bool,
    /// Evaluate rows on the calling thread
    pub sequential: bool,
    pub format: Format,
    pub pretty: bool,
}

impl QueryOptions {
    fn exec_options(&self) -> ExecOptions {
        let options = ExecOptions::new()
            .recursive(!self.flat)
            .strict(self.strict)
            .skip_hidden(self.skip_hidden)
            .parallel(!self.sequential);
        match &self.source {
            Some(source) => options.source(source.clone()),
            None => options,
        }
    }
}

/// Runs a query and renders its result in the requested format.
pub fn execute_query(options: &QueryOptions, registry: &Registry) -> Result<String, CliError> {
    let query = options
        .query
        .as_deref()
        .filter(|q| !q.trim().is_empty())
        .ok_or(CliError::NoQuery)?;

    log::debug!("running query: {}", query);
    let result = crate::run_query(query, registry, &options.exec_options())?;
    Ok(output::render(&result, options.format, options.pretty))
}
