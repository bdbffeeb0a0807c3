//! Registry introspection: `attributes`, `functions`, `where-functions` and
//! `describe`.

use super::CliError;
use crate::context::{FunctionDef, Registry};

pub fn list_attributes(registry: &Registry) -> String {
    let mut out = String::new();
    for def in registry.attributes() {
        out.push_str(&format!(
            "{:<12} {:<8} {}{}\n",
            def.name(),
            def.kind,
            def.description,
            aliases(def.aliases)
        ));
    }
    out
}

pub fn list_functions(registry: &Registry) -> String {
    format_functions(registry.functions().iter())
}

/// Functions that may appear in a `where` predicate.
pub fn list_where_functions(registry: &Registry) -> String {
    format_functions(registry.where_functions())
}

pub fn describe(registry: &Registry, term: Option<&str>) -> Result<String, CliError> {
    let term = term
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(CliError::TermRequired)?;
    registry
        .describe(term)
        .map(|description| description + "\n")
        .ok_or_else(|| CliError::UnknownTerm(term.to_string()))
}

fn format_functions<'a>(defs: impl Iterator<Item = &'a FunctionDef>) -> String {
    let mut out = String::new();
    for def in defs {
        let signature = format!("{}({})", def.name(), def.arity);
        out.push_str(&format!(
            "{:<16} {}{}\n",
            signature,
            def.description,
            aliases(def.aliases)
        ));
    }
    out
}

fn aliases(aliases: &[&str]) -> String {
    if aliases.is_empty() {
        String::new()
    } else {
        format!(" [{}]", aliases.join(", "))
    }
}
