//! Query execution over a directory tree.
//!
//! The executor walks the source directory, materializes a [`Row`] per entry
//! with just the attributes the query references, filters it through the
//! predicate, and either projects it (scalar queries) or folds it into the
//! aggregate accumulators (aggregate queries). Scalar results are then sorted
//! by the `order by` keys and truncated to the `limit`.
//!
//! Row evaluation fans out over `rayon` when [`ExecOptions::parallel`] is set;
//! traversal itself stays sequential so the row order fed into the stable sort
//! is the walker's deterministic order.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;

use crate::{
    aggregate::Accumulator,
    ast::{Direction, Expr, OrderKey, Query},
    context::{Attribute, Registry},
    error::QueryError,
    evaluator::{EvalContext, EvalError, Evaluator},
    row::Row,
    value::{Value, ValueKind},
    walker::{Entry, WalkOptions, Walker},
};

/// Knobs for one execution.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Descend into subdirectories; `false` lists the source directory only
    pub recursive: bool,
    /// Replaces the path written after `from`
    pub source_override: Option<PathBuf>,
    /// Per-row evaluation errors abort the query instead of skipping the row
    pub strict: bool,
    /// Ignore dot-files and everything below dot-directories
    pub skip_hidden: bool,
    /// Evaluate rows on the rayon thread pool
    pub parallel: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        ExecOptions {
            recursive: true,
            source_override: None,
            strict: false,
            skip_hidden: false,
            parallel: true,
        }
    }
}

impl ExecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source_override = Some(source.into());
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn skip_hidden(mut self, skip_hidden: bool) -> Self {
        self.skip_hidden = skip_hidden;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Output column: header text and the kind of its values, when known.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: Option<ValueKind>,
}

/// Ordered, limited query result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, index: usize) -> Vec<&Value> {
        self.rows.iter().filter_map(|row| row.get(index)).collect()
    }
}

impl IntoIterator for ResultSet {
    type Item = Vec<Value>;
    type IntoIter = std::vec::IntoIter<Vec<Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// Partial aggregate state: one accumulator per aggregate call plus the last
/// matching row, which scalar projections of an aggregate query read from.
struct AggState {
    accumulators: Vec<Accumulator>,
    last: Option<Row>,
}

impl AggState {
    fn new(calls: &[&Expr]) -> Self {
        let accumulators = calls
            .iter()
            .filter_map(|call| match call {
                Expr::FunctionCall { function, args } => Accumulator::new(*function, args.len()),
                _ => None,
            })
            .collect();
        AggState {
            accumulators,
            last: None,
        }
    }

    /// `other` covers rows that come after `self`'s.
    fn merge(self, other: AggState, calls: &[&Expr]) -> Result<AggState, QueryError> {
        let accumulators = self
            .accumulators
            .into_iter()
            .zip(other.accumulators)
            .zip(calls)
            .map(|((a, b), call)| a.merge(b).map_err(|message| aggregate_error(call, message)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AggState {
            accumulators,
            last: other.last.or(self.last),
        })
    }
}

/// Runs parsed queries against the filesystem.
pub struct Executor<'r> {
    registry: &'r Registry,
    options: ExecOptions,
    evaluator: Evaluator,
}

impl<'r> Executor<'r> {
    pub fn new(registry: &'r Registry, options: ExecOptions) -> Self {
        Executor {
            registry,
            options,
            evaluator: Evaluator::new(),
        }
    }

    /// Executes a query and returns its ordered, limited rows.
    pub fn execute(&self, query: &Query) -> Result<ResultSet, QueryError> {
        let started = Instant::now();
        let root = match &self.options.source_override {
            Some(path) => path.clone(),
            None => expand_home(&query.source),
        };
        let walker = Walker::new(
            &root,
            WalkOptions {
                recursive: self.options.recursive,
                skip_hidden: self.options.skip_hidden,
            },
        )
        .map_err(|source| QueryError::Source {
            path: root.clone(),
            source,
        })?;

        let attributes = query.referenced_attributes();
        let (rows, visited) = if query.is_aggregate() {
            self.execute_aggregate(query, walker, &attributes)?
        } else {
            self.execute_scalar(query, walker, &attributes)?
        };

        log::info!(
            "{}: visited {} entries, {} result rows in {:?}",
            root.display(),
            visited,
            rows.len(),
            started.elapsed()
        );

        Ok(ResultSet {
            columns: self.columns(query, &rows),
            rows,
        })
    }

    fn execute_scalar(
        &self,
        query: &Query,
        walker: Walker,
        attributes: &[Attribute],
    ) -> Result<(Vec<Vec<Value>>, usize), QueryError> {
        // Without ordering, the first `limit` matches are the answer
        if let Some(limit) = query.limit
            && query.order_by.is_empty()
        {
            let mut rows = Vec::new();
            let mut visited = 0;
            if limit == 0 {
                return Ok((rows, visited));
            }
            for entry in walker {
                visited += 1;
                if let Some(row) = self.scalar_row(query, &entry, attributes)? {
                    rows.push(row);
                    if rows.len() >= limit {
                        log::debug!("limit {} reached, stopping traversal", limit);
                        break;
                    }
                }
            }
            return Ok((rows, visited));
        }

        let entries: Vec<Entry> = walker.collect();
        let visited = entries.len();
        let matched: Vec<Option<Vec<Value>>> = if self.options.parallel {
            entries
                .par_iter()
                .map(|entry| self.scalar_row(query, entry, attributes))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            entries
                .iter()
                .map(|entry| self.scalar_row(query, entry, attributes))
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut rows: Vec<Vec<Value>> = matched.into_iter().flatten().collect();
        if !query.order_by.is_empty() {
            rows.sort_by(|a, b| compare_rows(a, b, &query.order_by));
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok((rows, visited))
    }

    fn execute_aggregate(
        &self,
        query: &Query,
        mut walker: Walker,
        attributes: &[Attribute],
    ) -> Result<(Vec<Vec<Value>>, usize), QueryError> {
        let mut calls = Vec::new();
        for projection in &query.projections {
            projection.expr.collect_aggregates(&mut calls);
        }

        let (state, visited) = if self.options.parallel {
            let entries: Vec<Entry> = walker.collect();
            let state = entries
                .par_iter()
                .try_fold(
                    || AggState::new(&calls),
                    |state, entry| self.fold_row(query, state, entry, &calls, attributes),
                )
                .try_reduce(|| AggState::new(&calls), |a, b| a.merge(b, &calls))?;
            (state, entries.len())
        } else {
            let mut visited = 0;
            let state = walker.try_fold(AggState::new(&calls), |state, entry| {
                visited += 1;
                self.fold_row(query, state, &entry, &calls, attributes)
            })?;
            (state, visited)
        };

        let finals: Vec<(&Expr, Value)> = calls
            .iter()
            .copied()
            .zip(state.accumulators)
            .map(|(call, acc)| (call, acc.finalize()))
            .collect();
        let context = EvalContext::with_aggregates(state.last.as_ref(), &finals);

        let row = query
            .projections
            .iter()
            .map(|projection| self.project(&projection.expr, &context, None))
            .collect::<Result<Vec<_>, _>>()?;

        // A single row; `limit 0` still empties it
        let rows = match query.limit {
            Some(0) => Vec::new(),
            _ => vec![row],
        };
        Ok((rows, visited))
    }

    /// Projected values for a matching entry, `None` when filtered out.
    fn scalar_row(
        &self,
        query: &Query,
        entry: &Entry,
        attributes: &[Attribute],
    ) -> Result<Option<Vec<Value>>, QueryError> {
        let row = Row::materialize(entry, attributes);
        let context = EvalContext::new(&row);
        if !self.matches(query, &context, entry)? {
            return Ok(None);
        }

        query
            .projections
            .iter()
            .map(|projection| self.project(&projection.expr, &context, Some(entry)))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    fn fold_row(
        &self,
        query: &Query,
        mut state: AggState,
        entry: &Entry,
        calls: &[&Expr],
        attributes: &[Attribute],
    ) -> Result<AggState, QueryError> {
        let row = Row::materialize(entry, attributes);
        let context = EvalContext::new(&row);
        if !self.matches(query, &context, entry)? {
            return Ok(state);
        }

        for (acc, call) in state.accumulators.iter_mut().zip(calls) {
            let Expr::FunctionCall { args, .. } = call else {
                continue;
            };
            let values = args
                .iter()
                .map(|arg| self.project(arg, &context, Some(entry)))
                .collect::<Result<Vec<_>, _>>()?;
            acc.update(&values)
                .map_err(|message| aggregate_error(call, message))?;
        }
        state.last = Some(row);
        Ok(state)
    }

    /// Evaluates the predicate. Errors exclude the row unless strict.
    fn matches(
        &self,
        query: &Query,
        context: &EvalContext,
        entry: &Entry,
    ) -> Result<bool, QueryError> {
        let Some(predicate) = &query.predicate else {
            return Ok(true);
        };
        match self.evaluator.eval_predicate(predicate, context) {
            Ok(matched) => Ok(matched),
            Err(e) if self.options.strict => Err(e.into()),
            Err(e) => {
                log::debug!("skipping {}: {}", entry.path.display(), e);
                Ok(false)
            }
        }
    }

    /// Evaluates one expression. Errors become null unless strict.
    fn project(
        &self,
        expr: &Expr,
        context: &EvalContext,
        entry: Option<&Entry>,
    ) -> Result<Value, QueryError> {
        match self.evaluator.eval_expr(expr, context) {
            Ok(value) => Ok(value),
            Err(e) if self.options.strict => Err(e.into()),
            Err(e) => {
                match entry {
                    Some(entry) => log::debug!("{}: {}", entry.path.display(), e),
                    None => log::debug!("{}", e),
                }
                Ok(Value::Null)
            }
        }
    }

    fn columns(&self, query: &Query, rows: &[Vec<Value>]) -> Vec<Column> {
        query
            .projections
            .iter()
            .enumerate()
            .map(|(i, projection)| {
                let kind = rows
                    .iter()
                    .find_map(|row| row.get(i).and_then(Value::kind))
                    .or_else(|| match projection.expr {
                        Expr::Column(attribute) => {
                            self.registry.attribute(attribute).map(|def| def.kind)
                        }
                        _ => None,
                    });
                Column {
                    name: projection.header(),
                    kind,
                }
            })
            .collect()
    }
}

fn compare_rows(a: &[Value], b: &[Value], keys: &[OrderKey]) -> Ordering {
    for key in keys {
        let index = key.column - 1;
        let ordering = match (a.get(index), b.get(index)) {
            (Some(x), Some(y)) => x.sort_cmp(y),
            _ => Ordering::Equal,
        };
        let ordering = match key.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn aggregate_error(call: &Expr, message: String) -> QueryError {
    let function = match call {
        Expr::FunctionCall { function, .. } => function.name(),
        _ => "aggregate",
    };
    EvalError::Aggregate { function, message }.into()
}

/// Expands a leading `~` to `$HOME`; anything else is taken as written.
pub fn expand_home(source: &str) -> PathBuf {
    let home = std::env::var("HOME").ok().map(PathBuf::from);
    match home {
        Some(home) if source == "~" => home,
        Some(home) if source.starts_with("~/") => home.join(&source[2..]),
        _ => Path::new(source).to_path_buf(),
    }
}
