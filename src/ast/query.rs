use crate::ast::Expr;
use crate::context::Attribute;

/// One output column.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub expr: Expr,
    /// Name given with `as`
    pub alias: Option<String>,
}

impl Projection {
    /// Column header: the alias if present, otherwise the expression text
    pub fn header(&self) -> String {
        self.alias.clone().unwrap_or_else(|| self.expr.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// `order by` key referring to a projection by its 1-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKey {
    pub column: usize,
    pub direction: Direction,
}

/// A parsed `select` query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Output columns, in output order
    pub projections: Vec<Projection>,

    /// Path written after `from`
    pub source: String,

    /// `where` predicate
    pub predicate: Option<Expr>,

    /// `order by` keys; empty when the query has no `order by`
    pub order_by: Vec<OrderKey>,

    pub limit: Option<usize>,
}

impl Query {
    /// True when any projection calls an aggregate function, which collapses
    /// the result to a single row.
    pub fn is_aggregate(&self) -> bool {
        self.projections.iter().any(|p| p.expr.contains_aggregate())
    }

    /// Every attribute referenced by the projections or the predicate.
    pub fn referenced_attributes(&self) -> Vec<Attribute> {
        let mut attributes = Vec::new();
        for projection in &self.projections {
            projection.expr.collect_attributes(&mut attributes);
        }
        if let Some(predicate) = &self.predicate {
            predicate.collect_attributes(&mut attributes);
        }
        attributes
    }

    pub fn headers(&self) -> Vec<String> {
        self.projections.iter().map(Projection::header).collect()
    }
}
