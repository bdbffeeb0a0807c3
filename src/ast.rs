//! # fsq Query Language - Abstract Syntax Tree
//!
//! This module defines the Abstract Syntax Tree (AST) for fsq, a SQL-like
//! language that queries directory trees the way SQL queries rows in a table.
//!
//! ## Architecture Overview
//!
//! The AST module is organized into focused submodules:
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes (columns, literals, calls, operations)
//! - **[operators]** - Binary and unary operators
//! - **[query]** - Complete query: projections, source, predicate, ordering, limit
//!
//! ## Quick Start
//!
//! ```text
//! select name, fmtSize(size) from ./photos where isImage(mime) order by 2 desc limit 10
//! ```
//!
//! This query lists the ten largest images below `./photos`.
//!
//! ## Core Concepts
//!
//! ### Rows and Columns
//!
//! Every filesystem entry below the source path is a row. Attributes such as
//! `name`, `size`, `mime` or `modified` are its columns; projections are
//! expressions over those columns.
//!
//! ### Aggregates
//!
//! `count`, `sum`, `min`, `max` and `avg` fold every matching row into one
//! value. A query with any aggregate projection returns exactly one row:
//!
//! ```text
//! select count(), fmtSize(sum(size)) from ~/Downloads where is_file
//! ```
//!
//! ### Ordering
//!
//! `order by` refers to projections by 1-based position:
//!
//! ```text
//! select dir, name from . order by 1, 2 desc
//! ```
//!
//! ### Type System
//!
//! Values are strings, integers, floats, booleans, times or null. Mixed
//! integer/float arithmetic widens to float, and a time compared with a string
//! literal parses the literal as a date.
pub mod expressions;
pub mod operators;
pub mod query;
pub mod tokens;

pub use expressions::Expr;
pub use operators::{BinOp, UnaryOp};
pub use query::{Direction, OrderKey, Projection, Query};
pub use tokens::{Lexeme, Token};
