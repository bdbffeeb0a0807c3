//! Rendering of query results.
//!
//! Two formats are supported: tab-separated text with a header line, and JSON.
//! Renderers never reorder or drop rows.
//!
//! # Examples
//!
//! ```
//! use fsq_lang::Value;
//! use fsq_lang::executor::{Column, ResultSet};
//! use fsq_lang::output::{to_json, to_text};
//!
//! let result = ResultSet {
//!     columns: vec![Column { name: "name".to_string(), kind: None }],
//!     rows: vec![vec![Value::from("a.txt")]],
//! };
//!
//! assert_eq!(to_text(&result), "name\na.txt\n");
//! assert_eq!(to_json(&result), r#"{"columns":["name"],"rows":[["a.txt"]]}"#);
//! ```

use serde_json::{Number, Value as Json, json};

use crate::executor::ResultSet;
use crate::value::Value;

/// Output format of the command-line tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// Tab-separated rows under a header line. Null renders as an empty cell.
pub fn to_text(result: &ResultSet) -> String {
    let mut out = result.column_names().join("\t");
    out.push('\n');
    for row in &result.rows {
        let cells: Vec<String> = row.iter().map(|v| escape_cell(&v.to_string())).collect();
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    out
}

// Tabs and newlines inside a value would break the row structure
fn escape_cell(cell: &str) -> String {
    cell.replace('\t', "\\t").replace('\n', "\\n")
}

/// Converts a value to JSON. Times render in the same format as text output;
/// non-finite floats have no JSON form and become null.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(*b),
        Value::Integer(n) => Json::from(*n),
        Value::Float(n) => Number::from_f64(*n).map(Json::Number).unwrap_or(Json::Null),
        Value::String(s) => Json::String(s.clone()),
        Value::Time(_) => Json::String(value.to_string()),
    }
}

pub fn result_to_json(result: &ResultSet) -> Json {
    let rows: Vec<Json> = result
        .rows
        .iter()
        .map(|row| Json::Array(row.iter().map(value_to_json).collect()))
        .collect();
    json!({
        "columns": result.column_names(),
        "rows": rows,
    })
}

/// Compact JSON.
pub fn to_json(result: &ResultSet) -> String {
    result_to_json(result).to_string()
}

/// JSON with two-space indentation.
pub fn to_json_pretty(result: &ResultSet) -> String {
    format!("{:#}", result_to_json(result))
}

pub fn render(result: &ResultSet, format: Format, pretty: bool) -> String {
    match (format, pretty) {
        (Format::Text, _) => to_text(result),
        (Format::Json, false) => to_json(result),
        (Format::Json, true) => to_json_pretty(result),
    }
}
