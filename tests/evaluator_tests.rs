// tests/evaluator_tests.rs

use std::cmp::Ordering;

use chrono::{TimeZone, Utc};
use fsq_lang::aggregate::Accumulator;
use fsq_lang::context::{Attribute, Function, Registry};
use fsq_lang::evaluator::{EvalContext, EvalError, Evaluator};
use fsq_lang::row::Row;
use fsq_lang::{Expr, Value, parse};

fn expr(text: &str) -> Expr {
    let registry = Registry::builtin();
    let query = parse(&format!("select {} from .", text), &registry).unwrap();
    query.projections.into_iter().next().unwrap().expr
}

fn sample_row() -> Row {
    Row::from_values([
        (Attribute::Name, Value::from("notes.txt")),
        (Attribute::Size, Value::Integer(1536)),
        (Attribute::Extension, Value::from("txt")),
        (Attribute::Mime, Value::from("text/plain")),
        (Attribute::IsDir, Value::Boolean(false)),
        (
            Attribute::Modified,
            Value::Time(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()),
        ),
    ])
}

fn eval_with(text: &str, row: &Row) -> Result<Value, EvalError> {
    Evaluator::new().eval_expr(&expr(text), &EvalContext::new(row))
}

fn eval(text: &str) -> Result<Value, EvalError> {
    eval_with(text, &sample_row())
}

// ============================================================================
// Arithmetic
// ============================================================================

#[test]
fn test_integer_arithmetic() {
    assert_eq!(eval("size + 1"), Ok(Value::Integer(1537)));
    assert_eq!(eval("size - 36"), Ok(Value::Integer(1500)));
    assert_eq!(eval("2 * 3 + 1"), Ok(Value::Integer(7)));
}

#[test]
fn test_mixed_arithmetic_widens_to_float() {
    assert_eq!(eval("size * 0.5"), Ok(Value::Float(768.0)));
    assert_eq!(eval("1 + 0.5"), Ok(Value::Float(1.5)));
}

#[test]
fn test_division() {
    assert_eq!(eval("size / 512"), Ok(Value::Integer(3)));
    assert_eq!(eval("7 / 2"), Ok(Value::Float(3.5)));
}

#[test]
fn test_division_by_zero() {
    assert!(matches!(eval("size / 0"), Err(EvalError::DivisionByZero { .. })));
    assert!(matches!(eval("1.5 / 0"), Err(EvalError::DivisionByZero { .. })));
}

#[test]
fn test_min_integer_divided_by_minus_one_widens() {
    assert_eq!(
        eval("(-9223372036854775807 - 1) / -1"),
        Ok(Value::Float(9_223_372_036_854_775_808.0))
    );
    assert_eq!(
        eval("(-9223372036854775807 - 1) / 2"),
        Ok(Value::Integer(i64::MIN / 2))
    );
}

#[test]
fn test_string_concatenation() {
    assert_eq!(eval("name + '.bak'"), Ok(Value::from("notes.txt.bak")));
}

#[test]
fn test_arithmetic_type_mismatch() {
    let err = eval("name - 1").unwrap_err();
    match err {
        EvalError::TypeMismatch { expr, message } => {
            assert_eq!(expr, "name - 1");
            assert!(message.contains("string"));
        }
        other => panic!("Expected type mismatch, got {:?}", other),
    }
}

// ============================================================================
// Comparison and logic
// ============================================================================

#[test]
fn test_comparisons() {
    assert_eq!(eval("size > 1024"), Ok(Value::Boolean(true)));
    assert_eq!(eval("size <= 1024"), Ok(Value::Boolean(false)));
    assert_eq!(eval("size = 1536.0"), Ok(Value::Boolean(true)));
    assert_eq!(eval("extension != 'md'"), Ok(Value::Boolean(true)));
    assert_eq!(eval("name < 'zzz'"), Ok(Value::Boolean(true)));
}

#[test]
fn test_string_number_comparison_is_an_error() {
    let err = eval("name > 5").unwrap_err();
    assert!(matches!(err, EvalError::TypeMismatch { ref expr, .. } if expr == "name > 5"));
}

#[test]
fn test_time_compared_with_date_literal() {
    assert_eq!(eval("modified > '2024-01-01'"), Ok(Value::Boolean(true)));
    assert_eq!(eval("modified < '2023-12-31 23:59:59'"), Ok(Value::Boolean(false)));
    assert!(matches!(
        eval("modified > 'yesterday'"),
        Err(EvalError::TypeMismatch { .. })
    ));
}

#[test]
fn test_logical_operators() {
    assert_eq!(eval("size > 1 and not is_dir"), Ok(Value::Boolean(true)));
    assert_eq!(eval("is_dir or size < 1"), Ok(Value::Boolean(false)));
    assert!(matches!(eval("size and true"), Err(EvalError::TypeMismatch { .. })));
    assert!(matches!(eval("not name"), Err(EvalError::TypeMismatch { .. })));
}

#[test]
fn test_three_valued_logic() {
    assert_eq!(eval("null and false"), Ok(Value::Boolean(false)));
    assert_eq!(eval("null or true"), Ok(Value::Boolean(true)));
    assert_eq!(eval("null and true"), Ok(Value::Null));
    assert_eq!(eval("not null"), Ok(Value::Null));
}

#[test]
fn test_null_propagation() {
    let row = Row::default();

    assert_eq!(eval_with("size + 1", &row), Ok(Value::Null));
    assert_eq!(eval_with("size > 1", &row), Ok(Value::Null));
    assert_eq!(eval_with("lower(name)", &row), Ok(Value::Null));
    assert_eq!(eval_with("extension = null", &row), Ok(Value::Boolean(true)));
    assert_eq!(eval_with("extension != 'txt'", &row), Ok(Value::Boolean(true)));
}

#[test]
fn test_null_predicate_does_not_match() {
    let row = Row::default();
    let evaluator = Evaluator::new();

    let matched = evaluator.eval_predicate(&expr("size > 1"), &EvalContext::new(&row));
    assert_eq!(matched, Ok(false));
}

#[test]
fn test_non_boolean_predicate() {
    let row = sample_row();
    let evaluator = Evaluator::new();

    let matched = evaluator.eval_predicate(&expr("size"), &EvalContext::new(&row));
    assert!(matches!(matched, Err(EvalError::TypeMismatch { .. })));
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_sort_mixed_time_and_string_column() {
    let time = Value::Time(Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap());
    let date = Value::from("2020-06-01");
    let word = Value::from("3000");

    // Times rank after strings, whether or not the string parses as a date
    assert_eq!(time.sort_cmp(&date), Ordering::Greater);
    assert_eq!(date.sort_cmp(&word), Ordering::Less);
    assert_eq!(word.sort_cmp(&time), Ordering::Less);

    let expected = vec![Value::Null, date.clone(), word.clone(), time.clone()];
    let layouts = [
        vec![time.clone(), date.clone(), word.clone(), Value::Null],
        vec![word.clone(), Value::Null, time.clone(), date.clone()],
        vec![date.clone(), time.clone(), Value::Null, word.clone()],
    ];
    for mut column in layouts {
        column.sort_by(Value::sort_cmp);
        assert_eq!(column, expected);
    }
}

#[test]
fn test_integer_float_ordering_is_exact() {
    let big = Value::Integer(9_007_199_254_740_993);
    let float = Value::Float(9_007_199_254_740_992.0);

    assert_eq!(big.sort_cmp(&float), Ordering::Greater);
    assert_eq!(float.sort_cmp(&big), Ordering::Less);
    assert_eq!(Value::Integer(0).sort_cmp(&Value::Float(-0.0)), Ordering::Equal);
    assert_eq!(Value::Integer(-1).sort_cmp(&Value::Float(-1.5)), Ordering::Greater);
    assert_eq!(Value::Integer(i64::MAX).sort_cmp(&Value::Float(f64::INFINITY)), Ordering::Less);
    assert_eq!(Value::Float(f64::NAN).sort_cmp(&Value::Integer(i64::MAX)), Ordering::Greater);
    assert_eq!(Value::Integer(3).sort_cmp(&Value::Float(3.0)), Ordering::Equal);
}

// ============================================================================
// Scalar functions
// ============================================================================

#[test]
fn test_string_functions() {
    assert_eq!(eval("upper(name)"), Ok(Value::from("NOTES.TXT")));
    assert_eq!(eval("lower('ABC')"), Ok(Value::from("abc")));
    assert_eq!(eval("length(name)"), Ok(Value::Integer(9)));
    assert_eq!(eval("trim('  x ')"), Ok(Value::from("x")));
    assert_eq!(eval("substr(name, 1, 5)"), Ok(Value::from("notes")));
    assert_eq!(eval("substr(name, 7)"), Ok(Value::from("txt")));
    assert_eq!(eval("replace(name, 'txt', 'md')"), Ok(Value::from("notes.md")));
    assert_eq!(eval("concat(name, ':', size)"), Ok(Value::from("notes.txt:1536")));
}

#[test]
fn test_predicate_functions() {
    assert_eq!(eval("contains(name, 'tes')"), Ok(Value::Boolean(true)));
    assert_eq!(eval("startsWith(name, 'no')"), Ok(Value::Boolean(true)));
    assert_eq!(eval("ends_with(name, '.md')"), Ok(Value::Boolean(false)));
    assert_eq!(eval("matches(name, '^n.*[.]txt$')"), Ok(Value::Boolean(true)));
}

#[test]
fn test_invalid_regex() {
    let err = eval("matches(name, '(')").unwrap_err();
    assert!(matches!(err, EvalError::Function { function: "matches", .. }));
}

#[test]
fn test_regex_compiled_once_per_pattern() {
    let evaluator = Evaluator::new();
    let pattern = expr("matches(name, '^n.*[.]txt$')");

    for name in ["notes.txt", "nope.md", "n.txt"] {
        let row = Row::from_values([(Attribute::Name, Value::from(name))]);
        evaluator
            .eval_expr(&pattern, &EvalContext::new(&row))
            .unwrap();
    }
    assert_eq!(evaluator.compiled_patterns(), 1);

    let invalid = expr("matches(name, '(')");
    assert!(evaluator.eval_expr(&invalid, &EvalContext::new(&sample_row())).is_err());
    assert_eq!(evaluator.compiled_patterns(), 1);
}

#[test]
fn test_fmt_size() {
    assert_eq!(eval("fmtSize(size)"), Ok(Value::from("1.5 KiB")));
    assert_eq!(eval("fmtSize(size, 2)"), Ok(Value::from("1.50 KiB")));
    assert_eq!(eval("fmtSize(10)"), Ok(Value::from("10 B")));
    assert_eq!(eval("fmtSize(3 * 1024 * 1024)"), Ok(Value::from("3.0 MiB")));
}

#[test]
fn test_fmt_size_rejects_strings() {
    let err = eval("fmtSize(name)").unwrap_err();
    assert!(matches!(err, EvalError::Function { function: "fmtSize", .. }));
}

#[test]
fn test_mime_classification() {
    assert_eq!(eval("isText(mime)"), Ok(Value::Boolean(true)));
    assert_eq!(eval("isImage(mime)"), Ok(Value::Boolean(false)));
    assert_eq!(eval("isImage('image/png')"), Ok(Value::Boolean(true)));
    assert_eq!(eval("isText('application/json')"), Ok(Value::Boolean(true)));
    assert_eq!(eval("isPdf('application/pdf')"), Ok(Value::Boolean(true)));
    assert_eq!(eval("isAudio('audio/mpeg')"), Ok(Value::Boolean(true)));
    assert_eq!(eval("isVideo('video/mp4')"), Ok(Value::Boolean(true)));
    assert_eq!(eval("isArchive('application/zip')"), Ok(Value::Boolean(true)));
}

#[test]
fn test_numeric_functions() {
    assert_eq!(eval("abs(-5)"), Ok(Value::Integer(5)));
    assert_eq!(eval("round(2.5)"), Ok(Value::Float(3.0)));
    assert_eq!(eval("round(1.25, 1)"), Ok(Value::Float(1.3)));
    assert!(matches!(
        eval("round(1.5, 20)"),
        Err(EvalError::Function { function: "round", .. })
    ));
}

#[test]
fn test_time_functions() {
    assert_eq!(eval("year(modified)"), Ok(Value::Integer(2024)));
    assert_eq!(eval("month(modified)"), Ok(Value::Integer(6)));
    assert_eq!(eval("fmtTime(modified, '%Y')"), Ok(Value::from("2024")));
}

#[test]
fn test_coalesce() {
    let row = Row::default();
    assert_eq!(eval_with("coalesce(extension, 'none')", &row), Ok(Value::from("none")));
    assert_eq!(eval("coalesce(extension, 'none')"), Ok(Value::from("txt")));
}

// ============================================================================
// Aggregates
// ============================================================================

#[test]
fn test_aggregate_needs_final_context() {
    let err = eval("count()").unwrap_err();
    assert!(matches!(err, EvalError::UnsupportedOperation(_)));
}

#[test]
fn test_aggregate_values_from_context() {
    let projection = expr("fmtSize(sum(size) + 1)");
    let mut calls = Vec::new();
    projection.collect_aggregates(&mut calls);
    assert_eq!(calls.len(), 1);

    let finals = vec![(calls[0], Value::Integer(2047))];
    let context = EvalContext::with_aggregates(None, &finals);
    let result = Evaluator::new().eval_expr(&projection, &context);

    assert_eq!(result, Ok(Value::from("2.0 KiB")));
}

fn fold(function: Function, arg_count: usize, values: &[Value]) -> Accumulator {
    let mut acc = Accumulator::new(function, arg_count).unwrap();
    for value in values {
        acc.update(std::slice::from_ref(value)).unwrap();
    }
    acc
}

#[test]
fn test_count() {
    let values = [Value::Integer(1), Value::Null, Value::Integer(3)];

    assert_eq!(fold(Function::Count, 0, &values).finalize(), Value::Integer(3));
    assert_eq!(fold(Function::Count, 1, &values).finalize(), Value::Integer(2));
}

#[test]
fn test_sum_and_avg() {
    let ints = [Value::Integer(1), Value::Integer(2), Value::Null];
    assert_eq!(fold(Function::Sum, 1, &ints).finalize(), Value::Integer(3));
    assert_eq!(fold(Function::Avg, 1, &ints).finalize(), Value::Float(1.5));

    let mixed = [Value::Integer(1), Value::Float(0.5)];
    assert_eq!(fold(Function::Sum, 1, &mixed).finalize(), Value::Float(1.5));
}

#[test]
fn test_min_max() {
    let names = [Value::from("b"), Value::from("a"), Value::Null, Value::from("c")];

    assert_eq!(fold(Function::Min, 1, &names).finalize(), Value::from("a"));
    assert_eq!(fold(Function::Max, 1, &names).finalize(), Value::from("c"));
}

#[test]
fn test_empty_aggregates() {
    assert_eq!(fold(Function::Count, 0, &[]).finalize(), Value::Integer(0));
    assert_eq!(fold(Function::Sum, 1, &[]).finalize(), Value::Integer(0));
    assert_eq!(fold(Function::Min, 1, &[]).finalize(), Value::Null);
    assert_eq!(fold(Function::Max, 1, &[]).finalize(), Value::Null);
    assert_eq!(fold(Function::Avg, 1, &[]).finalize(), Value::Null);
}

#[test]
fn test_sum_rejects_strings() {
    let mut acc = Accumulator::new(Function::Sum, 1).unwrap();
    let err = acc.update(&[Value::from("notes.txt")]).unwrap_err();
    assert!(err.contains("sum"));
}

#[test]
fn test_merge_matches_sequential_fold() {
    let values: Vec<Value> = (1..=10).map(|n| Value::Float(n as f64 * 0.1)).collect();

    for function in [Function::Sum, Function::Avg, Function::Min, Function::Max, Function::Count] {
        let whole = fold(function, 1, &values).finalize();
        for split in [0, 3, 7, 10] {
            let (left, right) = values.split_at(split);
            let merged = fold(function, 1, left)
                .merge(fold(function, 1, right))
                .unwrap()
                .finalize();
            assert_eq!(merged, whole, "{:?} split at {}", function, split);
        }
    }
}

#[test]
fn test_scalar_function_has_no_accumulator() {
    assert!(Accumulator::new(Function::Lower, 1).is_none());
}
