// tests/context_tests.rs

use fsq_lang::context::{
    Arity, Attribute, AttributeDef, Capability, Function, FunctionDef, Registry, RegistryError,
};
use fsq_lang::value::ValueKind;

#[test]
fn test_lookup_is_case_and_alias_insensitive() {
    let registry = Registry::builtin();

    for name in ["size", "SIZE", "bytes", "Length_Bytes"] {
        let def = registry.attribute_by_name(name).unwrap();
        assert_eq!(def.attribute, Attribute::Size, "Failed for name: {}", name);
    }

    for name in ["fmtSize", "FMTSIZE", "format_size"] {
        let def = registry.function_by_name(name).unwrap();
        assert_eq!(def.function, Function::FmtSize, "Failed for name: {}", name);
    }
}

#[test]
fn test_unknown_names() {
    let registry = Registry::builtin();

    assert!(registry.attribute_by_name("colour").is_none());
    assert!(registry.function_by_name("shout").is_none());
    // Attributes and functions live in separate namespaces
    assert!(registry.function_by_name("size").is_none());
    assert!(registry.attribute_by_name("lower").is_none());
}

#[test]
fn test_attribute_kinds() {
    let registry = Registry::builtin();
    let kind = |name: &str| registry.attribute_by_name(name).map(|def| def.kind);

    assert_eq!(kind("name"), Some(ValueKind::String));
    assert_eq!(kind("size"), Some(ValueKind::Integer));
    assert_eq!(kind("is_dir"), Some(ValueKind::Boolean));
    assert_eq!(kind("modified"), Some(ValueKind::Time));
}

#[test]
fn test_aliases_are_unique_across_builtin_entries() {
    let registry = Registry::builtin();

    let mut seen = Vec::new();
    for def in registry.attributes() {
        for alias in std::iter::once(def.name()).chain(def.aliases.iter().copied()) {
            let alias = alias.to_lowercase();
            assert!(!seen.contains(&alias), "duplicate attribute alias {}", alias);
            seen.push(alias);
        }
    }
}

#[test]
fn test_duplicate_alias_is_rejected() {
    let attributes = vec![
        AttributeDef {
            attribute: Attribute::Size,
            aliases: &["bytes"],
            kind: ValueKind::Integer,
            description: "Size in bytes",
            default_column: true,
        },
        AttributeDef {
            attribute: Attribute::Depth,
            aliases: &["BYTES"],
            kind: ValueKind::Integer,
            description: "Depth",
            default_column: false,
        },
    ];

    let err = Registry::new(attributes, vec![]).unwrap_err();
    assert_eq!(
        err,
        RegistryError::DuplicateAlias {
            alias: "BYTES".to_string(),
            first: "size",
            second: "depth",
        }
    );
}

#[test]
fn test_custom_registry() {
    let functions = vec![FunctionDef {
        function: Function::Lower,
        aliases: &["small"],
        arity: Arity::exactly(1),
        capabilities: &[Capability::Where],
        description: "Lowercase",
    }];

    let registry = Registry::new(vec![], functions).unwrap();
    assert_eq!(
        registry.function_by_name("small").map(|def| def.function),
        Some(Function::Lower)
    );
    assert!(registry.function_by_name("upper").is_none());
}

#[test]
fn test_where_functions_exclude_aggregates() {
    let registry = Registry::builtin();
    let names: Vec<&str> = registry.where_functions().map(|def| def.name()).collect();

    assert!(names.contains(&"lower"));
    assert!(names.contains(&"isImage"));
    for aggregate in ["count", "sum", "min", "max", "avg"] {
        assert!(!names.contains(&aggregate), "{} must not be where-tagged", aggregate);
    }
}

#[test]
fn test_aggregate_flags() {
    let registry = Registry::builtin();

    for def in registry.functions() {
        let expected = matches!(
            def.function,
            Function::Count | Function::Sum | Function::Min | Function::Max | Function::Avg
        );
        assert_eq!(def.is_aggregate(), expected, "Failed for {}", def.name());
        assert_eq!(def.has_capability(Capability::Where), !expected);
    }
}

#[test]
fn test_arity() {
    assert!(Arity::exactly(1).accepts(1));
    assert!(!Arity::exactly(1).accepts(0));
    assert!(Arity::between(2, 3).accepts(3));
    assert!(!Arity::between(2, 3).accepts(4));
    assert!(Arity::at_least(1).accepts(10));
    assert!(!Arity::at_least(1).accepts(0));

    assert_eq!(Arity::exactly(1).to_string(), "1");
    assert_eq!(Arity::between(2, 3).to_string(), "2 to 3");
    assert_eq!(Arity::at_least(1).to_string(), "at least 1");
}

#[test]
fn test_describe() {
    let registry = Registry::builtin();

    let description = registry.describe("mtime").unwrap();
    assert!(description.starts_with("modified"));
    assert!(description.contains("time"));

    let description = registry.describe("avg").unwrap();
    assert!(description.contains("aggregate"));

    assert!(registry.describe("nothing").is_none());
}

#[test]
fn test_default_columns() {
    let registry = Registry::builtin();
    let names: Vec<&str> = registry.default_columns().map(|def| def.name()).collect();

    assert_eq!(names, vec!["name", "path", "size", "mode", "modified"]);
}
