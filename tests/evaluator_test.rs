//! Evaluator Integration Tests
//!
//! Tests for the recursive JSON evaluation algorithm: operator dispatch,
//! JSON-LD passthrough, list sequencing, and variable scoping.

use oxrdf::vocab::xsd;
use oxrdf::Term;
use serde_json::json;
use web_algebra::{Error, Evaluator, Settings, Value};

fn evaluator() -> Evaluator {
    Evaluator::new(Settings::new())
}

fn as_literal(value: &Value) -> &oxrdf::Literal {
    match value {
        Value::Term(Term::Literal(literal)) => literal,
        other => panic!("expected a literal, got {}", other.type_name()),
    }
}

#[test]
fn test_scalar_string_becomes_string_literal() {
    let value = evaluator().evaluate(&json!("hello")).unwrap();
    let literal = as_literal(&value);
    assert_eq!(literal.value(), "hello");
    assert_eq!(literal.datatype(), xsd::STRING);
}

#[test]
fn test_scalar_number_and_bool_datatypes() {
    let value = evaluator().evaluate(&json!(42)).unwrap();
    assert_eq!(as_literal(&value).datatype(), xsd::INTEGER);

    let value = evaluator().evaluate(&json!(2.5)).unwrap();
    assert_eq!(as_literal(&value).datatype(), xsd::DOUBLE);

    let value = evaluator().evaluate(&json!(true)).unwrap();
    assert_eq!(as_literal(&value).datatype(), xsd::BOOLEAN);
}

#[test]
fn test_null_evaluates_to_null() {
    let value = evaluator().evaluate(&json!(null)).unwrap();
    assert!(value.is_null());
}

#[test]
fn test_unknown_operation_fails() {
    let error = evaluator()
        .evaluate(&json!({"@op": "Nope", "args": {}}))
        .unwrap_err();
    assert!(matches!(error, Error::Program(_)));
    assert!(error.to_string().contains("Nope"));
}

#[test]
fn test_missing_argument_fails() {
    let error = evaluator()
        .evaluate(&json!({"@op": "Str", "args": {}}))
        .unwrap_err();
    assert!(matches!(error, Error::Program(_)));
    assert!(error.to_string().contains("input"));
}

#[test]
fn test_list_evaluates_elements_in_order() {
    let value = evaluator().evaluate(&json!(["a", "b"])).unwrap();
    let Value::List(items) = value else {
        panic!("expected a list");
    };
    assert_eq!(items.len(), 2);
    assert_eq!(as_literal(&items[0]).value(), "a");
    assert_eq!(as_literal(&items[1]).value(), "b");
}

#[test]
fn test_variable_binding_reaches_later_siblings() {
    // [Variable g = "hello", Concat($g, " world")] — the binding made by the
    // first element is visible to the second
    let program = json!([
        {"@op": "Variable", "args": {"name": "g", "value": "hello"}},
        {"@op": "Concat", "args": {"inputs": [
            {"@op": "Value", "args": {"name": "$g"}},
            " world"
        ]}}
    ]);
    let value = evaluator().evaluate(&program).unwrap();
    let Value::List(items) = value else {
        panic!("expected a list");
    };
    assert!(items[0].is_null());
    let literal = as_literal(&items[1]);
    assert_eq!(literal.value(), "hello world");
    assert_eq!(literal.datatype(), xsd::STRING);
}

#[test]
fn test_variable_binding_does_not_escape_its_list() {
    // The binding lives in the inner list's scope; the outer sibling cannot
    // see it
    let program = json!([
        [{"@op": "Variable", "args": {"name": "x", "value": "inner"}}],
        {"@op": "Value", "args": {"name": "$x"}}
    ]);
    let error = evaluator().evaluate(&program).unwrap_err();
    assert!(matches!(error, Error::Program(_)));
    assert!(error.to_string().contains("$x"));
}

#[test]
fn test_unbound_variable_fails() {
    let error = evaluator()
        .evaluate(&json!({"@op": "Value", "args": {"name": "$missing"}}))
        .unwrap_err();
    assert!(matches!(error, Error::Program(_)));
}

#[test]
fn test_variable_holds_raw_list_value() {
    let program = json!([
        {"@op": "Variable", "args": {"name": "xs", "value": ["a", "b", "c"]}},
        {"@op": "Filter", "args": {
            "input": {"@op": "Value", "args": {"name": "$xs"}},
            "expression": 3
        }}
    ]);
    let value = evaluator().evaluate(&program).unwrap();
    let Value::List(items) = value else {
        panic!("expected a list");
    };
    assert_eq!(as_literal(&items[1]).value(), "c");
}

#[test]
fn test_jsonld_passthrough_keeps_structure() {
    // Objects without @op are traversed member by member; nested operators
    // are resolved in place
    let program = json!({
        "@id": {"@op": "ResolveURI", "args": {
            "base": "http://example.org/",
            "relative": "doc"
        }},
        "http://example.org/title": "A document"
    });
    let value = evaluator().evaluate(&program).unwrap();
    let Value::Json(jsonld) = value else {
        panic!("expected a JSON object");
    };
    assert_eq!(
        jsonld.get("@id").and_then(|v| v.as_str()),
        Some("http://example.org/doc")
    );
    assert_eq!(
        jsonld.get("http://example.org/title").and_then(|v| v.as_str()),
        Some("A document")
    );
}

#[test]
fn test_binding_object_decodes_to_term() {
    let program = json!({"@op": "Str", "args": {"input": {
        "type": "literal",
        "value": "bonjour",
        "xml:lang": "fr"
    }}});
    let value = evaluator().evaluate(&program).unwrap();
    let literal = as_literal(&value);
    assert_eq!(literal.value(), "bonjour");
    assert_eq!(literal.language(), Some("fr"));
}

#[test]
fn test_execute_runs_operation_passed_as_data() {
    let program = json!({"@op": "Execute", "args": {"operation": {
        "@op": "Concat", "args": {"inputs": ["a", "b"]}
    }}});
    let value = evaluator().evaluate(&program).unwrap();
    assert_eq!(as_literal(&value).value(), "ab");
}

#[test]
fn test_current_without_context_fails() {
    let error = evaluator()
        .evaluate(&json!({"@op": "Current", "args": {}}))
        .unwrap_err();
    assert!(matches!(error, Error::Operation(_)));
}

#[test]
fn test_evaluation_is_deterministic() {
    let program = json!({"@op": "Concat", "args": {"inputs": [
        {"@op": "EncodeForURI", "args": {"input": "a b"}},
        "/",
        {"@op": "Replace", "args": {"input": "xyz", "pattern": "y", "replacement": "-"}}
    ]}});
    let first = evaluator().evaluate(&program).unwrap();
    let second = evaluator().evaluate(&program).unwrap();
    assert_eq!(as_literal(&first).value(), as_literal(&second).value());
    assert_eq!(as_literal(&first).value(), "a%20b/x-z");
}
