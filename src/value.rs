//! Typed values exchanged between operations
//!
//! Every operation consumes and produces [`Value`]s: RDF terms, graphs,
//! SPARQL solution tables and rows, lists, evaluated JSON-LD objects, or
//! null. Conversions between JSON scalars and RDF terms follow the SPARQL
//! Results JSON conventions.

use oxrdf::vocab::xsd;
use oxrdf::{BlankNode, Graph, Literal, NamedNode, Term};
use serde_json::Value as Json;

use crate::error::{Error, Result};
use crate::results::{SolutionRow, SolutionTable};

/// A typed evaluation result.
#[derive(Debug, Clone)]
pub enum Value {
    /// An RDF term (IRI, literal, or blank node)
    Term(Term),
    /// An RDF graph
    Graph(Graph),
    /// A SPARQL solution table
    Table(SolutionTable),
    /// A single solution row, produced when iterating a table
    Row(SolutionRow),
    /// A sequence of values
    List(Vec<Value>),
    /// An evaluated JSON-LD object (an object without `@op`)
    Json(Json),
    /// The absent value, returned by side-effecting operations like `Variable`
    Null,
}

impl Value {
    /// Human-readable category name, used in type error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Term(Term::NamedNode(_)) => "IRI",
            Value::Term(Term::BlankNode(_)) => "blank node",
            Value::Term(Term::Literal(_)) => "literal",
            Value::Graph(_) => "graph",
            Value::Table(_) => "solution table",
            Value::Row(_) => "solution row",
            Value::List(_) => "list",
            Value::Json(_) => "JSON object",
            Value::Null => "null",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts this value to an RDF term.
    ///
    /// Terms pass through unchanged; evaluated binding objects
    /// (`{"type": ..., "value": ...}`) are decoded. Anything else is a type
    /// error.
    pub fn into_term(self) -> Result<Term> {
        match self {
            Value::Term(term) => Ok(term),
            Value::Json(json) if is_binding_object(&json) => json_to_term(&json),
            other => Err(Error::Type(format!(
                "expected an RDF term, got {}",
                other.type_name()
            ))),
        }
    }

    /// Converts this value to an IRI, failing on any other category.
    pub fn into_iri(self) -> Result<NamedNode> {
        match self.into_term()? {
            Term::NamedNode(node) => Ok(node),
            term => Err(Error::Type(format!(
                "expected an IRI, got {}",
                Value::Term(term).type_name()
            ))),
        }
    }

    pub fn into_table(self) -> Result<SolutionTable> {
        match self {
            Value::Table(table) => Ok(table),
            other => Err(Error::Type(format!(
                "expected a solution table, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn into_list(self) -> Result<Vec<Value>> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(Error::Type(format!(
                "expected a list, got {}",
                other.type_name()
            ))),
        }
    }

    /// Folds an evaluated value back into plain JSON, for re-assembling
    /// JSON-LD objects whose members were computed by nested operations.
    /// Terms collapse to their lexical form, the way the downstream JSON-LD
    /// parser expects them.
    pub fn to_jsonld(&self) -> Result<Json> {
        match self {
            Value::Term(term) => Ok(Json::String(term_to_string(term))),
            Value::Json(json) => Ok(json.clone()),
            Value::List(items) => Ok(Json::Array(
                items
                    .iter()
                    .map(|item| item.to_jsonld())
                    .collect::<Result<Vec<_>>>()?,
            )),
            Value::Null => Ok(Json::Null),
            other => Err(Error::Type(format!(
                "cannot embed {} in a JSON-LD object",
                other.type_name()
            ))),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Term(term) => write!(f, "{}", term_to_string(term)),
            Value::Graph(graph) => {
                for triple in graph.iter() {
                    writeln!(f, "{} {} {} .", triple.subject, triple.predicate, triple.object)?;
                }
                Ok(())
            }
            Value::Table(table) => write!(f, "{}", table),
            Value::Row(row) => write!(f, "{}", row),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Json(json) => write!(f, "{}", json),
            Value::Null => write!(f, "null"),
        }
    }
}

/// True when the JSON object has the SPARQL Results JSON binding shape.
pub fn is_binding_object(json: &Json) -> bool {
    json.get("type").is_some() && json.get("value").is_some()
}

/// Converts a JSON scalar or binding object to an RDF term.
///
/// Binding objects follow the SPARQL Results JSON shape. Bare strings become
/// `xsd:string` literals; numbers and booleans get the matching XSD datatype.
pub fn json_to_term(json: &Json) -> Result<Term> {
    match json {
        Json::Object(map) => {
            let type_str = map
                .get("type")
                .and_then(|v| v.as_str())
                .ok_or_else(|| Error::Type("binding object without a 'type' member".to_string()))?;
            let value = map
                .get("value")
                .ok_or_else(|| Error::Type("binding object without a 'value' member".to_string()))?;
            let value_str = match value {
                Json::String(s) => s.clone(),
                other => other.to_string(),
            };

            match type_str {
                "uri" => Ok(NamedNode::new(value_str)?.into()),
                "literal" => {
                    if let Some(lang) = map.get("xml:lang").and_then(|v| v.as_str()) {
                        let literal = Literal::new_language_tagged_literal(value_str, lang)
                            .map_err(|e| Error::Type(format!("invalid language tag: {}", e)))?;
                        Ok(literal.into())
                    } else if let Some(datatype) = map.get("datatype").and_then(|v| v.as_str()) {
                        Ok(Literal::new_typed_literal(value_str, NamedNode::new(datatype)?).into())
                    } else {
                        Ok(Literal::new_simple_literal(value_str).into())
                    }
                }
                "bnode" => {
                    let node = BlankNode::new(value_str)
                        .map_err(|e| Error::Type(format!("invalid blank node id: {}", e)))?;
                    Ok(node.into())
                }
                other => Err(Error::Type(format!("unknown binding type: {}", other))),
            }
        }
        Json::String(s) => Ok(Literal::new_typed_literal(s.clone(), xsd::STRING).into()),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Literal::new_typed_literal(i.to_string(), xsd::INTEGER).into())
            } else {
                Ok(Literal::new_typed_literal(n.to_string(), xsd::DOUBLE).into())
            }
        }
        Json::Bool(b) => Ok(Literal::new_typed_literal(b.to_string(), xsd::BOOLEAN).into()),
        other => Err(Error::Type(format!(
            "cannot convert JSON value to an RDF term: {}",
            other
        ))),
    }
}

/// Converts a plain JSON scalar to an RDF term for the MCP surface.
pub fn plain_to_term(json: &Json) -> Result<Term> {
    match json {
        Json::Object(_) | Json::Array(_) | Json::Null => Err(Error::Type(format!(
            "expected a JSON scalar, got {}",
            json
        ))),
        scalar => json_to_term(scalar),
    }
}

/// Converts an RDF term to a plain JSON value for the MCP surface.
pub fn term_to_plain(term: &Term) -> Json {
    match term {
        Term::Literal(literal) => {
            let datatype = literal.datatype();
            if datatype == xsd::INTEGER {
                if let Ok(i) = literal.value().parse::<i64>() {
                    return Json::from(i);
                }
            } else if datatype == xsd::DOUBLE || datatype == xsd::FLOAT {
                if let Ok(d) = literal.value().parse::<f64>() {
                    if let Some(n) = serde_json::Number::from_f64(d) {
                        return Json::Number(n);
                    }
                }
            } else if datatype == xsd::BOOLEAN {
                if let Ok(b) = literal.value().parse::<bool>() {
                    return Json::Bool(b);
                }
            }
            Json::String(literal.value().to_string())
        }
        _ => Json::String(term_to_string(term)),
    }
}

/// The lexical form of a term: the IRI itself, the literal value, or the
/// blank node identifier, without any N-Triples punctuation.
pub fn term_to_string(term: &Term) -> String {
    match term {
        Term::NamedNode(node) => node.as_str().to_string(),
        Term::BlankNode(node) => node.as_str().to_string(),
        Term::Literal(literal) => literal.value().to_string(),
    }
}

/// True when the literal is string-compatible in the SPARQL sense:
/// `xsd:string` or language-tagged.
pub fn is_string_literal(literal: &Literal) -> bool {
    literal.language().is_some() || literal.datatype() == xsd::STRING
}

/// Returns the literal unchanged when it is string-compatible; any other
/// term requires an explicit `Str` cast.
pub fn to_string_literal(term: Term) -> Result<Literal> {
    match term {
        Term::Literal(literal) if is_string_literal(&literal) => Ok(literal),
        Term::Literal(literal) => Err(Error::Type(format!(
            "cannot implicitly convert a {} literal to a string; use the Str operation for explicit casting",
            literal.datatype()
        ))),
        other => Err(Error::Type(format!(
            "cannot implicitly convert {} to a string; use the Str operation for explicit casting",
            Value::Term(other).type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_to_term_uri_binding() {
        let term = json_to_term(&json!({"type": "uri", "value": "http://example.org/r"})).unwrap();
        assert_eq!(
            term,
            Term::from(NamedNode::new_unchecked("http://example.org/r"))
        );
    }

    #[test]
    fn test_json_to_term_literal_binding() {
        let term = json_to_term(&json!({
            "type": "literal",
            "value": "hola",
            "xml:lang": "es"
        }))
        .unwrap();
        let Term::Literal(literal) = term else {
            panic!("expected a literal");
        };
        assert_eq!(literal.value(), "hola");
        assert_eq!(literal.language(), Some("es"));
    }

    #[test]
    fn test_json_to_term_scalars() {
        let Term::Literal(s) = json_to_term(&json!("hello")).unwrap() else {
            panic!("expected a literal");
        };
        assert_eq!(s.datatype(), xsd::STRING);

        let Term::Literal(i) = json_to_term(&json!(42)).unwrap() else {
            panic!("expected a literal");
        };
        assert_eq!(i.value(), "42");
        assert_eq!(i.datatype(), xsd::INTEGER);

        let Term::Literal(b) = json_to_term(&json!(true)).unwrap() else {
            panic!("expected a literal");
        };
        assert_eq!(b.datatype(), xsd::BOOLEAN);
    }

    #[test]
    fn test_to_string_literal_rejects_typed() {
        let int = Literal::new_typed_literal("5", xsd::INTEGER);
        assert!(to_string_literal(int.into()).is_err());

        let tagged = Literal::new_language_tagged_literal("hi", "en").unwrap();
        assert!(to_string_literal(tagged.into()).is_ok());
    }

    #[test]
    fn test_term_to_plain_roundtrip() {
        let term: Term = Literal::new_typed_literal("7", xsd::INTEGER).into();
        assert_eq!(term_to_plain(&term), json!(7));

        let term: Term = NamedNode::new_unchecked("http://example.org/x").into();
        assert_eq!(term_to_plain(&term), json!("http://example.org/x"));
    }

    #[test]
    fn test_into_iri_rejects_literal() {
        let value = Value::Term(Literal::new_simple_literal("nope").into());
        assert!(value.into_iri().is_err());
    }
}
