//! SPARQL solution tables and the SPARQL Results JSON codec
//!
//! A [`SolutionTable`] preserves the variable order of the `head` and the
//! row order of the `results.bindings` array exactly as the server returned
//! them. Rows map variable names to RDF terms; absent entries mean the
//! variable is unbound in that row.

use oxrdf::vocab::xsd;
use oxrdf::{BlankNode, Literal, NamedNode, Term};
use serde_json::{json, Map, Value as Json};

use crate::error::{Error, Result};

/// One row of a solution table: an ordered mapping from variable name to term.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionRow {
    bindings: Vec<(String, Term)>,
}

impl SolutionRow {
    pub fn new(bindings: Vec<(String, Term)>) -> Self {
        SolutionRow { bindings }
    }

    /// Looks up the binding for a variable name.
    pub fn get(&self, name: &str) -> Option<&Term> {
        self.bindings
            .iter()
            .find(|(var, _)| var == name)
            .map(|(_, term)| term)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.bindings.iter().map(|(var, term)| (var.as_str(), term))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl std::fmt::Display for SolutionRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (var, term)) in self.bindings.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "?{} = {}", var, term)?;
        }
        Ok(())
    }
}

/// A SPARQL solution table: variable names plus ordered rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionTable {
    vars: Vec<String>,
    rows: Vec<SolutionRow>,
}

impl SolutionTable {
    pub fn new(vars: Vec<String>, rows: Vec<SolutionRow>) -> Self {
        SolutionTable { vars, rows }
    }

    /// The `{status, url}` table returned by the HTTP write operations.
    pub fn status_result(status: u16, url: NamedNode) -> Self {
        SolutionTable::new(
            vec!["status".to_string(), "url".to_string()],
            vec![SolutionRow::new(vec![
                (
                    "status".to_string(),
                    Literal::new_typed_literal(status.to_string(), xsd::INTEGER).into(),
                ),
                ("url".to_string(), url.into()),
            ])],
        )
    }

    pub fn vars(&self) -> &[String] {
        &self.vars
    }

    pub fn rows(&self) -> &[SolutionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Parses a SPARQL Results JSON document.
    ///
    /// Boolean (ASK-shaped) documents are rejected: the expression language
    /// has no operation that consumes them.
    pub fn from_json(doc: &Json) -> Result<Self> {
        if doc.get("boolean").is_some() {
            return Err(Error::Codec(
                "boolean result document has no solutions".to_string(),
            ));
        }

        let vars = doc
            .pointer("/head/vars")
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::Codec("result document without head.vars".to_string()))?
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::Codec("non-string variable name".to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let bindings = doc
            .pointer("/results/bindings")
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::Codec("result document without results.bindings".to_string()))?;

        let mut rows = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let map = binding
                .as_object()
                .ok_or_else(|| Error::Codec("binding is not an object".to_string()))?;
            // Preserve the table's variable order within each row
            let mut entries = Vec::with_capacity(map.len());
            for var in &vars {
                if let Some(term_json) = map.get(var) {
                    entries.push((var.clone(), term_from_json(term_json)?));
                }
            }
            rows.push(SolutionRow::new(entries));
        }

        Ok(SolutionTable::new(vars, rows))
    }

    /// Serializes back to a SPARQL Results JSON document.
    pub fn to_json(&self) -> Json {
        let bindings: Vec<Json> = self
            .rows
            .iter()
            .map(|row| {
                let mut map = Map::new();
                for (var, term) in row.iter() {
                    map.insert(var.to_string(), term_to_json(term));
                }
                Json::Object(map)
            })
            .collect();

        json!({
            "head": { "vars": self.vars },
            "results": { "bindings": bindings }
        })
    }
}

impl std::fmt::Display for SolutionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:?} ({} rows)", self.vars, self.rows.len())?;
        if self.rows.is_empty() {
            return write!(f, "(empty)");
        }

        let mut widths: Vec<usize> = self.vars.iter().map(|v| v.len()).collect();
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                self.vars
                    .iter()
                    .map(|var| row.get(var).map(|t| t.to_string()).unwrap_or_default())
                    .collect()
            })
            .collect();
        for row in &cells {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.len());
            }
        }

        let separator: String = widths
            .iter()
            .map(|w| format!("+{}", "-".repeat(w + 2)))
            .collect::<String>()
            + "+";

        writeln!(f, "{}", separator)?;
        for (i, var) in self.vars.iter().enumerate() {
            write!(f, "| {:<width$} ", var, width = widths[i])?;
        }
        writeln!(f, "|")?;
        writeln!(f, "{}", separator)?;
        for row in &cells {
            for (i, cell) in row.iter().enumerate() {
                write!(f, "| {:<width$} ", cell, width = widths[i])?;
            }
            writeln!(f, "|")?;
        }
        write!(f, "{}", separator)
    }
}

/// Decodes one SPARQL Results JSON term object.
pub fn term_from_json(json: &Json) -> Result<Term> {
    let type_str = json
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Codec("term object without a 'type' member".to_string()))?;
    let value = json
        .get("value")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Codec("term object without a 'value' member".to_string()))?;

    match type_str {
        "uri" => Ok(NamedNode::new(value)
            .map_err(|e| Error::Codec(format!("invalid IRI in result: {}", e)))?
            .into()),
        "literal" | "typed-literal" => {
            if let Some(lang) = json.get("xml:lang").and_then(|v| v.as_str()) {
                Ok(Literal::new_language_tagged_literal(value, lang)
                    .map_err(|e| Error::Codec(format!("invalid language tag: {}", e)))?
                    .into())
            } else if let Some(datatype) = json.get("datatype").and_then(|v| v.as_str()) {
                let datatype = NamedNode::new(datatype)
                    .map_err(|e| Error::Codec(format!("invalid datatype IRI: {}", e)))?;
                Ok(Literal::new_typed_literal(value, datatype).into())
            } else {
                Ok(Literal::new_simple_literal(value).into())
            }
        }
        "bnode" => Ok(BlankNode::new(value)
            .map_err(|e| Error::Codec(format!("invalid blank node id: {}", e)))?
            .into()),
        other => Err(Error::Codec(format!("unknown term type: {}", other))),
    }
}

/// Encodes a term as a SPARQL Results JSON term object.
pub fn term_to_json(term: &Term) -> Json {
    match term {
        Term::NamedNode(node) => json!({
            "type": "uri",
            "value": node.as_str()
        }),
        Term::BlankNode(node) => json!({
            "type": "bnode",
            "value": node.as_str()
        }),
        Term::Literal(literal) => {
            let mut map = Map::new();
            map.insert("type".to_string(), Json::String("literal".to_string()));
            map.insert(
                "value".to_string(),
                Json::String(literal.value().to_string()),
            );
            if let Some(lang) = literal.language() {
                map.insert("xml:lang".to_string(), Json::String(lang.to_string()));
            } else if literal.datatype() != xsd::STRING {
                map.insert(
                    "datatype".to_string(),
                    Json::String(literal.datatype().as_str().to_string()),
                );
            }
            Json::Object(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> Json {
        json!({
            "head": { "vars": ["s", "label"] },
            "results": {
                "bindings": [
                    {
                        "s": { "type": "uri", "value": "http://example.org/alice" },
                        "label": { "type": "literal", "value": "Alice", "xml:lang": "en" }
                    },
                    {
                        "s": { "type": "uri", "value": "http://example.org/bob" }
                    }
                ]
            }
        })
    }

    #[test]
    fn test_from_json_preserves_order() {
        let table = SolutionTable::from_json(&sample_doc()).unwrap();
        assert_eq!(table.vars(), &["s".to_string(), "label".to_string()]);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.rows()[0].get("s"),
            Some(&Term::from(NamedNode::new_unchecked(
                "http://example.org/alice"
            )))
        );
    }

    #[test]
    fn test_unbound_variable_is_absent() {
        let table = SolutionTable::from_json(&sample_doc()).unwrap();
        assert!(table.rows()[1].get("label").is_none());
    }

    #[test]
    fn test_json_roundtrip() {
        let table = SolutionTable::from_json(&sample_doc()).unwrap();
        let reparsed = SolutionTable::from_json(&table.to_json()).unwrap();
        assert_eq!(table, reparsed);
    }

    #[test]
    fn test_boolean_document_rejected() {
        let doc = json!({ "head": {}, "boolean": true });
        assert!(SolutionTable::from_json(&doc).is_err());
    }

    #[test]
    fn test_status_result_shape() {
        let table = SolutionTable::status_result(201, NamedNode::new_unchecked("http://example.org/doc"));
        assert_eq!(table.vars(), &["status".to_string(), "url".to_string()]);
        assert_eq!(table.len(), 1);
        let Some(Term::Literal(status)) = table.rows()[0].get("status").cloned() else {
            panic!("expected a status literal");
        };
        assert_eq!(status.value(), "201");
        assert_eq!(status.datatype(), xsd::INTEGER);
    }

    #[test]
    fn test_typed_literal_roundtrip() {
        let term: Term = Literal::new_typed_literal("42", xsd::INTEGER).into();
        let encoded = term_to_json(&term);
        assert_eq!(
            encoded.get("datatype").and_then(|v| v.as_str()),
            Some("http://www.w3.org/2001/XMLSchema#integer")
        );
        assert_eq!(term_from_json(&encoded).unwrap(), term);
    }
}
