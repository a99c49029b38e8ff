//! Parameterized SPARQL strings and the Substitute operation

use std::collections::BTreeMap;

use log::debug;
use oxrdf::vocab::xsd;
use oxrdf::{Literal, Term};
use regex::Regex;
use serde_json::{json, Map, Value as Json};

use crate::error::{Error, Result};
use crate::mcp::McpContent;
use crate::operation::{require, Evaluator, Operation, VariableStack};
use crate::settings::Settings;
use crate::value::{json_to_term, Value};

/// A SPARQL string with named parameters that are spliced in as serialized
/// RDF terms.
///
/// Replacement is purely textual: an occurrence is `?name` or `$name`
/// bounded by a non-word character or the end of the string. Optional prefix
/// declarations and a `BASE` can be prepended to the final text.
// TODO: substitute on the parsed algebra instead of the query text;
// textual replacement can produce invalid SPARQL for adversarial queries
#[derive(Debug, Clone)]
pub struct ParameterizedSparql {
    command: String,
    base_iri: Option<String>,
    prefixes: Vec<(String, String)>,
    params: BTreeMap<String, Term>,
}

impl ParameterizedSparql {
    pub fn new(command: impl Into<String>) -> Self {
        ParameterizedSparql {
            command: command.into(),
            base_iri: None,
            prefixes: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    pub fn set_base_iri(&mut self, base_iri: impl Into<String>) {
        self.base_iri = Some(base_iri.into());
    }

    pub fn add_prefix(&mut self, prefix: impl Into<String>, iri: impl Into<String>) {
        self.prefixes.push((prefix.into(), iri.into()));
    }

    /// Binds a variable to a term. A leading `?` or `$` on the name is
    /// accepted and stripped.
    pub fn set_param(&mut self, var: &str, term: Term) {
        let name = var.trim_start_matches(['?', '$']);
        self.params.insert(name.to_string(), term);
    }

    pub fn clear_param(&mut self, var: &str) {
        let name = var.trim_start_matches(['?', '$']);
        self.params.remove(name);
    }

    /// Renders the final SPARQL text with every bound variable replaced by
    /// its term in SPARQL syntax.
    pub fn render(&self) -> String {
        let mut query = self.command.clone();
        for (name, term) in &self.params {
            let pattern = Regex::new(&format!(r"[?$]{}([^\w]|$)", regex::escape(name)))
                .expect("escaped variable name forms a valid pattern");
            let serialized = term.to_string();
            query = pattern
                .replace_all(&query, |caps: &regex::Captures<'_>| {
                    format!("{}{}", serialized, &caps[1])
                })
                .into_owned();
        }

        let mut out = String::new();
        for (prefix, iri) in &self.prefixes {
            out.push_str(&format!("PREFIX {}: <{}>\n", prefix, iri));
        }
        if let Some(base) = &self.base_iri {
            out.push_str(&format!("BASE <{}>\n", base));
        }
        out.push_str(&query);
        out
    }
}

impl std::fmt::Display for ParameterizedSparql {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Splices an RDF term into a SPARQL query in place of a variable.
pub struct Substitute;

impl Substitute {
    fn substitute(query: &str, var: &str, term: Term) -> Literal {
        debug!("substituting variable {} in SPARQL query", var);
        let mut parameterized = ParameterizedSparql::new(query);
        parameterized.set_param(var, term);
        Literal::new_typed_literal(parameterized.render(), xsd::STRING)
    }
}

impl Operation for Substitute {
    fn name(&self) -> &'static str {
        "Substitute"
    }

    fn description(&self) -> &'static str {
        "Replaces a variable placeholder in a SPARQL query with an RDF term \
         serialized in SPARQL syntax, enabling dynamic query construction. \
         For example, substituting ?x with <http://example.org/r> in \
         'DESCRIBE ?x' produces 'DESCRIBE <http://example.org/r>'."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The SPARQL query with variable placeholders"
                },
                "var": {
                    "type": "string",
                    "description": "The variable to substitute, with or without the ? prefix"
                },
                "binding": {
                    "type": "object",
                    "properties": {
                        "value": {
                            "type": "string",
                            "description": "The value to substitute for the variable"
                        },
                        "type": {
                            "type": "string",
                            "enum": ["uri", "bnode", "literal"],
                            "description": "The kind of the substituted value"
                        }
                    },
                    "required": ["value", "type"],
                    "description": "The term to splice in for the variable"
                }
            },
            "required": ["query", "var", "binding"]
        })
    }

    fn execute_json(
        &self,
        evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let query = evaluator
            .process_argument(self.name(), args, "query", context, stack)?
            .into_term()?;
        let Term::Literal(query) = query else {
            return Err(Error::Type(format!(
                "Substitute expects 'query' to be a literal, got {}",
                Value::Term(query).type_name()
            )));
        };
        let var = evaluator
            .process_argument(self.name(), args, "var", context, stack)?
            .into_term()?;
        let Term::Literal(var) = var else {
            return Err(Error::Type(format!(
                "Substitute expects 'var' to be a literal, got {}",
                Value::Term(var).type_name()
            )));
        };
        let binding = evaluator
            .process_argument(self.name(), args, "binding", context, stack)?
            .into_term()
            .map_err(|e| Error::Type(format!("Substitute 'binding': {}", e)))?;

        Ok(Value::Term(
            Self::substitute(query.value(), var.value(), binding).into(),
        ))
    }

    fn mcp_run(&self, _settings: &Settings, args: &Map<String, Json>) -> Result<Vec<McpContent>> {
        let query = require(args, self.name(), "query")?
            .as_str()
            .ok_or_else(|| Error::Type("Substitute 'query' must be a string".to_string()))?;
        let var = require(args, self.name(), "var")?
            .as_str()
            .ok_or_else(|| Error::Type("Substitute 'var' must be a string".to_string()))?;
        let binding = json_to_term(require(args, self.name(), "binding")?)?;

        let result = Self::substitute(query, var, binding);
        Ok(vec![McpContent::text(result.value())])
    }

    fn is_mcp_tool(&self) -> bool {
        true
    }
}
