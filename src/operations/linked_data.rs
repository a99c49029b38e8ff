//! Linked Data document operations backed by HTTP
//!
//! The URL of a document serves as both the resource identifier and the
//! named graph address in systems with direct graph identification. Reads
//! return the parsed graph; writes answer with a one-row `{status, url}`
//! solution table carrying the response status and the effective URL after
//! redirects.

use log::info;
use oxrdf::{Graph, NamedNode, Term};
use serde_json::{json, Map, Value as Json};

use crate::client::LinkedDataClient;
use crate::codec;
use crate::error::{Error, Result};
use crate::mcp::McpContent;
use crate::operation::{require, Evaluator, Operation, VariableStack};
use crate::results::SolutionTable;
use crate::settings::Settings;
use crate::value::Value;

fn status_table(status: u16, url: String) -> Result<Value> {
    Ok(Value::Table(SolutionTable::status_result(
        status,
        NamedNode::new(url)?,
    )))
}

/// Coerces an evaluated `data` argument to a graph: either a graph produced
/// by another operation, or an evaluated JSON-LD object parsed with the
/// request URL as base.
fn data_graph(op: &str, data: Value, base: &NamedNode) -> Result<Graph> {
    match data {
        Value::Graph(graph) => Ok(graph),
        Value::Json(jsonld) => codec::jsonld_to_graph(&jsonld, Some(base.as_str())),
        other => Err(Error::Type(format!(
            "{} expects 'data' to be a graph or a JSON-LD object, got {}",
            op,
            other.type_name()
        ))),
    }
}

/// Retrieves an RDF document.
pub struct Get;

impl Operation for Get {
    fn name(&self) -> &'static str {
        "GET"
    }

    fn description(&self) -> &'static str {
        "Retrieves RDF data from a named graph using HTTP GET and returns \
         the graph describing the resource at that URL."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to fetch RDF data from"
                }
            },
            "required": ["url"]
        })
    }

    fn execute_json(
        &self,
        evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let url = evaluator
            .process_argument(self.name(), args, "url", context, stack)?
            .into_iri()
            .map_err(|e| Error::Type(format!("GET 'url': {}", e)))?;

        let client = LinkedDataClient::new(evaluator.settings())?;
        let graph = client.get(url.as_str())?;
        Ok(Value::Graph(graph))
    }
}

/// Creates or appends to an RDF document.
pub struct Post;

impl Operation for Post {
    fn name(&self) -> &'static str {
        "POST"
    }

    fn description(&self) -> &'static str {
        "Creates or appends RDF data to a named graph using HTTP POST. \
         Answers with a {status, url} result confirming the write; the \
         updated graph is not returned."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to send the RDF data to"
                },
                "data": {
                    "type": "object",
                    "description": "The RDF data to append, as a JSON-LD object"
                }
            },
            "required": ["url", "data"]
        })
    }

    fn execute_json(
        &self,
        evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let url = evaluator
            .process_argument(self.name(), args, "url", context, stack)?
            .into_iri()
            .map_err(|e| Error::Type(format!("POST 'url': {}", e)))?;
        let data = evaluator.process_argument(self.name(), args, "data", context, stack)?;
        let graph = data_graph(self.name(), data, &url)?;

        info!("POST {} ({} triples)", url, graph.len());
        let client = LinkedDataClient::new(evaluator.settings())?;
        let (status, effective_url) = client.post(url.as_str(), &graph)?;
        status_table(status, effective_url)
    }

    fn mcp_run(&self, settings: &Settings, args: &Map<String, Json>) -> Result<Vec<McpContent>> {
        let url = require(args, self.name(), "url")?
            .as_str()
            .ok_or_else(|| Error::Type("POST 'url' must be a string".to_string()))?;
        let url = NamedNode::new(url)?;
        let data = require(args, self.name(), "data")?;
        let graph = codec::jsonld_to_graph(data, Some(url.as_str()))?;

        let client = LinkedDataClient::new(settings)?;
        let (status, _) = client.post(url.as_str(), &graph)?;
        Ok(vec![McpContent::text(format!("POST status: {}", status))])
    }

    fn is_mcp_tool(&self) -> bool {
        true
    }
}

/// Replaces an RDF document.
pub struct Put;

impl Operation for Put {
    fn name(&self) -> &'static str {
        "PUT"
    }

    fn description(&self) -> &'static str {
        "Replaces the RDF graph at a URL using HTTP PUT. Answers with a \
         {status, url} result confirming the write."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL of the document to replace"
                },
                "data": {
                    "type": "object",
                    "description": "The replacement RDF data, as a JSON-LD object"
                }
            },
            "required": ["url", "data"]
        })
    }

    fn execute_json(
        &self,
        evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let url = evaluator
            .process_argument(self.name(), args, "url", context, stack)?
            .into_iri()
            .map_err(|e| Error::Type(format!("PUT 'url': {}", e)))?;
        let data = evaluator.process_argument(self.name(), args, "data", context, stack)?;
        let graph = data_graph(self.name(), data, &url)?;

        info!("PUT {} ({} triples)", url, graph.len());
        let client = LinkedDataClient::new(evaluator.settings())?;
        let (status, effective_url) = client.put(url.as_str(), &graph)?;
        status_table(status, effective_url)
    }
}

/// Patches an RDF document with a SPARQL update.
pub struct Patch;

impl Operation for Patch {
    fn name(&self) -> &'static str {
        "PATCH"
    }

    fn description(&self) -> &'static str {
        "Updates the RDF graph at a URL using HTTP PATCH with a SPARQL \
         update payload. Answers with a {status, url} result confirming the \
         write."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL of the document to update"
                },
                "update": {
                    "type": "string",
                    "description": "The SPARQL update to apply"
                }
            },
            "required": ["url", "update"]
        })
    }

    fn execute_json(
        &self,
        evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let url = evaluator
            .process_argument(self.name(), args, "url", context, stack)?
            .into_iri()
            .map_err(|e| Error::Type(format!("PATCH 'url': {}", e)))?;
        let update = evaluator
            .process_argument(self.name(), args, "update", context, stack)?
            .into_term()?;
        let Term::Literal(update) = update else {
            return Err(Error::Type(format!(
                "PATCH expects 'update' to be a literal, got {}",
                Value::Term(update).type_name()
            )));
        };

        info!("PATCH {}", url);
        let client = LinkedDataClient::new(evaluator.settings())?;
        let (status, effective_url) = client.patch(url.as_str(), update.value())?;
        status_table(status, effective_url)
    }
}
