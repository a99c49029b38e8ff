//! SPARQL protocol operations
//!
//! Each operation parses its query to detect the form, delegates to the
//! SPARQL client, and decodes the response: solutions for SELECT, graphs
//! for CONSTRUCT and DESCRIBE, and a `{status, url}` table for updates.

use log::info;
use oxrdf::vocab::xsd;
use oxrdf::{Literal, NamedNode, Term};
use serde_json::{json, Map, Value as Json};

use crate::client::{SparqlClient, SparqlResponse};
use crate::error::{Error, Result};
use crate::mcp::McpContent;
use crate::operation::{require, Evaluator, Operation, VariableStack};
use crate::results::SolutionTable;
use crate::settings::Settings;
use crate::value::Value;

fn endpoint_and_query(
    op: &str,
    query_arg: &str,
    evaluator: &Evaluator,
    args: &Map<String, Json>,
    context: Option<&Value>,
    stack: &mut VariableStack,
) -> Result<(NamedNode, Literal)> {
    let endpoint = evaluator
        .process_argument(op, args, "endpoint", context, stack)?
        .into_iri()
        .map_err(|e| Error::Type(format!("{} 'endpoint': {}", op, e)))?;
    let query = evaluator
        .process_argument(op, args, query_arg, context, stack)?
        .into_term()?;
    let Term::Literal(query) = query else {
        return Err(Error::Type(format!(
            "{} expects '{}' to be a string literal, got {}",
            op,
            query_arg,
            Value::Term(query).type_name()
        )));
    };
    if query.datatype() != xsd::STRING {
        return Err(Error::Type(format!(
            "{} expects '{}' to be a string literal, got a {} literal",
            op,
            query_arg,
            query.datatype()
        )));
    }
    Ok((endpoint, query))
}

fn query_schema(query_description: &str) -> Json {
    json!({
        "type": "object",
        "properties": {
            "endpoint": {
                "type": "string",
                "description": "SPARQL endpoint URL"
            },
            "query": {
                "type": "string",
                "description": query_description
            }
        },
        "required": ["endpoint", "query"]
    })
}

/// Executes a SELECT query and returns the solution table.
pub struct Select;

impl Operation for Select {
    fn name(&self) -> &'static str {
        "SELECT"
    }

    fn description(&self) -> &'static str {
        "Executes a SPARQL SELECT query against an endpoint and returns the \
         solution table."
    }

    fn input_schema(&self) -> Json {
        query_schema("SPARQL SELECT query")
    }

    fn execute_json(
        &self,
        evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let (endpoint, query) =
            endpoint_and_query(self.name(), "query", evaluator, args, context, stack)?;

        let client = SparqlClient::new(evaluator.settings())?;
        match client.query(endpoint.as_str(), query.value())? {
            SparqlResponse::Solutions(table) => {
                info!("SELECT returned {} rows", table.len());
                Ok(Value::Table(table))
            }
            SparqlResponse::Graph(_) => Err(Error::Type(
                "SELECT expects a query with solutions; use CONSTRUCT or DESCRIBE for graphs"
                    .to_string(),
            )),
        }
    }
}

/// Executes a CONSTRUCT query and returns the graph.
pub struct Construct;

impl Operation for Construct {
    fn name(&self) -> &'static str {
        "CONSTRUCT"
    }

    fn description(&self) -> &'static str {
        "Executes a SPARQL CONSTRUCT query against an endpoint and returns \
         the constructed graph."
    }

    fn input_schema(&self) -> Json {
        query_schema("SPARQL CONSTRUCT query")
    }

    fn execute_json(
        &self,
        evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let (endpoint, query) =
            endpoint_and_query(self.name(), "query", evaluator, args, context, stack)?;

        let client = SparqlClient::new(evaluator.settings())?;
        match client.query(endpoint.as_str(), query.value())? {
            SparqlResponse::Graph(graph) => {
                info!("CONSTRUCT returned {} triples", graph.len());
                Ok(Value::Graph(graph))
            }
            SparqlResponse::Solutions(_) => Err(Error::Type(
                "CONSTRUCT expects a query with a graph result; use SELECT for solutions"
                    .to_string(),
            )),
        }
    }

    fn mcp_run(&self, settings: &Settings, args: &Map<String, Json>) -> Result<Vec<McpContent>> {
        let endpoint = require(args, self.name(), "endpoint")?
            .as_str()
            .ok_or_else(|| Error::Type("CONSTRUCT 'endpoint' must be a string".to_string()))?;
        let query = require(args, self.name(), "query")?
            .as_str()
            .ok_or_else(|| Error::Type("CONSTRUCT 'query' must be a string".to_string()))?;

        let client = SparqlClient::new(settings)?;
        match client.query(endpoint, query)? {
            SparqlResponse::Graph(graph) => {
                Ok(vec![McpContent::text(crate::codec::graph_to_ntriples(&graph))])
            }
            SparqlResponse::Solutions(_) => Err(Error::Type(
                "CONSTRUCT expects a query with a graph result".to_string(),
            )),
        }
    }

    fn is_mcp_tool(&self) -> bool {
        true
    }
}

/// Executes a DESCRIBE query and returns the graph.
pub struct Describe;

impl Operation for Describe {
    fn name(&self) -> &'static str {
        "DESCRIBE"
    }

    fn description(&self) -> &'static str {
        "Executes a SPARQL DESCRIBE query against an endpoint and returns \
         the description graph."
    }

    fn input_schema(&self) -> Json {
        query_schema("SPARQL DESCRIBE query")
    }

    fn execute_json(
        &self,
        evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let (endpoint, query) =
            endpoint_and_query(self.name(), "query", evaluator, args, context, stack)?;

        let client = SparqlClient::new(evaluator.settings())?;
        match client.query(endpoint.as_str(), query.value())? {
            SparqlResponse::Graph(graph) => {
                info!("DESCRIBE returned {} triples", graph.len());
                Ok(Value::Graph(graph))
            }
            SparqlResponse::Solutions(_) => Err(Error::Type(
                "DESCRIBE expects a query with a graph result; use SELECT for solutions"
                    .to_string(),
            )),
        }
    }
}

/// Executes a SPARQL update.
pub struct Update;

impl Operation for Update {
    fn name(&self) -> &'static str {
        "Update"
    }

    fn description(&self) -> &'static str {
        "Executes a SPARQL UPDATE against an endpoint. Answers with a \
         {status, url} result confirming the operation."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {
                "endpoint": {
                    "type": "string",
                    "description": "SPARQL update endpoint URL"
                },
                "update": {
                    "type": "string",
                    "description": "SPARQL UPDATE string"
                }
            },
            "required": ["endpoint", "update"]
        })
    }

    fn execute_json(
        &self,
        evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let (endpoint, update) =
            endpoint_and_query(self.name(), "update", evaluator, args, context, stack)?;

        info!("Update on {}", endpoint);
        let client = SparqlClient::new(evaluator.settings())?;
        let (status, effective_url) = client.update(endpoint.as_str(), update.value())?;
        Ok(Value::Table(SolutionTable::status_result(
            status,
            NamedNode::new(effective_url)?,
        )))
    }

    fn mcp_run(&self, settings: &Settings, args: &Map<String, Json>) -> Result<Vec<McpContent>> {
        let endpoint = require(args, self.name(), "endpoint")?
            .as_str()
            .ok_or_else(|| Error::Type("Update 'endpoint' must be a string".to_string()))?;
        let update = require(args, self.name(), "update")?
            .as_str()
            .ok_or_else(|| Error::Type("Update 'update' must be a string".to_string()))?;

        let client = SparqlClient::new(settings)?;
        let (status, _) = client.update(endpoint, update)?;
        Ok(vec![McpContent::text(format!("Update status: {}", status))])
    }

    fn is_mcp_tool(&self) -> bool {
        true
    }
}
