//! Graph and solution-table operations

use log::debug;
use oxrdf::Graph;
use serde_json::{json, Map, Value as Json};

use crate::codec;
use crate::error::{Error, Result};
use crate::mcp::McpContent;
use crate::operation::{require, Evaluator, Operation, VariableStack};
use crate::settings::Settings;
use crate::value::Value;

/// Unions a list of graphs into one.
pub struct Merge;

impl Merge {
    fn merge(graphs: Vec<Graph>) -> Graph {
        // Set union of triples; blank nodes are shared, not renamed
        let mut merged = Graph::new();
        for (i, graph) in graphs.iter().enumerate() {
            debug!("merging graph {}/{}", i + 1, graphs.len());
            for triple in graph.iter() {
                merged.insert(triple);
            }
        }
        merged
    }
}

impl Operation for Merge {
    fn name(&self) -> &'static str {
        "Merge"
    }

    fn description(&self) -> &'static str {
        "Merges a list of RDF graphs into a single graph: the set union of \
         their triples. Blank nodes are not renamed across inputs."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {
                "graphs": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "description": "A JSON-LD object representing an RDF graph"
                    },
                    "description": "The graphs to merge"
                }
            },
            "required": ["graphs"]
        })
    }

    fn execute_json(
        &self,
        evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let items = evaluator
            .process_argument(self.name(), args, "graphs", context, stack)?
            .into_list()
            .map_err(|e| Error::Type(format!("Merge 'graphs': {}", e)))?;

        let mut graphs = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            match item {
                Value::Graph(graph) => graphs.push(graph),
                Value::Json(jsonld) => graphs.push(codec::jsonld_to_graph(&jsonld, None)?),
                other => {
                    return Err(Error::Type(format!(
                        "Merge expects graph {} to be a graph or a JSON-LD object, got {}",
                        i + 1,
                        other.type_name()
                    )))
                }
            }
        }

        let merged = Self::merge(graphs);
        debug!("merged into {} triples", merged.len());
        Ok(Value::Graph(merged))
    }

    fn mcp_run(&self, _settings: &Settings, args: &Map<String, Json>) -> Result<Vec<McpContent>> {
        let items = require(args, self.name(), "graphs")?
            .as_array()
            .ok_or_else(|| Error::Type("Merge expects 'graphs' to be a list".to_string()))?;
        let graphs = items
            .iter()
            .map(|item| codec::jsonld_to_graph(item, None))
            .collect::<Result<Vec<_>>>()?;
        let merged = Self::merge(graphs);
        Ok(vec![McpContent::text(codec::graph_to_ntriples(&merged))])
    }

    fn is_mcp_tool(&self) -> bool {
        true
    }
}

/// Extracts the rows of a solution table as a sequence.
pub struct Bindings;

impl Operation for Bindings {
    fn name(&self) -> &'static str {
        "Bindings"
    }

    fn description(&self) -> &'static str {
        "Extracts the sequence of solution rows from a SPARQL result table, \
         for use with sequence operations like ForEach."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {
                "table": {
                    "description": "The solution table to extract rows from"
                }
            },
            "required": ["table"]
        })
    }

    fn execute_json(
        &self,
        evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let table = evaluator
            .process_argument(self.name(), args, "table", context, stack)?
            .into_table()
            .map_err(|e| Error::Type(format!("Bindings 'table': {}", e)))?;
        Ok(Value::List(
            table.rows().iter().cloned().map(Value::Row).collect(),
        ))
    }
}
