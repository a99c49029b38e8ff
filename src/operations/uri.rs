//! URI construction operations

use oxrdf::NamedNode;
use serde_json::{json, Map, Value as Json};

use crate::error::{Error, Result};
use crate::mcp::McpContent;
use crate::operation::{require, Evaluator, Operation, VariableStack};
use crate::settings::Settings;
use crate::value::{term_to_string, to_string_literal, Value};

/// Casts any term to an IRI, like SPARQL's `URI()`.
pub struct Uri;

impl Operation for Uri {
    fn name(&self) -> &'static str {
        "Uri"
    }

    fn description(&self) -> &'static str {
        "Converts any RDF term to a URI reference, like SPARQL's URI() \
         function."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {
                "input": {
                    "description": "The value to convert to a URI"
                }
            },
            "required": ["input"]
        })
    }

    fn execute_json(
        &self,
        evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let term = evaluator
            .process_argument(self.name(), args, "input", context, stack)?
            .into_term()?;
        let iri = NamedNode::new(term_to_string(&term))?;
        Ok(Value::Term(iri.into()))
    }
}

/// Resolves a relative reference against a base IRI per RFC 3986.
pub struct ResolveUri;

impl ResolveUri {
    fn resolve(base: &NamedNode, relative: &str) -> Result<NamedNode> {
        let base_iri = oxiri::Iri::parse(base.as_str().to_string())
            .map_err(|e| Error::Type(format!("invalid base IRI {}: {}", base, e)))?;
        let resolved = base_iri.resolve(relative).map_err(|e| {
            Error::Operation(format!(
                "cannot resolve '{}' against {}: {}",
                relative, base, e
            ))
        })?;
        Ok(NamedNode::new(resolved.into_inner())?)
    }
}

impl Operation for ResolveUri {
    fn name(&self) -> &'static str {
        "ResolveURI"
    }

    fn description(&self) -> &'static str {
        "Creates a new URI by resolving a relative reference against a base \
         URI. The relative reference must be pre-encoded."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {
                "base": {
                    "type": "string",
                    "description": "The base URI to resolve against"
                },
                "relative": {
                    "type": "string",
                    "description": "The relative reference to resolve"
                }
            },
            "required": ["base", "relative"]
        })
    }

    fn execute_json(
        &self,
        evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let base = evaluator
            .process_argument(self.name(), args, "base", context, stack)?
            .into_iri()
            .map_err(|e| Error::Type(format!("ResolveURI 'base': {}", e)))?;
        let relative = to_string_literal(
            evaluator
                .process_argument(self.name(), args, "relative", context, stack)?
                .into_term()?,
        )
        .map_err(|e| Error::Type(format!("ResolveURI 'relative': {}", e)))?;

        Ok(Value::Term(Self::resolve(&base, relative.value())?.into()))
    }

    fn mcp_run(&self, _settings: &Settings, args: &Map<String, Json>) -> Result<Vec<McpContent>> {
        let base = require(args, self.name(), "base")?
            .as_str()
            .ok_or_else(|| Error::Type("ResolveURI 'base' must be a string".to_string()))?;
        let relative = require(args, self.name(), "relative")?
            .as_str()
            .ok_or_else(|| Error::Type("ResolveURI 'relative' must be a string".to_string()))?;

        let base = NamedNode::new(base)?;
        let resolved = Self::resolve(&base, relative)?;
        Ok(vec![McpContent::text(resolved.as_str())])
    }

    fn is_mcp_tool(&self) -> bool {
        true
    }
}
