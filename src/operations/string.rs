//! String operations with SPARQL-aligned semantics

use log::debug;
use oxrdf::vocab::xsd;
use oxrdf::{Literal, Term};
use serde_json::{json, Map, Value as Json};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::mcp::McpContent;
use crate::operation::{require, Evaluator, Operation, VariableStack};
use crate::settings::Settings;
use crate::value::{is_string_literal, plain_to_term, term_to_string, to_string_literal, Value};

/// Casts any term to a string literal, like SPARQL's `STR()`.
pub struct Str;

impl Operation for Str {
    fn name(&self) -> &'static str {
        "Str"
    }

    fn description(&self) -> &'static str {
        "Converts any RDF term to a string literal, like SPARQL's STR() \
         function. String-compatible literals pass through unchanged."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {
                "input": {
                    "description": "The value to convert to a string"
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

        let literal = match &term {
            Term::Literal(literal) if is_string_literal(literal) => literal.clone(),
            other => Literal::new_typed_literal(term_to_string(other), xsd::STRING),
        };
        Ok(Value::Term(literal.into()))
    }
}

/// Concatenates string-compatible literals.
pub struct Concat;

impl Concat {
    fn concat(inputs: &[Literal]) -> Literal {
        let mut out = String::new();
        for literal in inputs {
            out.push_str(literal.value());
        }
        Literal::new_typed_literal(out, xsd::STRING)
    }
}

impl Operation for Concat {
    fn name(&self) -> &'static str {
        "Concat"
    }

    fn description(&self) -> &'static str {
        "Concatenates multiple string values into a single xsd:string literal."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {
                "inputs": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "The string values to concatenate, in order"
                }
            },
            "required": ["inputs"]
        })
    }

    fn execute_json(
        &self,
        evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let inputs = require(args, self.name(), "inputs")?
            .as_array()
            .ok_or_else(|| Error::Type("Concat expects 'inputs' to be a list".to_string()))?;

        let mut literals = Vec::with_capacity(inputs.len());
        for input in inputs {
            let value = evaluator.process_json(input, context, stack)?;
            literals.push(to_string_literal(value.into_term()?)?);
        }
        Ok(Value::Term(Self::concat(&literals).into()))
    }

    fn mcp_run(&self, _settings: &Settings, args: &Map<String, Json>) -> Result<Vec<McpContent>> {
        let inputs = require(args, self.name(), "inputs")?
            .as_array()
            .ok_or_else(|| Error::Type("Concat expects 'inputs' to be a list".to_string()))?;
        let literals = inputs
            .iter()
            .map(|input| match plain_to_term(input)? {
                Term::Literal(literal) => Ok(literal),
                other => Err(Error::Type(format!(
                    "Concat expects string inputs, got {}",
                    Value::Term(other).type_name()
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(vec![McpContent::text(Self::concat(&literals).value())])
    }

    fn is_mcp_tool(&self) -> bool {
        true
    }
}

/// Percent-encodes a string for use inside a URI, like XPath's
/// `encode-for-uri()`: no characters are treated as safe.
pub struct EncodeForUri;

impl Operation for EncodeForUri {
    fn name(&self) -> &'static str {
        "EncodeForURI"
    }

    fn description(&self) -> &'static str {
        "Encodes a string to be URI-safe, following SPARQL's ENCODE_FOR_URI. \
         Reserved characters such as spaces, slashes and colons are \
         percent-encoded."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "string",
                    "description": "The string to encode for use in a URI"
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
        let literal = to_string_literal(
            evaluator
                .process_argument(self.name(), args, "input", context, stack)?
                .into_term()?,
        )?;
        let encoded = urlencoding::encode(literal.value());
        debug!("encoded {} as {}", literal.value(), encoded);
        Ok(Value::Term(
            Literal::new_typed_literal(encoded.into_owned(), xsd::STRING).into(),
        ))
    }
}

/// Regular-expression replacement, like SPARQL's `REPLACE()`.
pub struct Replace;

impl Operation for Replace {
    fn name(&self) -> &'static str {
        "Replace"
    }

    fn description(&self) -> &'static str {
        "Replaces every occurrence of a regular expression pattern in the \
         input with the replacement, like SPARQL's REPLACE() function. Not \
         for building URIs; use EncodeForURI and ResolveURI for that."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "string",
                    "description": "The input string to process"
                },
                "pattern": {
                    "type": "string",
                    "description": "The regular expression to replace"
                },
                "replacement": {
                    "type": "string",
                    "description": "The replacement text"
                }
            },
            "required": ["input", "pattern", "replacement"]
        })
    }

    fn execute_json(
        &self,
        evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let input = to_string_literal(
            evaluator
                .process_argument(self.name(), args, "input", context, stack)?
                .into_term()?,
        )?;
        let pattern = to_string_literal(
            evaluator
                .process_argument(self.name(), args, "pattern", context, stack)?
                .into_term()?,
        )?;
        let replacement = to_string_literal(
            evaluator
                .process_argument(self.name(), args, "replacement", context, stack)?
                .into_term()?,
        )?;

        let regex = regex::Regex::new(pattern.value())
            .map_err(|e| Error::Operation(format!("invalid Replace pattern: {}", e)))?;
        let replaced = regex
            .replace_all(input.value(), replacement.value())
            .into_owned();
        Ok(Value::Term(
            Literal::new_typed_literal(replaced, xsd::STRING).into(),
        ))
    }
}

/// Generates a fresh UUID string, like SPARQL's `STRUUID()`.
pub struct StrUuid;

impl Operation for StrUuid {
    fn name(&self) -> &'static str {
        "STRUUID"
    }

    fn description(&self) -> &'static str {
        "Generates a fresh UUID as an xsd:string literal, like SPARQL's \
         STRUUID(). Every invocation produces a new identifier."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    fn execute_json(
        &self,
        _evaluator: &Evaluator,
        _args: &Map<String, Json>,
        _context: Option<&Value>,
        _stack: &mut VariableStack,
    ) -> Result<Value> {
        let uuid = Uuid::new_v4().to_string();
        debug!("generated UUID {}", uuid);
        Ok(Value::Term(
            Literal::new_typed_literal(uuid, xsd::STRING).into(),
        ))
    }

    fn mcp_run(&self, _settings: &Settings, _args: &Map<String, Json>) -> Result<Vec<McpContent>> {
        Ok(vec![McpContent::text(Uuid::new_v4().to_string())])
    }

    fn is_mcp_tool(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_preserves_order() {
        let literals = vec![
            Literal::new_simple_literal("hello"),
            Literal::new_simple_literal(" "),
            Literal::new_simple_literal("world"),
        ];
        let result = Concat::concat(&literals);
        assert_eq!(result.value(), "hello world");
        assert_eq!(result.datatype(), xsd::STRING);
    }
}
