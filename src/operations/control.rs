//! Control-flow operations: iteration, filtering, variables, and context
//!
//! These follow the XSLT processing model: `ForEach` is `xsl:for-each`,
//! `Variable` is `xsl:variable` with lexical scoping, `Current` is
//! `current()`, and `Filter` is a positional predicate with 1-based
//! indexing.

use log::debug;
use serde_json::{json, Map, Value as Json};

use crate::error::{Error, Result};
use crate::operation::{require, Evaluator, Operation, VariableStack};
use crate::value::Value;

/// Applies an operation to each item of a sequence or solution table.
pub struct ForEach;

impl ForEach {
    fn items(select: Value) -> Result<Vec<Value>> {
        match select {
            Value::List(items) => Ok(items),
            Value::Table(table) => Ok(table.rows().iter().cloned().map(Value::Row).collect()),
            other => Err(Error::Type(format!(
                "ForEach expects 'select' to be a list or a solution table, got {}",
                other.type_name()
            ))),
        }
    }
}

impl Operation for ForEach {
    fn name(&self) -> &'static str {
        "ForEach"
    }

    fn description(&self) -> &'static str {
        "Applies operations to each item in a sequence or in SPARQL results, \
         like XSLT's xsl:for-each. Each item becomes the context of the \
         operation; the results are collected into a sequence."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {
                "select": {
                    "description": "Sequence or solution table to iterate over"
                },
                "operation": {
                    "description": "Operation(s) to execute for each item"
                }
            },
            "required": ["select", "operation"]
        })
    }

    fn execute_json(
        &self,
        evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let select = evaluator.process_argument(self.name(), args, "select", context, stack)?;
        let operation = require(args, self.name(), "operation")?;
        let items = Self::items(select)?;
        debug!("ForEach over {} items", items.len());

        // The variable stack is shared across iterations: bindings made in
        // one iteration stay visible in the next
        let mut results = Vec::new();
        for item in items {
            match operation {
                Json::Array(ops) => {
                    // A list of operations runs as a sequence; only the last
                    // non-null result of the sequence is collected
                    let mut last = Value::Null;
                    for op in ops {
                        let result = evaluator.process_json(op, Some(&item), stack)?;
                        if !result.is_null() {
                            last = result;
                        }
                    }
                    if !last.is_null() {
                        results.push(last);
                    }
                }
                single => {
                    let result = evaluator.process_json(single, Some(&item), stack)?;
                    if !result.is_null() {
                        results.push(result);
                    }
                }
            }
        }

        Ok(Value::List(results))
    }
}

/// Filters a sequence or solution table with a positional predicate.
pub struct Filter;

impl Filter {
    fn position(expression: Value) -> Result<i64> {
        use oxrdf::vocab::xsd;
        use oxrdf::Term;

        match expression.into_term() {
            Ok(Term::Literal(literal)) if literal.datatype() == xsd::INTEGER => {
                literal.value().parse::<i64>().map_err(|_| {
                    Error::Operation(format!(
                        "Filter position is not a valid integer: {}",
                        literal.value()
                    ))
                })
            }
            _ => Err(Error::Operation(
                "unsupported filter expression; only positional integers are supported".to_string(),
            )),
        }
    }
}

impl Operation for Filter {
    fn name(&self) -> &'static str {
        "Filter"
    }

    fn description(&self) -> &'static str {
        "Filters a sequence or SPARQL results with a filter expression, like \
         an XSLT predicate. Positional integers select by 1-based position; \
         a single match is returned unwrapped."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {
                "input": {
                    "description": "Sequence or solution table to filter"
                },
                "expression": {
                    "description": "Filter expression; a 1-based positional integer"
                }
            },
            "required": ["input", "expression"],
            "additionalProperties": false
        })
    }

    fn execute_json(
        &self,
        evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let input = evaluator.process_argument(self.name(), args, "input", context, stack)?;
        let expression =
            evaluator.process_argument(self.name(), args, "expression", context, stack)?;

        let items = match input {
            Value::List(items) => items,
            Value::Table(table) => table.rows().iter().cloned().map(Value::Row).collect(),
            other => Err(Error::Type(format!(
                "Filter expects 'input' to be a list or a solution table, got {}",
                other.type_name()
            )))?,
        };

        let position = Self::position(expression)?;
        if position < 1 {
            return Err(Error::Operation(
                "Filter position must be >= 1 (XSLT-style 1-based indexing)".to_string(),
            ));
        }
        if position as usize > items.len() {
            return Err(Error::Operation(format!(
                "Filter position {} exceeds the number of items ({})",
                position,
                items.len()
            )));
        }

        // A positional predicate matches exactly one item, which XSLT
        // semantics return unwrapped
        Ok(items[position as usize - 1].clone())
    }
}

/// Binds a variable in the current scope.
pub struct Variable;

impl Operation for Variable {
    fn name(&self) -> &'static str {
        "Variable"
    }

    fn description(&self) -> &'static str {
        "Sets a variable in the current scope, like XSLT's xsl:variable. \
         Variables follow lexical scoping; the binding is visible to later \
         siblings in the containing sequence."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "The variable name to assign to"
                },
                "value": {
                    "description": "The expression to evaluate and assign"
                }
            },
            "required": ["name", "value"],
            "additionalProperties": false
        })
    }

    fn execute_json(
        &self,
        evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let name = require(args, self.name(), "name")?
            .as_str()
            .ok_or_else(|| Error::Program("Variable 'name' must be a string".to_string()))?;
        let value = evaluator.process_argument(self.name(), args, "value", context, stack)?;

        debug!("binding variable {}", name);
        stack.set(name, value);
        Ok(Value::Null)
    }
}

/// Retrieves a value from the variable stack or the current binding context.
pub struct ValueOf;

impl Operation for ValueOf {
    fn name(&self) -> &'static str {
        "Value"
    }

    fn description(&self) -> &'static str {
        "Retrieves a value by name. Names with a $ prefix resolve against \
         the variable stack (inner scopes first); bare names resolve against \
         the current solution row."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "The variable or field name to look up; use a $ prefix for variables"
                }
            },
            "required": ["name"]
        })
    }

    fn execute_json(
        &self,
        _evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let name = require(args, self.name(), "name")?
            .as_str()
            .ok_or_else(|| Error::Program("Value 'name' must be a string".to_string()))?;

        if let Some(variable) = name.strip_prefix('$') {
            // Variable reference: the bound value is returned raw, without
            // any term coercion
            return stack.get(variable).cloned().ok_or_else(|| {
                Error::Program(format!("variable '${}' is not bound", variable))
            });
        }

        match context {
            Some(Value::Row(row)) => row.get(name).cloned().map(Value::Term).ok_or_else(|| {
                Error::Program(format!(
                    "variable '{}' is not bound in the current solution row",
                    name
                ))
            }),
            Some(other) => Err(Error::Type(format!(
                "Value expects the context to be a solution row, got {}",
                other.type_name()
            ))),
            None => Err(Error::Program(format!(
                "Value cannot resolve '{}' without a context",
                name
            ))),
        }
    }
}

/// Returns the current iteration item.
pub struct Current;

impl Operation for Current {
    fn name(&self) -> &'static str {
        "Current"
    }

    fn description(&self) -> &'static str {
        "Returns the current ForEach item, like XSLT's current() function."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        })
    }

    fn execute_json(
        &self,
        _evaluator: &Evaluator,
        _args: &Map<String, Json>,
        context: Option<&Value>,
        _stack: &mut VariableStack,
    ) -> Result<Value> {
        context
            .cloned()
            .ok_or_else(|| Error::Operation("Current requires a context item".to_string()))
    }
}

/// Evaluates an operation passed as data.
pub struct Execute;

impl Operation for Execute {
    fn name(&self) -> &'static str {
        "Execute"
    }

    fn description(&self) -> &'static str {
        "Evaluates an operation from its JSON representation in the current \
         context. Allows programs to be passed around as data."
    }

    fn input_schema(&self) -> Json {
        json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "object",
                    "description": "The operation to evaluate"
                }
            },
            "required": ["operation"]
        })
    }

    fn execute_json(
        &self,
        evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let operation = require(args, self.name(), "operation")?;
        evaluator.process_json(operation, context, stack)
    }
}
