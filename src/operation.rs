//! The operation contract, the registry, and the evaluator
//!
//! A program is a JSON tree of operator invocations. The [`Evaluator`] walks
//! the tree: operator nodes (`{"@op": ..., "args": {...}}`) dispatch through
//! the [`Registry`]; plain objects are traversed member by member so that
//! nested operators inside JSON-LD are resolved in place; lists evaluate
//! their elements in order against a shared scope; scalars become RDF terms.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use serde_json::{Map, Value as Json};

use crate::error::{Error, Result};
use crate::mcp::{McpContent, ToolDescriptor};
use crate::settings::Settings;
use crate::value::{json_to_term, Value};

/// A named operation of the expression language.
///
/// `execute_json` receives its raw JSON arguments, evaluates them through
/// the evaluator, performs strict type checks, and runs the operation
/// proper. Operations that also work as standalone MCP tools override
/// `mcp_run` and `is_mcp_tool`.
pub trait Operation: Send + Sync {
    /// Stable operator name, used as the `@op` key.
    fn name(&self) -> &'static str;

    /// Human-readable description, advertised on the MCP surface.
    fn description(&self) -> &'static str;

    /// JSON schema of the arguments. Advisory; the evaluator does not
    /// validate arguments against it.
    fn input_schema(&self) -> Json;

    /// Evaluates the JSON arguments and runs the operation.
    fn execute_json(
        &self,
        evaluator: &Evaluator,
        args: &Map<String, Json>,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value>;

    /// Runs the operation with plain JSON arguments for an MCP client.
    fn mcp_run(&self, _settings: &Settings, _args: &Map<String, Json>) -> Result<Vec<McpContent>> {
        Err(Error::Operation(format!(
            "{} is not exposed as an MCP tool",
            self.name()
        )))
    }

    /// Whether this operation is advertised as an MCP tool.
    fn is_mcp_tool(&self) -> bool {
        false
    }
}

/// Looks up a required argument, failing with the operator name.
pub fn require<'a>(args: &'a Map<String, Json>, op: &str, name: &str) -> Result<&'a Json> {
    args.get(name)
        .ok_or_else(|| Error::Program(format!("{} is missing the '{}' argument", op, name)))
}

/// A stack of name→value scopes. Inner frames shadow outer ones.
#[derive(Debug, Clone, Default)]
pub struct VariableStack {
    frames: Vec<HashMap<String, Value>>,
}

impl VariableStack {
    pub fn new() -> Self {
        VariableStack { frames: Vec::new() }
    }

    /// Enters a new scope.
    pub fn push_scope(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Leaves the current scope, dropping its bindings.
    pub fn pop_scope(&mut self) {
        self.frames.pop();
    }

    /// Binds a name in the innermost scope, opening one if none exists.
    pub fn set(&mut self, name: &str, value: Value) {
        if self.frames.is_empty() {
            self.frames.push(HashMap::new());
        }
        self.frames
            .last_mut()
            .expect("frame pushed above")
            .insert(name.to_string(), value);
    }

    /// Resolves a name, searching from the innermost scope outwards.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
    }
}

/// Process-wide map from operator name to implementation. Read-only after
/// startup; lookups need no locking.
pub struct Registry {
    operations: HashMap<&'static str, Box<dyn Operation>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Registry {
            operations: HashMap::new(),
        }
    }

    /// A registry with every builtin operation registered.
    pub fn builtin() -> Self {
        let mut registry = Registry::new();
        crate::operations::register_builtins(&mut registry)
            .expect("builtin operation names are unique");
        registry
    }

    /// Registers an operation. Re-registering a name is an error.
    pub fn register(&mut self, operation: Box<dyn Operation>) -> Result<()> {
        let name = operation.name();
        if self.operations.contains_key(name) {
            return Err(Error::Program(format!(
                "operation {} is already registered",
                name
            )));
        }
        info!("registered operation: {}", name);
        self.operations.insert(name, operation);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Operation> {
        self.operations.get(name).map(|op| op.as_ref())
    }

    pub fn operations(&self) -> impl Iterator<Item = &dyn Operation> {
        self.operations.values().map(|op| op.as_ref())
    }

    /// Descriptors for the operations that opt into the MCP surface.
    pub fn mcp_tools(&self) -> Vec<ToolDescriptor> {
        let mut tools: Vec<ToolDescriptor> = self
            .operations()
            .filter(|op| op.is_mcp_tool())
            .map(|op| ToolDescriptor {
                name: op.name().to_string(),
                description: op.description().to_string(),
                input_schema: op.input_schema(),
            })
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Evaluates JSON programs against a registry and shared settings.
pub struct Evaluator {
    settings: Arc<Settings>,
    registry: Arc<Registry>,
}

impl Evaluator {
    /// An evaluator over the builtin operations.
    pub fn new(settings: Settings) -> Self {
        Evaluator {
            settings: Arc::new(settings),
            registry: Arc::new(Registry::builtin()),
        }
    }

    pub fn with_registry(settings: Settings, registry: Registry) -> Self {
        Evaluator {
            settings: Arc::new(settings),
            registry: Arc::new(registry),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Evaluates a whole program with an empty context and variable stack.
    pub fn evaluate(&self, json: &Json) -> Result<Value> {
        let mut stack = VariableStack::new();
        self.process_json(json, None, &mut stack)
    }

    /// Recursively evaluates a program node.
    pub fn process_json(
        &self,
        json: &Json,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        match json {
            Json::Object(map) if map.contains_key("@op") => {
                let name = map
                    .get("@op")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| Error::Program("@op must be a string".to_string()))?;
                let operation = self
                    .registry
                    .get(name)
                    .ok_or_else(|| Error::Program(format!("unknown operation: {}", name)))?;

                let empty = Map::new();
                let args = match map.get("args") {
                    None => &empty,
                    Some(Json::Object(args)) => args,
                    Some(other) => {
                        return Err(Error::Program(format!(
                            "{}: args must be an object, got {}",
                            name, other
                        )))
                    }
                };

                debug!("executing operation: {}", name);
                operation.execute_json(self, args, context, stack)
            }
            Json::Object(map) => {
                // JSON-LD passthrough: resolve nested operators member by
                // member, keeping the containing structure intact
                let mut evaluated = Map::new();
                for (key, member) in map {
                    let result = self.process_json(member, context, stack)?;
                    evaluated.insert(key.clone(), result.to_jsonld()?);
                }
                Ok(Value::Json(Json::Object(evaluated)))
            }
            Json::Array(items) => {
                // Sequential composition: elements share one scope so that
                // Variable bindings reach later siblings, but nothing leaks
                // past the end of the list
                let mut scoped = stack.clone();
                let mut results = Vec::with_capacity(items.len());
                for item in items {
                    results.push(self.process_json(item, context, &mut scoped)?);
                }
                Ok(Value::List(results))
            }
            Json::Null => Ok(Value::Null),
            scalar => Ok(Value::Term(json_to_term(scalar)?)),
        }
    }

    /// Evaluates one argument of an operation.
    pub fn process_argument(
        &self,
        op: &str,
        args: &Map<String, Json>,
        name: &str,
        context: Option<&Value>,
        stack: &mut VariableStack,
    ) -> Result<Value> {
        let json = require(args, op, name)?;
        self.process_json(json, context, stack)
    }

    /// Runs an operation as an MCP tool.
    pub fn call_tool(&self, name: &str, args: &Map<String, Json>) -> Result<Vec<McpContent>> {
        let operation = self
            .registry
            .get(name)
            .ok_or_else(|| Error::Program(format!("unknown operation: {}", name)))?;
        if !operation.is_mcp_tool() {
            return Err(Error::Operation(format!(
                "{} is not exposed as an MCP tool",
                name
            )));
        }
        operation.mcp_run(&self.settings, args)
    }
}
