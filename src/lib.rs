//! # Web Algebra
//!
//! Web Algebra is an interpreter for a small, composable, JSON-encoded
//! expression language that orchestrates Linked Data and SPARQL operations
//! over HTTP. Programs are trees of operator invocations: each node names an
//! operator (`{"@op": "GET", "args": {...}}`) whose arguments may themselves
//! be operator invocations. Evaluating a tree produces a single typed RDF
//! value: an IRI, a literal, a blank node, a solution table, or a graph.
//!
//! ## Features
//!
//! - Strictly typed operator contract with a process-wide registry
//! - Recursive evaluation with variable scoping and JSON-LD passthrough
//! - Linked Data and SPARQL protocol clients with retry and redirect handling
//! - SPARQL-aligned string, URI and UUID primitives
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use web_algebra::{Evaluator, Settings};
//!
//! let evaluator = Evaluator::new(Settings::new());
//! let program = json!({
//!     "@op": "ResolveURI",
//!     "args": {"base": "http://example.org/", "relative": "foo"}
//! });
//! let value = evaluator.evaluate(&program)?;
//! assert_eq!(value.to_string(), "http://example.org/foo");
//! # Ok::<(), web_algebra::Error>(())
//! ```

#![warn(clippy::all)]

pub mod client;
pub mod codec;
pub mod error;
pub mod mcp;
pub mod operation;
pub mod operations;
pub mod results;
pub mod settings;
pub mod value;

// Re-export commonly used types
pub use error::{Error, Result};
pub use operation::{Evaluator, Operation, Registry, VariableStack};
pub use results::{SolutionRow, SolutionTable};
pub use settings::Settings;
pub use value::Value;
