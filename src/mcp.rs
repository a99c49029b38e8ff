//! Types for exposing operations as MCP tools
//!
//! Operations that opt into the MCP surface convert plain JSON arguments to
//! RDF terms, run their pure logic, and answer with content parts. The
//! transport that actually serves the tools is external; only the adapter
//! contract lives here.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// One content part of a tool answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct McpContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

impl McpContent {
    pub fn text(text: impl Into<String>) -> Self {
        McpContent {
            content_type: "text".to_string(),
            text: text.into(),
        }
    }
}

/// Tool metadata advertised to MCP clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Json,
}
