//! Builtin operations of the expression language

pub mod control;
pub mod graph;
pub mod linked_data;
pub mod sparql;
pub mod string;
pub mod substitute;
pub mod uri;

use crate::error::Result;
use crate::operation::Registry;

/// Registers every builtin operation. Fails when a name is registered twice.
pub fn register_builtins(registry: &mut Registry) -> Result<()> {
    registry.register(Box::new(control::ForEach))?;
    registry.register(Box::new(control::Filter))?;
    registry.register(Box::new(control::Variable))?;
    registry.register(Box::new(control::ValueOf))?;
    registry.register(Box::new(control::Current))?;
    registry.register(Box::new(control::Execute))?;
    registry.register(Box::new(string::Str))?;
    registry.register(Box::new(string::Concat))?;
    registry.register(Box::new(string::EncodeForUri))?;
    registry.register(Box::new(string::Replace))?;
    registry.register(Box::new(string::StrUuid))?;
    registry.register(Box::new(uri::Uri))?;
    registry.register(Box::new(uri::ResolveUri))?;
    registry.register(Box::new(graph::Merge))?;
    registry.register(Box::new(graph::Bindings))?;
    registry.register(Box::new(substitute::Substitute))?;
    registry.register(Box::new(linked_data::Get))?;
    registry.register(Box::new(linked_data::Post))?;
    registry.register(Box::new(linked_data::Put))?;
    registry.register(Box::new(linked_data::Patch))?;
    registry.register(Box::new(sparql::Select))?;
    registry.register(Box::new(sparql::Construct))?;
    registry.register(Box::new(sparql::Describe))?;
    registry.register(Box::new(sparql::Update))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_register() {
        let registry = Registry::builtin();
        for name in [
            "ForEach", "Filter", "Variable", "Value", "Current", "Execute", "Str", "Concat",
            "EncodeForURI", "Replace", "STRUUID", "Uri", "ResolveURI", "Merge", "Bindings",
            "Substitute", "GET", "POST", "PUT", "PATCH", "SELECT", "CONSTRUCT", "DESCRIBE",
            "Update",
        ] {
            assert!(registry.get(name).is_some(), "missing operation {}", name);
        }
    }

    #[test]
    fn test_mcp_tool_listing() {
        let registry = Registry::builtin();
        let tools: Vec<String> = registry.mcp_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            tools,
            vec![
                "CONSTRUCT",
                "Concat",
                "Merge",
                "POST",
                "ResolveURI",
                "STRUUID",
                "Substitute",
                "Update"
            ]
        );
    }
}
