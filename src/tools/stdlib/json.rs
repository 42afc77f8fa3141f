//! JSON conversion tools (`to-json`, `from-json`)

use crate::error::{Error, Result};
use crate::parser::{Node, Number, Value};
use crate::tools::{Tool, ToolContext, ToolRegistry};

/// Register JSON tools
pub fn register(registry: &mut ToolRegistry) {
    registry.register(ToJsonTool);
    registry.register(FromJsonTool);
}

/// Convert a data node to serde_json::Value
fn node_to_json(node: &Node) -> Result<serde_json::Value> {
    match &node.value {
        Value::String(s) => Ok(serde_json::Value::String(s.clone())),
        Value::Boolean(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Number(Number::Int(n)) => Ok(serde_json::Value::from(*n)),
        Value::Number(Number::UInt(n)) => Ok(serde_json::Value::from(*n)),
        Value::List(items) => items
            .iter()
            .map(node_to_json)
            .collect::<Result<Vec<_>>>()
            .map(serde_json::Value::Array),
        _ => Err(Error::type_error(
            "string, number, boolean or list",
            node.type_name(),
        )),
    }
}

/// Convert serde_json::Value to a data node
fn json_to_node(json: &serde_json::Value) -> Result<Node> {
    match json {
        serde_json::Value::Bool(b) => Ok(Node::boolean(*b)),
        serde_json::Value::String(s) => Ok(Node::string(s.as_str())),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Node::int(i))
            } else if let Some(u) = n.as_u64() {
                Ok(Node::number(Number::from_u64(u)))
            } else {
                Err(Error::type_error("integer", "float"))
            }
        }
        serde_json::Value::Array(items) => items
            .iter()
            .map(json_to_node)
            .collect::<Result<Vec<_>>>()
            .map(Node::list),
        serde_json::Value::Null => Err(Error::type_error("JSON data value", "null")),
        serde_json::Value::Object(_) => Err(Error::type_error("JSON data value", "object")),
    }
}

/// `(to-json x)`: JSON text of a string, number, boolean or list
pub struct ToJsonTool;

impl Tool for ToJsonTool {
    fn name(&self) -> &str {
        "to-json"
    }

    fn description(&self) -> &str {
        "Serializes a value to JSON text"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        let json = node_to_json(&args[0])?;
        Ok(Node::string(json.to_string()))
    }

    fn arity(&self) -> Option<usize> {
        Some(1)
    }
}

/// `(from-json text)`: parses JSON arrays and scalars back into nodes
pub struct FromJsonTool;

impl Tool for FromJsonTool {
    fn name(&self) -> &str {
        "from-json"
    }

    fn description(&self) -> &str {
        "Parses JSON text into a value"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        let text = args[0].as_str()?;
        let json: serde_json::Value =
            serde_json::from_str(text).map_err(|e| Error::InvalidArguments {
                tool: self.name().to_string(),
                reason: e.to_string(),
            })?;
        json_to_node(&json)
    }

    fn arity(&self) -> Option<usize> {
        Some(1)
    }
}
