//! Builtin procedure registry for exprsh
//!
//! Builtins receive already-evaluated arguments. Forms that need the
//! evaluator itself (`do`, `eval`, `map`, ...) live in the runtime instead.

pub mod stdlib;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::parser::Node;
use crate::runtime::Environment;

/// Interpreter state a builtin may touch
pub struct ToolContext<'a> {
    /// Directories searched for external programs
    pub search_path: &'a [PathBuf],
    /// Bindings visible to the caller; `unset` and `vars` work on the
    /// layer `let` writes to
    pub env: &'a mut Environment,
}

/// Tool trait - every builtin procedure implements this
pub trait Tool: Send + Sync {
    /// Name the tool is called by
    fn name(&self) -> &str;

    /// Tool description
    fn description(&self) -> &str;

    /// Execute the tool
    fn execute(&self, args: &[Node], ctx: &mut ToolContext<'_>) -> Result<Node>;

    /// Exact argument count, checked before `execute`; `None` means variadic
    fn arity(&self) -> Option<usize> {
        None
    }
}

/// Tool registry
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create new registry with the standard library
    pub fn new() -> Self {
        let mut registry = ToolRegistry::empty();
        stdlib::register_all(&mut registry);
        registry
    }

    /// Create empty registry (for testing)
    pub fn empty() -> Self {
        ToolRegistry {
            tools: HashMap::new(),
        }
    }

    /// Register a tool, replacing any tool of the same name
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Get tool by name, if registered
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if tool exists
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Fails with `InvalidArguments` unless at least `min` arguments were given
pub(crate) fn require_at_least(tool: &str, args: &[Node], min: usize) -> Result<()> {
    if args.len() < min {
        return Err(Error::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("expected at least {} arguments, got {}", min, args.len()),
        });
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo-first"
        }

        fn description(&self) -> &str {
            "Returns its first argument"
        }

        fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
            Ok(args.first().cloned().unwrap_or_else(|| Node::int(42)))
        }
    }

    #[test]
    fn test_tool_registration() {
        let mut registry = ToolRegistry::empty();
        registry.register(EchoTool);

        assert!(registry.has("echo-first"));
        assert!(!registry.has("UNKNOWN"));
        assert!(registry.lookup("UNKNOWN").is_none());
        assert_eq!(
            registry.lookup("echo-first").map(|tool| tool.name().to_string()),
            Some("echo-first".to_string())
        );
    }

    #[test]
    fn test_tool_execution() {
        let tool = EchoTool;
        assert_eq!(test_support::call(&tool, &[]).unwrap(), Node::int(42));
        assert_eq!(
            test_support::call(&tool, &[Node::string("hello")]).unwrap(),
            Node::string("hello")
        );
    }

    #[test]
    fn test_standard_registry_is_populated() {
        let registry = ToolRegistry::new();
        for name in ["+", "hd", "concat", "to-json", "pwd", "println"] {
            assert!(registry.has(name), "missing builtin {}", name);
        }
    }
}
