//! String tools

use crate::error::Result;
use crate::parser::Node;
use crate::tools::{Tool, ToolContext, ToolRegistry};

/// Register string tools
pub fn register(registry: &mut ToolRegistry) {
    registry.register(StrTool);
    registry.register(ConcatTool);
    registry.register(SplitTool);
    registry.register(JoinTool);
    registry.register(CaseTool { upper: true });
    registry.register(CaseTool { upper: false });
    registry.register(TrimTool);
}

/// `(str x)`: printed form of any value as a string
pub struct StrTool;

impl Tool for StrTool {
    fn name(&self) -> &str {
        "str"
    }

    fn description(&self) -> &str {
        "Converts a value to a string"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        Ok(Node::string(args[0].to_plain_string()))
    }

    fn arity(&self) -> Option<usize> {
        Some(1)
    }
}

/// `(concat a b ...)`: joins the printed forms with no separator
pub struct ConcatTool;

impl Tool for ConcatTool {
    fn name(&self) -> &str {
        "concat"
    }

    fn description(&self) -> &str {
        "Concatenates values into one string"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        let text: String = args.iter().map(Node::to_plain_string).collect();
        Ok(Node::string(text))
    }
}

/// `(split s sep)`: an empty separator splits on whitespace
pub struct SplitTool;

impl Tool for SplitTool {
    fn name(&self) -> &str {
        "split"
    }

    fn description(&self) -> &str {
        "Splits a string into a list of strings"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        let text = args[0].as_str()?;
        let sep = args[1].as_str()?;

        let parts: Vec<Node> = if sep.is_empty() {
            text.split_whitespace().map(Node::string).collect()
        } else {
            text.split(sep).map(Node::string).collect()
        };
        Ok(Node::list(parts))
    }

    fn arity(&self) -> Option<usize> {
        Some(2)
    }
}

/// `(join l sep)`
pub struct JoinTool;

impl Tool for JoinTool {
    fn name(&self) -> &str {
        "join"
    }

    fn description(&self) -> &str {
        "Joins list elements with a separator"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        let items = args[0].as_list()?;
        let sep = args[1].as_str()?;
        let parts: Vec<String> = items.iter().map(Node::to_plain_string).collect();
        Ok(Node::string(parts.join(sep)))
    }

    fn arity(&self) -> Option<usize> {
        Some(2)
    }
}

/// `upper` / `lower`
pub struct CaseTool {
    upper: bool,
}

impl Tool for CaseTool {
    fn name(&self) -> &str {
        if self.upper {
            "upper"
        } else {
            "lower"
        }
    }

    fn description(&self) -> &str {
        "Changes the case of a string"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        let text = args[0].as_str()?;
        Ok(Node::string(if self.upper {
            text.to_uppercase()
        } else {
            text.to_lowercase()
        }))
    }

    fn arity(&self) -> Option<usize> {
        Some(1)
    }
}

/// `(trim s)`: strips leading and trailing whitespace
pub struct TrimTool;

impl Tool for TrimTool {
    fn name(&self) -> &str {
        "trim"
    }

    fn description(&self) -> &str {
        "Trims whitespace"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        Ok(Node::string(args[0].as_str()?.trim()))
    }

    fn arity(&self) -> Option<usize> {
        Some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::tools::test_support::call;

    #[test]
    fn test_str_and_concat() {
        assert_eq!(call(&StrTool, &[Node::int(42)]).unwrap(), Node::string("42"));
        assert_eq!(
            call(&ConcatTool, &[Node::string("a"), Node::int(1), Node::boolean(true)]).unwrap(),
            Node::string("a1true")
        );
    }

    #[test]
    fn test_split_and_join() {
        let parts = call(&SplitTool, &[Node::string("a,b,,c"), Node::string(",")]).unwrap();
        assert_eq!(parts, Node::from(vec!["a", "b", "", "c"]));

        let words = call(&SplitTool, &[Node::string("  one  two "), Node::string("")]).unwrap();
        assert_eq!(words, Node::from(vec!["one", "two"]));

        let joined = call(&JoinTool, &[Node::from(vec![1i64, 2, 3]), Node::string("-")]).unwrap();
        assert_eq!(joined, Node::string("1-2-3"));
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(
            call(&CaseTool { upper: true }, &[Node::string("abC")]).unwrap(),
            Node::string("ABC")
        );
        assert_eq!(call(&TrimTool, &[Node::string(" x \n")]).unwrap(), Node::string("x"));
        assert_eq!(
            call(&TrimTool, &[Node::int(1)]).unwrap_err(),
            Error::type_error("string", "number")
        );
    }
}
