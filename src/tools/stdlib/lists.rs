//! List tools

use crate::error::{Error, Result};
use crate::parser::{Node, Value};
use crate::tools::{Tool, ToolContext, ToolRegistry};

/// Register list tools
pub fn register(registry: &mut ToolRegistry) {
    registry.register(ListTool);
    registry.register(HeadTool);
    registry.register(TailTool);
    registry.register(ConsTool);
    registry.register(LenTool);
    registry.register(NthTool);
    registry.register(AppendTool);
    registry.register(ReverseTool);
}

fn non_empty<'a>(tool: &str, node: &'a Node) -> Result<(&'a Node, &'a [Node])> {
    let items = node.as_list()?;
    items
        .split_first()
        .ok_or_else(|| Error::type_error(format!("a non-empty list for {}", tool), "empty list"))
}

/// `(list a b ...)`: a list of the arguments
pub struct ListTool;

impl Tool for ListTool {
    fn name(&self) -> &str {
        "list"
    }

    fn description(&self) -> &str {
        "Creates a list from its arguments"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        Ok(Node::list(args.to_vec()))
    }
}

/// `(hd l)`: first element
pub struct HeadTool;

impl Tool for HeadTool {
    fn name(&self) -> &str {
        "hd"
    }

    fn description(&self) -> &str {
        "First element of a list"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        let (head, _) = non_empty(self.name(), &args[0])?;
        Ok(head.clone())
    }

    fn arity(&self) -> Option<usize> {
        Some(1)
    }
}

/// `(tl l)`: every element but the first
pub struct TailTool;

impl Tool for TailTool {
    fn name(&self) -> &str {
        "tl"
    }

    fn description(&self) -> &str {
        "List without its first element"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        let (_, tail) = non_empty(self.name(), &args[0])?;
        Ok(Node::list(tail.to_vec()))
    }

    fn arity(&self) -> Option<usize> {
        Some(1)
    }
}

/// `(cons x l)`: `l` with `x` in front
pub struct ConsTool;

impl Tool for ConsTool {
    fn name(&self) -> &str {
        "cons"
    }

    fn description(&self) -> &str {
        "Prepends an element to a list"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        let tail = args[1].as_list()?;
        let mut items = Vec::with_capacity(tail.len() + 1);
        items.push(args[0].clone());
        items.extend_from_slice(tail);
        Ok(Node::list(items))
    }

    fn arity(&self) -> Option<usize> {
        Some(2)
    }
}

/// `(len x)`: element count of a list, character count of a string
pub struct LenTool;

impl Tool for LenTool {
    fn name(&self) -> &str {
        "len"
    }

    fn description(&self) -> &str {
        "Length of a list or string"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        let len = match &args[0].value {
            Value::List(items) => items.len(),
            Value::String(s) => s.chars().count(),
            _ => return Err(Error::type_error("list or string", args[0].type_name())),
        };
        Ok(Node::int(len as i64))
    }

    fn arity(&self) -> Option<usize> {
        Some(1)
    }
}

/// `(nth l i)`: zero-based element access
pub struct NthTool;

impl Tool for NthTool {
    fn name(&self) -> &str {
        "nth"
    }

    fn description(&self) -> &str {
        "Element at a zero-based index"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        let items = args[0].as_list()?;
        let index = args[1].as_number()?;

        index
            .to_u64()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| items.get(i))
            .cloned()
            .ok_or_else(|| Error::InvalidArguments {
                tool: self.name().to_string(),
                reason: format!("index {} out of range for list of {}", index, items.len()),
            })
    }

    fn arity(&self) -> Option<usize> {
        Some(2)
    }
}

/// `(append l1 l2 ...)`: concatenation
pub struct AppendTool;

impl Tool for AppendTool {
    fn name(&self) -> &str {
        "append"
    }

    fn description(&self) -> &str {
        "Concatenates lists"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        let mut items = Vec::new();
        for arg in args {
            items.extend_from_slice(arg.as_list()?);
        }
        Ok(Node::list(items))
    }
}

/// `(reverse l)`
pub struct ReverseTool;

impl Tool for ReverseTool {
    fn name(&self) -> &str {
        "reverse"
    }

    fn description(&self) -> &str {
        "Reverses a list"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        let mut items = args[0].as_list()?.to_vec();
        items.reverse();
        Ok(Node::list(items))
    }

    fn arity(&self) -> Option<usize> {
        Some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::call;

    fn ints(values: &[i64]) -> Node {
        Node::from(values.to_vec())
    }

    #[test]
    fn test_head_and_tail() {
        assert_eq!(call(&HeadTool, &[ints(&[1, 2, 3])]).unwrap(), Node::int(1));
        assert_eq!(call(&TailTool, &[ints(&[1, 2, 3])]).unwrap(), ints(&[2, 3]));
    }

    #[test]
    fn test_head_of_empty_list_is_type_error() {
        let err = call(&HeadTool, &[ints(&[])]).unwrap_err();
        assert!(matches!(err, Error::TypeError { .. }));
        let err = call(&TailTool, &[Node::int(5)]).unwrap_err();
        assert_eq!(err, Error::type_error("list", "number"));
    }

    #[test]
    fn test_construction() {
        assert_eq!(
            call(&ConsTool, &[Node::int(0), ints(&[1])]).unwrap(),
            ints(&[0, 1])
        );
        assert_eq!(
            call(&AppendTool, &[ints(&[1]), ints(&[]), ints(&[2, 3])]).unwrap(),
            ints(&[1, 2, 3])
        );
        assert_eq!(call(&ReverseTool, &[ints(&[1, 2])]).unwrap(), ints(&[2, 1]));
        let list = call(&ListTool, &[Node::int(1), Node::string("a")]).unwrap();
        assert!(list.is_literal);
        assert_eq!(list.as_list().unwrap().len(), 2);
    }

    #[test]
    fn test_len_and_nth() {
        assert_eq!(call(&LenTool, &[ints(&[4, 5])]).unwrap(), Node::int(2));
        assert_eq!(call(&LenTool, &[Node::string("héllo")]).unwrap(), Node::int(5));
        assert_eq!(call(&NthTool, &[ints(&[4, 5]), Node::int(1)]).unwrap(), Node::int(5));
        assert!(call(&NthTool, &[ints(&[4, 5]), Node::int(2)]).is_err());
        assert!(call(&NthTool, &[ints(&[4, 5]), Node::int(-1)]).is_err());
    }
}
