//! Output tools

use std::io::Write;

use crate::error::{Error, Result};
use crate::parser::Node;
use crate::tools::{Tool, ToolContext, ToolRegistry};

/// Register output tools
pub fn register(registry: &mut ToolRegistry) {
    registry.register(PrintTool { newline: false });
    registry.register(PrintTool { newline: true });
}

/// Space-separated printed forms of the arguments
pub fn render(args: &[Node]) -> String {
    args.iter()
        .map(Node::to_plain_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `print` / `println`: writes the arguments to stdout
///
/// Returns `CommandResult 0` like a successful command, so the shell
/// does not echo anything after the output.
pub struct PrintTool {
    newline: bool,
}

impl Tool for PrintTool {
    fn name(&self) -> &str {
        if self.newline {
            "println"
        } else {
            "print"
        }
    }

    fn description(&self) -> &str {
        "Prints values to stdout"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        let mut text = render(args);
        if self.newline {
            text.push('\n');
        }

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        out.write_all(text.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|e| Error::runtime(format!("{}: {}", self.name(), e)))?;

        Ok(Node::command_result(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_uses_plain_strings() {
        let args = [
            Node::string("a b"),
            Node::int(3),
            Node::from(vec!["x"]),
        ];
        assert_eq!(render(&args), "a b 3 '[\"x\"]");
    }
}
