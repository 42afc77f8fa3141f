//! Shell builtins: working directory, process environment, executable lookup
//! and the current variable scope

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::parser::Node;
use crate::runtime::resolve_in_path;
use crate::tools::{Tool, ToolContext, ToolRegistry};

/// Register shell tools
pub fn register(registry: &mut ToolRegistry) {
    registry.register(CdTool);
    registry.register(PwdTool);
    registry.register(GetenvTool);
    registry.register(SetenvTool);
    registry.register(WhichTool);
    registry.register(UnsetTool);
    registry.register(VarsTool);
}

fn os_error(tool: &str, e: std::io::Error) -> Error {
    Error::ProcessError {
        command: tool.to_string(),
        reason: e.to_string(),
    }
}

/// `cd [dir]`: changes the working directory, `$HOME` without an argument
pub struct CdTool;

impl Tool for CdTool {
    fn name(&self) -> &str {
        "cd"
    }

    fn description(&self) -> &str {
        "Changes the working directory"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        let target = match args {
            [] => std::env::var_os("HOME")
                .map(PathBuf::from)
                .ok_or_else(|| Error::InvalidArguments {
                    tool: self.name().to_string(),
                    reason: "HOME is not set".to_string(),
                })?,
            [dir] => PathBuf::from(dir.to_plain_string()),
            _ => {
                return Err(Error::ArityError {
                    name: self.name().to_string(),
                    expected: 1,
                    got: args.len(),
                })
            }
        };

        std::env::set_current_dir(&target).map_err(|e| os_error(self.name(), e))?;
        Ok(Node::command_result(0))
    }
}

/// `pwd`: working directory as a string
pub struct PwdTool;

impl Tool for PwdTool {
    fn name(&self) -> &str {
        "pwd"
    }

    fn description(&self) -> &str {
        "Current working directory"
    }

    fn execute(&self, _args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        let dir = std::env::current_dir().map_err(|e| os_error(self.name(), e))?;
        Ok(Node::string(dir.to_string_lossy()))
    }

    fn arity(&self) -> Option<usize> {
        Some(0)
    }
}

/// `getenv NAME`: the variable's value, `false` when unset
pub struct GetenvTool;

impl Tool for GetenvTool {
    fn name(&self) -> &str {
        "getenv"
    }

    fn description(&self) -> &str {
        "Reads a process environment variable"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        Ok(match std::env::var(args[0].to_plain_string()) {
            Ok(value) => Node::string(value),
            Err(_) => Node::boolean(false),
        })
    }

    fn arity(&self) -> Option<usize> {
        Some(1)
    }
}

/// `setenv NAME value`: exported to every later external command
pub struct SetenvTool;

impl Tool for SetenvTool {
    fn name(&self) -> &str {
        "setenv"
    }

    fn description(&self) -> &str {
        "Sets a process environment variable"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        let key = args[0].to_plain_string();
        if key.is_empty() || key.contains('=') || key.contains('\0') {
            return Err(Error::InvalidArguments {
                tool: self.name().to_string(),
                reason: format!("invalid variable name {:?}", key),
            });
        }
        let value = args[1].to_plain_string();
        if value.contains('\0') {
            return Err(Error::InvalidArguments {
                tool: self.name().to_string(),
                reason: "value contains a NUL byte".to_string(),
            });
        }

        std::env::set_var(key, value);
        Ok(Node::command_result(0))
    }

    fn arity(&self) -> Option<usize> {
        Some(2)
    }
}

/// `which NAME`: resolved executable path, `false` when not found
pub struct WhichTool;

impl Tool for WhichTool {
    fn name(&self) -> &str {
        "which"
    }

    fn description(&self) -> &str {
        "Locates an executable on the search path"
    }

    fn execute(&self, args: &[Node], ctx: &mut ToolContext<'_>) -> Result<Node> {
        let name = args[0].to_plain_string();
        Ok(match resolve_in_path(&name, ctx.search_path) {
            Some(path) => Node::string(path.to_string_lossy()),
            None => Node::boolean(false),
        })
    }

    fn arity(&self) -> Option<usize> {
        Some(1)
    }
}

/// `unset @name`: drops a binding from the current scope
pub struct UnsetTool;

impl Tool for UnsetTool {
    fn name(&self) -> &str {
        "unset"
    }

    fn description(&self) -> &str {
        "Removes a variable from the current scope"
    }

    fn execute(&self, args: &[Node], ctx: &mut ToolContext<'_>) -> Result<Node> {
        let name = args[0].to_plain_string();
        Ok(Node::boolean(ctx.env.unbind(&name).is_some()))
    }

    fn arity(&self) -> Option<usize> {
        Some(1)
    }
}

/// `vars`: sorted names visible here, constants included
pub struct VarsTool;

impl Tool for VarsTool {
    fn name(&self) -> &str {
        "vars"
    }

    fn description(&self) -> &str {
        "Lists visible variables and constants"
    }

    fn execute(&self, _args: &[Node], ctx: &mut ToolContext<'_>) -> Result<Node> {
        Ok(Node::list(
            ctx.env.visible_names().into_iter().map(Node::string).collect(),
        ))
    }

    fn arity(&self) -> Option<usize> {
        Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Environment;
    use crate::tools::test_support::call;

    #[test]
    fn test_setenv_then_getenv() {
        let key = "EXPRSH_SHELL_TOOL_TEST";
        call(&SetenvTool, &[Node::string(key), Node::int(7)]).unwrap();
        assert_eq!(call(&GetenvTool, &[Node::string(key)]).unwrap(), Node::string("7"));
        assert_eq!(
            call(&GetenvTool, &[Node::string("EXPRSH_SURELY_UNSET_VAR")]).unwrap(),
            Node::boolean(false)
        );
        assert!(call(&SetenvTool, &[Node::string("A=B"), Node::int(1)]).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_pwd_is_absolute() {
        let dir = call(&PwdTool, &[]).unwrap();
        assert!(dir.as_str().unwrap().starts_with('/'));
    }

    #[test]
    fn test_scope_tools() {
        let mut env = Environment::new();
        env.bind("b", Node::int(1));
        env.bind("a", Node::int(2));
        env.define_constant("pi".to_string(), Node::int(3)).unwrap();
        let mut ctx = ToolContext {
            search_path: &[],
            env: &mut env,
        };

        let names = VarsTool.execute(&[], &mut ctx).unwrap();
        assert_eq!(names, Node::from(vec!["a", "b", "pi"]));

        let removed = UnsetTool.execute(&[Node::identifier("a")], &mut ctx).unwrap();
        assert_eq!(removed, Node::boolean(true));
        let removed = UnsetTool.execute(&[Node::identifier("a")], &mut ctx).unwrap();
        assert_eq!(removed, Node::boolean(false));
        // constants live outside the `let` layer
        let removed = UnsetTool.execute(&[Node::identifier("pi")], &mut ctx).unwrap();
        assert_eq!(removed, Node::boolean(false));
        assert!(!env.exists("a"));
        assert!(env.exists("b"));
    }

    #[test]
    fn test_which_without_path() {
        assert_eq!(
            call(&WhichTool, &[Node::string("sh")]).unwrap(),
            Node::boolean(false)
        );
    }
}
