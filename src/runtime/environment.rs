use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::parser::Node;

/// A user procedure interned by `let name = (params) => body`
#[derive(Debug, Clone, PartialEq)]
pub struct Procedure {
    /// Parameter names, in call order
    pub params: Vec<String>,
    /// Body expressions; the last value is the call's result
    pub body: Vec<Node>,
}

/// Parameter bindings of one active procedure call
#[derive(Debug, Clone)]
struct CallFrame {
    /// Procedure being executed
    name: String,
    bindings: HashMap<String, Node>,
}

/// Scope model: constants, dynamic variables and call frames, plus the
/// procedure table stack
#[derive(Debug, Clone)]
pub struct Environment {
    /// Written only by top-level `let global`; never cleared
    constants: Arc<HashMap<String, Node>>,
    /// Dynamic variables, cleared after each top-level evaluation
    variables: HashMap<String, Node>,
    /// Active user procedure calls, innermost last
    frames: Vec<CallFrame>,
    /// Procedure table scopes, innermost last; the first is the global table
    procedures: Vec<HashMap<String, Arc<Procedure>>>,
}

impl Environment {
    /// Creates an empty environment with a global procedure scope
    pub fn new() -> Self {
        Environment {
            constants: Arc::new(HashMap::new()),
            variables: HashMap::new(),
            frames: Vec::new(),
            procedures: vec![HashMap::new()],
        }
    }

    /// Resolves a name: top call frame, then dynamic variables, then constants.
    /// Enclosing frames are never consulted.
    pub fn lookup(&self, name: &str) -> Option<&Node> {
        if let Some(frame) = self.frames.last() {
            if let Some(value) = frame.bindings.get(name) {
                return Some(value);
            }
        }
        self.variables
            .get(name)
            .or_else(|| self.constants.get(name))
    }

    /// Binds a name in the layer `let` writes to
    pub fn bind(&mut self, name: impl Into<String>, value: Node) {
        self.scope_mut().insert(name.into(), value);
    }

    /// Removes a binding from the layer `let` writes to
    pub fn unbind(&mut self, name: &str) -> Option<Node> {
        self.scope_mut().remove(name)
    }

    /// Bindings of the top call frame, or the dynamic variables at top level
    fn scope_mut(&mut self) -> &mut HashMap<String, Node> {
        match self.frames.last_mut() {
            Some(frame) => &mut frame.bindings,
            None => &mut self.variables,
        }
    }

    /// Defines an immutable constant (cannot be reassigned)
    pub fn define_constant(&mut self, name: String, value: Node) -> Result<()> {
        if self.constants.contains_key(&name) {
            return Err(Error::ConstantReassignment { name });
        }

        let mut constants = (*self.constants).clone();
        constants.insert(name, value);
        self.constants = Arc::new(constants);
        Ok(())
    }

    pub fn is_constant(&self, name: &str) -> bool {
        self.constants.contains_key(name)
    }

    /// Enters a user procedure call
    pub fn push_frame(&mut self, name: impl Into<String>, bindings: HashMap<String, Node>) {
        self.frames.push(CallFrame {
            name: name.into(),
            bindings,
        });
    }

    /// Leaves the innermost user procedure call
    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Number of active procedure calls
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    /// Name of the procedure currently executing
    pub fn current_procedure(&self) -> Option<&str> {
        self.frames.last().map(|frame| frame.name.as_str())
    }

    pub fn push_procedure_scope(&mut self) {
        self.procedures.push(HashMap::new());
    }

    /// Pops a procedure scope; the global table is never popped
    pub fn pop_procedure_scope(&mut self) {
        if self.procedures.len() > 1 {
            self.procedures.pop();
        }
    }

    /// Interns a procedure in the innermost procedure scope
    pub fn define_procedure(&mut self, name: impl Into<String>, procedure: Procedure) {
        if let Some(scope) = self.procedures.last_mut() {
            scope.insert(name.into(), Arc::new(procedure));
        }
    }

    /// Finds a procedure, innermost scope first
    pub fn procedure(&self, name: &str) -> Option<Arc<Procedure>> {
        self.procedures
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).cloned())
    }

    pub fn has_procedure(&self, name: &str) -> bool {
        self.procedures.iter().any(|scope| scope.contains_key(name))
    }

    /// True when a variable or constant with this name is visible
    pub fn exists(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Visible variable names, sorted
    pub fn visible_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .constants
            .keys()
            .chain(self.variables.keys())
            .chain(self.frames.last().into_iter().flat_map(|f| f.bindings.keys()))
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Ends a top-level evaluation: clears dynamic variables and unwinds
    /// any frames and procedure scopes left behind by an error
    pub fn reset_dynamic(&mut self) {
        self.variables.clear();
        self.frames.clear();
        self.procedures.truncate(1);
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_order() {
        let mut env = Environment::new();
        env.define_constant("x".to_string(), Node::int(1)).unwrap();
        assert_eq!(env.lookup("x"), Some(&Node::int(1)));

        env.bind("x", Node::int(2));
        assert_eq!(env.lookup("x"), Some(&Node::int(2)));

        let mut bindings = HashMap::new();
        bindings.insert("x".to_string(), Node::int(3));
        env.push_frame("f", bindings);
        assert_eq!(env.lookup("x"), Some(&Node::int(3)));
        assert_eq!(env.current_procedure(), Some("f"));

        env.pop_frame();
        assert_eq!(env.lookup("x"), Some(&Node::int(2)));
    }

    #[test]
    fn test_frames_do_not_see_enclosing_frames() {
        let mut env = Environment::new();
        env.push_frame("outer", HashMap::new());
        env.bind("local", Node::int(1));
        env.push_frame("inner", HashMap::new());
        assert!(env.lookup("local").is_none());
        env.pop_frame();
        assert!(env.lookup("local").is_some());
        env.pop_frame();
        assert!(env.lookup("local").is_none());
    }

    #[test]
    fn test_constant_reassignment() {
        let mut env = Environment::new();
        env.define_constant("pi".to_string(), Node::int(3)).unwrap();
        let err = env
            .define_constant("pi".to_string(), Node::int(4))
            .unwrap_err();
        assert_eq!(
            err,
            Error::ConstantReassignment {
                name: "pi".to_string()
            }
        );
    }

    #[test]
    fn test_procedure_scopes_innermost_first() {
        let mut env = Environment::new();
        let outer = Procedure {
            params: vec![],
            body: vec![Node::int(1)],
        };
        let inner = Procedure {
            params: vec![],
            body: vec![Node::int(2)],
        };
        env.define_procedure("f", outer.clone());
        env.push_procedure_scope();
        env.define_procedure("f", inner.clone());
        assert_eq!(*env.procedure("f").unwrap(), inner);
        env.pop_procedure_scope();
        assert_eq!(*env.procedure("f").unwrap(), outer);

        // the global table stays
        env.pop_procedure_scope();
        assert!(env.has_procedure("f"));
    }

    #[test]
    fn test_reset_dynamic_keeps_constants_and_global_procedures() {
        let mut env = Environment::new();
        env.define_constant("c".to_string(), Node::int(1)).unwrap();
        env.bind("v", Node::int(2));
        env.define_procedure(
            "p",
            Procedure {
                params: vec![],
                body: vec![],
            },
        );
        env.push_procedure_scope();
        env.push_frame("p", HashMap::new());

        env.reset_dynamic();
        assert!(env.exists("c"));
        assert!(!env.exists("v"));
        assert_eq!(env.frame_depth(), 0);
        assert!(env.has_procedure("p"));
    }
}
