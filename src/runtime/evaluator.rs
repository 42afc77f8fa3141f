use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace};

use super::config::EvalConfig;
use super::environment::{Environment, Procedure};
use super::patterns;
use super::process::{CommandSpec, OutputMode, ProcessService, SystemProcess};
use crate::error::{Error, Result};
use crate::lexer::tokenize;
use crate::parser::{Node, Parser, Value};
use crate::tools::{ToolContext, ToolRegistry};

/// Operators whose arguments reach their handler unevaluated
pub const SPECIAL_FORMS: &[&str] = &[
    "->", "let", "if", "$", "cond", "match", "<<<", "defined", "and", "or",
];

/// Builtins that need the evaluator itself; their arguments are evaluated
pub const EVALUATOR_BUILTINS: &[&str] = &[
    "do", "eval", "parse", "load", "map", "filter", "apply", "typeof", "exit",
];

/// Tree-walking evaluator for exprsh
///
/// Holds the scope model, the procedure table, the builtin registry and the
/// process service. Independent evaluators share nothing.
pub struct Evaluator {
    /// Variable and procedure scopes
    pub env: Environment,
    /// Tool registry
    registry: Arc<ToolRegistry>,
    /// External program execution
    process: Box<dyn ProcessService>,
    config: EvalConfig,
}

impl Evaluator {
    /// Creates an evaluator with the standard library and the system
    /// process service, configured from the process environment
    pub fn new() -> Self {
        Self::with_config(EvalConfig::from_env())
    }

    pub fn with_config(config: EvalConfig) -> Self {
        Evaluator {
            env: Environment::new(),
            registry: Arc::new(ToolRegistry::new()),
            process: Box::new(SystemProcess::new()),
            config,
        }
    }

    /// Replaces the process service
    pub fn with_process(mut self, process: Box<dyn ProcessService>) -> Self {
        self.process = process;
        self
    }

    /// Replaces the builtin registry
    pub fn with_registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Scans, parses and evaluates `source`, returning the last value
    /// (`false` when there is none). Dynamic variables do not outlive the call.
    pub fn evaluate(&mut self, source: &str) -> Result<Node> {
        let result = self.eval_source(source);
        self.env.reset_dynamic();
        result
    }

    /// Runs an already parsed program as one top-level evaluation
    pub fn evaluate_program(&mut self, program: &[Node]) -> Result<Node> {
        let result = self.execute(program);
        self.env.reset_dynamic();
        result
    }

    /// Evaluates parsed expressions in order and returns the last value
    pub fn execute(&mut self, program: &[Node]) -> Result<Node> {
        let mut last = Node::boolean(false);
        for node in program {
            last = self.eval_node(node)?;
        }
        Ok(last)
    }

    /// Evaluates source text in the current scope
    fn eval_source(&mut self, source: &str) -> Result<Node> {
        let program = self.parse_program(source)?;
        self.execute(&program)
    }

    /// Parses source text under the configured nesting bound
    pub fn parse_program(&self, source: &str) -> Result<Vec<Node>> {
        let tokens = tokenize(source)?;
        Parser::new(tokens)
            .with_max_depth(self.config.max_parse_depth)
            .parse()
    }

    /// True when `name` is a builtin, special form, user procedure or bound variable
    pub fn defined(&self, name: &str) -> bool {
        SPECIAL_FORMS.contains(&name)
            || EVALUATOR_BUILTINS.contains(&name)
            || self.registry.has(name)
            || self.env.has_procedure(name)
            || self.env.exists(name)
    }

    /// Kind name of a value
    pub fn type_of(&self, node: &Node) -> &'static str {
        node.type_name()
    }

    /// Evaluates a single node
    pub fn eval_node(&mut self, node: &Node) -> Result<Node> {
        match &node.value {
            Value::Identifier(name) if !node.is_literal => {
                Ok(self.env.lookup(name).cloned().unwrap_or_else(|| node.clone()))
            }
            Value::List(items) if !node.is_literal => self.eval_call(items),
            _ => Ok(node.clone()),
        }
    }

    fn eval_call(&mut self, items: &[Node]) -> Result<Node> {
        let (head, args) = items
            .split_first()
            .ok_or_else(|| Error::runtime("empty function call"))?;

        match &head.value {
            Value::Operator(name) => {
                if SPECIAL_FORMS.contains(&name.as_str()) {
                    trace!(form = %name, "special form");
                    return self.eval_special_form(name, args);
                }
                let args = self.eval_args(args)?;
                self.call_named(name, args)
            }
            Value::Function { params, body } => {
                let args = self.eval_args(args)?;
                self.invoke("lambda", params, body, args)
            }
            Value::List(_) if head.is_literal => self.eval_prefixed_command(items),
            _ => {
                let head = self.eval_node(head)?;
                let args = self.eval_args(args)?;
                self.call_value(&head, args)
            }
        }
    }

    fn eval_args(&mut self, args: &[Node]) -> Result<Vec<Node>> {
        args.iter().map(|arg| self.eval_node(arg)).collect()
    }

    fn eval_special_form(&mut self, name: &str, args: &[Node]) -> Result<Node> {
        match name {
            "let" => self.eval_let(args),
            "if" => self.eval_if(args),
            "and" => self.eval_and(args),
            "or" => self.eval_or(args),
            "defined" => self.eval_defined(args),
            "cond" => patterns::eval_cond(self, args),
            "match" => patterns::eval_match(self, args),
            "->" => self.eval_pipeline(args),
            "$" => self.eval_substitution(args),
            "<<<" => self.eval_here_string(args),
            _ => Err(Error::UnboundProcedure {
                name: name.to_string(),
            }),
        }
    }

    /// Calls `name` with evaluated arguments
    pub fn call_named(&mut self, name: &str, args: Vec<Node>) -> Result<Node> {
        if EVALUATOR_BUILTINS.contains(&name) {
            return self.eval_builtin(name, args);
        }

        if let Some(procedure) = self.env.procedure(name) {
            return self.invoke(name, &procedure.params, &procedure.body, args);
        }

        if let Some(tool) = self.registry.lookup(name) {
            if let Some(expected) = tool.arity() {
                if args.len() != expected {
                    return Err(Error::ArityError {
                        name: name.to_string(),
                        expected,
                        got: args.len(),
                    });
                }
            }
            let mut ctx = ToolContext {
                search_path: &self.config.search_path,
                env: &mut self.env,
            };
            return tool.execute(&args, &mut ctx);
        }

        if let Some(bound) = self.env.lookup(name).cloned() {
            match &bound.value {
                Value::Function { .. } => return self.call_value(&bound, args),
                // aliases only reach callables, so two names cannot refer to each other
                Value::Defunc(target) | Value::Identifier(target) if self.is_callable(target) => {
                    return self.call_named(target, args)
                }
                _ if args.is_empty() && self.resolve_program(name).is_none() => return Ok(bound),
                _ => {}
            }
        }

        match self.resolve_program(name) {
            Some(program) => {
                let spec = command_spec(program, Vec::new(), &args);
                self.run_inherited(&spec)
            }
            None => Err(Error::UnboundProcedure {
                name: name.to_string(),
            }),
        }
    }

    fn is_callable(&self, name: &str) -> bool {
        EVALUATOR_BUILTINS.contains(&name) || self.env.has_procedure(name) || self.registry.has(name)
    }

    /// Calls a procedure value: a function literal, or anything naming a callable
    pub fn call_value(&mut self, callee: &Node, args: Vec<Node>) -> Result<Node> {
        match &callee.value {
            Value::Function { params, body } => self.invoke("lambda", params, body, args),
            Value::Defunc(name) | Value::Identifier(name) | Value::Operator(name) | Value::String(name) => {
                self.call_named(name, args)
            }
            _ => Err(Error::type_error("a procedure", callee.type_name())),
        }
    }

    /// Runs a user procedure body in a fresh call frame and procedure scope.
    /// Both are popped whether the body succeeds or fails.
    fn invoke(&mut self, name: &str, params: &[String], body: &[Node], args: Vec<Node>) -> Result<Node> {
        if params.len() != args.len() {
            return Err(Error::ArityError {
                name: name.to_string(),
                expected: params.len(),
                got: args.len(),
            });
        }
        if self.env.frame_depth() >= self.config.max_depth {
            return Err(Error::RecursionLimit {
                limit: self.config.max_depth,
            });
        }

        let bindings: HashMap<String, Node> = params.iter().cloned().zip(args).collect();
        debug!(procedure = name, depth = self.env.frame_depth() + 1, "entering procedure");

        self.env.push_frame(name, bindings);
        self.env.push_procedure_scope();
        let result = self.execute(body);
        self.env.pop_procedure_scope();
        self.env.pop_frame();

        debug!(procedure = name, ok = result.is_ok(), "leaving procedure");
        result
    }

    // =========================================================================
    // SPECIAL FORMS
    // =========================================================================

    /// `let name = value`, `let global name = value`
    fn eval_let(&mut self, args: &[Node]) -> Result<Node> {
        match args {
            [flag, name, value] if flag.symbol() == Some("global") => {
                let name = binding_name(name)?;
                if let Some(procedure) = self.env.current_procedure() {
                    return Err(Error::runtime(format!(
                        "let global {} is only allowed at top level, not inside {}",
                        name, procedure
                    )));
                }
                if self.env.is_constant(&name) {
                    return Err(Error::ConstantReassignment { name });
                }
                let value = self.eval_node(value)?;
                self.env.define_constant(name, value.clone())?;
                Ok(value)
            }
            [name, value] => {
                let name = binding_name(name)?;
                let value = self.eval_node(value)?;
                if let Value::Function { params, body } = value.value {
                    self.env.define_procedure(name.clone(), Procedure { params, body });
                    return Ok(Node::defunc(name));
                }
                self.env.bind(name, value.clone());
                Ok(value)
            }
            _ => Err(Error::ArityError {
                name: "let".to_string(),
                expected: 2,
                got: args.len(),
            }),
        }
    }

    /// `(if test then [else])`: `false` when the test fails and there is no else
    fn eval_if(&mut self, args: &[Node]) -> Result<Node> {
        match args {
            [test, then] => {
                if self.eval_node(test)?.is_truthy() {
                    self.eval_node(then)
                } else {
                    Ok(Node::boolean(false))
                }
            }
            [test, then, otherwise] => {
                if self.eval_node(test)?.is_truthy() {
                    self.eval_node(then)
                } else {
                    self.eval_node(otherwise)
                }
            }
            _ => Err(Error::ArityError {
                name: "if".to_string(),
                expected: 3,
                got: args.len(),
            }),
        }
    }

    fn eval_and(&mut self, args: &[Node]) -> Result<Node> {
        for arg in args {
            if !self.eval_node(arg)?.is_truthy() {
                return Ok(Node::boolean(false));
            }
        }
        Ok(Node::boolean(true))
    }

    fn eval_or(&mut self, args: &[Node]) -> Result<Node> {
        for arg in args {
            if self.eval_node(arg)?.is_truthy() {
                return Ok(Node::boolean(true));
            }
        }
        Ok(Node::boolean(false))
    }

    /// `(defined name)`: the name itself is not evaluated
    fn eval_defined(&mut self, args: &[Node]) -> Result<Node> {
        let [name] = args else {
            return Err(Error::ArityError {
                name: "defined".to_string(),
                expected: 1,
                got: args.len(),
            });
        };
        let name = match &name.value {
            Value::Identifier(s) | Value::Operator(s) | Value::String(s) => s.clone(),
            _ => return Err(Error::type_error("a name", name.type_name())),
        };
        Ok(Node::boolean(self.defined(&name)))
    }

    /// `(-> (cmd args) (cmd args) ...)`: stdout inherited by the last stage
    fn eval_pipeline(&mut self, args: &[Node]) -> Result<Node> {
        let stages = self.pipeline_stages(args)?;
        debug!(stages = stages.len(), "pipeline");
        let output = self.process.pipeline(&stages, None, OutputMode::Inherit)?;
        Ok(Node::command_result(output.status))
    }

    /// `($ (cmd args))`, `($ (-> ...))` or `($ cmd args)`: captured stdout
    /// with the trailing newline removed
    fn eval_substitution(&mut self, args: &[Node]) -> Result<Node> {
        let stages = match args {
            [] => {
                return Err(Error::ArityError {
                    name: "$".to_string(),
                    expected: 1,
                    got: 0,
                })
            }
            [command] if is_call(command) => self.command_stages(command)?,
            flat => vec![self.stage_from_items(flat)?],
        };

        let output = self.process.pipeline(&stages, None, OutputMode::Capture)?;
        let mut text = output.stdout.unwrap_or_default();
        if text.ends_with('\n') {
            text.pop();
            if text.ends_with('\r') {
                text.pop();
            }
        }
        Ok(Node::string(text))
    }

    /// `(<<< text (cmd args))`: feeds `text` to the command's stdin
    fn eval_here_string(&mut self, args: &[Node]) -> Result<Node> {
        let [text, command] = args else {
            return Err(Error::ArityError {
                name: "<<<".to_string(),
                expected: 2,
                got: args.len(),
            });
        };
        let text = self.eval_node(text)?.to_plain_string();
        let stages = self.command_stages(command)?;
        let output = self
            .process
            .pipeline(&stages, Some(&text), OutputMode::Inherit)?;
        Ok(Node::command_result(output.status))
    }

    // =========================================================================
    // EXTERNAL COMMANDS
    // =========================================================================

    fn resolve_program(&self, name: &str) -> Option<String> {
        self.process
            .resolve(name, &self.config.search_path)
            .map(|path| path.to_string_lossy().into_owned())
    }

    fn run_inherited(&mut self, spec: &CommandSpec) -> Result<Node> {
        debug!(program = %spec.program, args = spec.args.len(), "external command");
        let output = self.process.run(spec, None, OutputMode::Inherit)?;
        Ok(Node::command_result(output.status))
    }

    /// `('[KEY value] cmd args)`: leading literal lists are environment overrides
    fn eval_prefixed_command(&mut self, items: &[Node]) -> Result<Node> {
        let spec = self.stage_from_items(items)?;
        self.run_inherited(&spec)
    }

    /// A single command, or the stages of a nested `->`
    fn command_stages(&mut self, command: &Node) -> Result<Vec<CommandSpec>> {
        let items = call_items(command)?;
        if items[0].operator_name() == Some("->") {
            return self.pipeline_stages(&items[1..]);
        }
        Ok(vec![self.stage_from_items(items)?])
    }

    fn pipeline_stages(&mut self, args: &[Node]) -> Result<Vec<CommandSpec>> {
        if args.is_empty() {
            return Err(Error::runtime("empty pipeline"));
        }
        args.iter()
            .map(|stage| {
                let items = call_items(stage)?;
                self.stage_from_items(items)
            })
            .collect()
    }

    /// Builds a command from unevaluated items: environment prefixes, then
    /// the program name, then arguments (evaluated and flattened)
    fn stage_from_items(&mut self, items: &[Node]) -> Result<CommandSpec> {
        let split = items
            .iter()
            .position(|item| !(item.is_literal && matches!(item.value, Value::List(_))))
            .ok_or_else(|| Error::runtime("environment overrides without a command"))?;
        let env = env_overrides(&items[..split])?;

        let head = &items[split];
        let name = match &head.value {
            Value::Operator(name) => name.clone(),
            _ => self.eval_node(head)?.to_plain_string(),
        };
        let program = self
            .resolve_program(&name)
            .ok_or(Error::UnboundProcedure { name })?;

        let args = self.eval_args(&items[split + 1..])?;
        Ok(command_spec(program, env, &args))
    }

    // =========================================================================
    // EVALUATOR BUILTINS
    // =========================================================================

    fn eval_builtin(&mut self, name: &str, args: Vec<Node>) -> Result<Node> {
        match name {
            "do" => Ok(args.into_iter().last().unwrap_or_else(|| Node::boolean(false))),
            "exit" => {
                let code = match args.as_slice() {
                    [] => 0,
                    [code] => {
                        let status = code.as_number()?.as_i128();
                        match u8::try_from(status) {
                            Ok(status) => i32::from(status),
                            Err(_) => {
                                return Err(Error::InvalidArguments {
                                    tool: name.to_string(),
                                    reason: format!("exit status {} is outside 0..=255", status),
                                })
                            }
                        }
                    }
                    _ => return Err(arity(name, 1, args.len())),
                };
                Err(Error::Exit(code))
            }
            "typeof" => {
                let [value] = args.as_slice() else {
                    return Err(arity(name, 1, args.len()));
                };
                Ok(Node::string(self.type_of(value)))
            }
            "eval" => {
                let [value] = args.as_slice() else {
                    return Err(arity(name, 1, args.len()));
                };
                match self.eval_value(value) {
                    Err(Error::Exit(code)) => Err(Error::Exit(code)),
                    Err(e) => Ok(Node::error(e.to_string())),
                    ok => ok,
                }
            }
            "parse" => {
                let [source] = args.as_slice() else {
                    return Err(arity(name, 1, args.len()));
                };
                let mut program = self.parse_program(source.as_str()?)?;
                let node = if program.len() == 1 {
                    program.remove(0)
                } else {
                    let mut items = vec![Node::operator("do")];
                    items.extend(program);
                    Node::expression(items)
                };
                Ok(Node::raw_ast(node))
            }
            "load" => {
                let [path] = args.as_slice() else {
                    return Err(arity(name, 1, args.len()));
                };
                self.load_file(Path::new(&path.to_plain_string()))
            }
            "map" | "filter" => {
                let [callee, list] = args.as_slice() else {
                    return Err(arity(name, 2, args.len()));
                };
                let mut out = Vec::new();
                for item in list.as_list()? {
                    let result = self.call_value(callee, vec![item.clone()])?;
                    if name == "map" {
                        out.push(result);
                    } else if result.is_truthy() {
                        out.push(item.clone());
                    }
                }
                Ok(Node::list(out))
            }
            "apply" => {
                let [callee, list] = args.as_slice() else {
                    return Err(arity(name, 2, args.len()));
                };
                self.call_value(callee, list.as_list()?.to_vec())
            }
            _ => Err(Error::UnboundProcedure {
                name: name.to_string(),
            }),
        }
    }

    /// `eval` of a source string, parsed expression or quoted list
    fn eval_value(&mut self, value: &Node) -> Result<Node> {
        match &value.value {
            Value::String(source) => self.eval_source(source),
            Value::RawAst(node) => self.eval_node(node),
            Value::List(_) if value.is_literal => {
                let expression = value.clone().into_expression();
                self.eval_node(&expression)
            }
            _ => self.eval_node(value),
        }
    }

    /// Evaluates a source file in the current scope; errors name the file
    pub fn load_file(&mut self, path: &Path) -> Result<Node> {
        let file = path.display().to_string();
        debug!(file = %file, "loading");

        let wrap = |source: Error| match source {
            Error::Exit(code) => Error::Exit(code),
            source => Error::LoadError {
                file: file.clone(),
                source: Box::new(source),
            },
        };

        let source = std::fs::read_to_string(path).map_err(|e| wrap(Error::runtime(e.to_string())))?;
        self.eval_source(&source).map_err(wrap)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn arity(name: &str, expected: usize, got: usize) -> Error {
    Error::ArityError {
        name: name.to_string(),
        expected,
        got,
    }
}

fn binding_name(node: &Node) -> Result<String> {
    match &node.value {
        Value::Identifier(name) | Value::Operator(name) => Ok(name.clone()),
        _ => Err(Error::type_error("a binding name", node.type_name())),
    }
}

fn is_call(node: &Node) -> bool {
    !node.is_literal && matches!(&node.value, Value::List(items) if !items.is_empty())
}

fn call_items(node: &Node) -> Result<&[Node]> {
    match &node.value {
        Value::List(items) if !node.is_literal && !items.is_empty() => Ok(items),
        _ => Err(Error::type_error("a command", node.type_name())),
    }
}

/// `'[KEY value KEY2 value2]` lists as key/value pairs
fn env_overrides(prefixes: &[Node]) -> Result<Vec<(String, String)>> {
    let mut env = Vec::new();
    for prefix in prefixes {
        let items = prefix.as_list()?;
        if items.len() % 2 != 0 {
            return Err(Error::InvalidArguments {
                tool: "environment override".to_string(),
                reason: format!("{} needs key/value pairs", prefix),
            });
        }
        for pair in items.chunks(2) {
            env.push((pair[0].to_plain_string(), pair[1].to_plain_string()));
        }
    }
    Ok(env)
}

/// Flattens evaluated arguments into argv strings; lists splice their elements
fn command_spec(program: String, env: Vec<(String, String)>, args: &[Node]) -> CommandSpec {
    fn push_arg(out: &mut Vec<String>, node: &Node) {
        match &node.value {
            Value::List(items) => items.iter().for_each(|item| push_arg(out, item)),
            _ => out.push(node.to_plain_string()),
        }
    }

    let mut spec = CommandSpec::new(program);
    spec.env = env;
    for arg in args {
        push_arg(&mut spec.args, arg);
    }
    spec
}
