//! The universal AST/value type.
//!
//! Parsing produces [`Node`]s and evaluation consumes and produces them. The
//! kind of a node is carried by its [`Value`] variant, so a node's payload
//! always agrees with its kind.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Integer payload. Literals that fit `i64` are signed, larger ones unsigned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Number {
    /// Signed 64-bit integer
    Int(i64),
    /// Unsigned 64-bit integer above `i64::MAX`
    UInt(u64),
}

impl Number {
    /// Normalizes an unsigned value: signed when it fits
    pub fn from_u64(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(v) => Number::Int(v),
            Err(_) => Number::UInt(n),
        }
    }

    /// Lossless widening used for comparisons and equality
    pub fn as_i128(self) -> i128 {
        match self {
            Number::Int(n) => n as i128,
            Number::UInt(n) => n as i128,
        }
    }

    /// Truncating conversion to the common signed representation
    pub fn truncate(self) -> i64 {
        match self {
            Number::Int(n) => n,
            Number::UInt(n) => n as i64,
        }
    }

    /// Signed value, if representable
    pub fn to_i64(self) -> Option<i64> {
        match self {
            Number::Int(n) => Some(n),
            Number::UInt(n) => i64::try_from(n).ok(),
        }
    }

    /// Unsigned value, if non-negative
    pub fn to_u64(self) -> Option<u64> {
        match self {
            Number::Int(n) => u64::try_from(n).ok(),
            Number::UInt(n) => Some(n),
        }
    }

    /// True for zero
    pub fn is_zero(self) -> bool {
        self.as_i128() == 0
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.as_i128() == other.as_i128()
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{}", n),
            Number::UInt(n) => write!(f, "{}", n),
        }
    }
}

/// Tag of a node, derived from its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    String,
    Number,
    Boolean,
    List,
    Function,
    Operator,
    Identifier,
    Command,
    CommandResult,
    Error,
    RawAst,
    Defunc,
}

impl NodeKind {
    /// Name reported by `typeof`
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::String => "string",
            NodeKind::Number => "number",
            NodeKind::Boolean => "boolean",
            NodeKind::List => "list",
            NodeKind::Function => "function",
            NodeKind::Operator => "operator",
            NodeKind::Identifier => "identifier",
            NodeKind::Command => "command",
            NodeKind::CommandResult => "command-result",
            NodeKind::Error => "error",
            NodeKind::RawAst => "raw-ast",
            NodeKind::Defunc => "defunc",
        }
    }
}

/// Payload of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// String literal or computed text
    String(String),
    /// Integer
    Number(Number),
    /// Boolean
    Boolean(bool),
    /// Ordered sequence; a call when not literal, passive data when literal
    List(Vec<Node>),
    /// Anonymous function literal
    Function {
        /// Parameter names
        params: Vec<String>,
        /// Body expressions, evaluated in order
        body: Vec<Node>,
    },
    /// Head of a call expression
    Operator(String),
    /// Name to be resolved against scope, or a bareword
    Identifier(String),
    /// Resolved external program invocation: program followed by arguments
    Command(Vec<String>),
    /// Exit status of an external program
    CommandResult(i64),
    /// Error converted to a value by `eval`
    Error(String),
    /// Unevaluated parsed expression
    RawAst(Box<Node>),
    /// Name of a user procedure created by `let`
    Defunc(String),
}

/// AST and runtime value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Optional label; procedure name for functions, empty otherwise
    pub name: String,
    /// Payload (determines the kind)
    pub value: Value,
    /// Nesting depth at parse time
    pub depth: usize,
    /// Originated from a quoted list literal (or `@` escape); never evaluated further
    pub is_literal: bool,
}

/// Nodes compare by payload only; labels, depth and literal flags are transient.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Node {
    /// Wraps a payload with default metadata
    pub fn new(value: Value) -> Self {
        Node {
            name: String::new(),
            value,
            depth: 0,
            is_literal: false,
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Node::new(Value::String(s.into()))
    }

    pub fn int(n: i64) -> Self {
        Node::new(Value::Number(Number::Int(n)))
    }

    pub fn number(n: Number) -> Self {
        Node::new(Value::Number(n))
    }

    pub fn boolean(b: bool) -> Self {
        Node::new(Value::Boolean(b))
    }

    /// Passive data list (literal)
    pub fn list(items: Vec<Node>) -> Self {
        let mut node = Node::new(Value::List(items));
        node.is_literal = true;
        node
    }

    /// Call expression: head followed by arguments
    pub fn expression(items: Vec<Node>) -> Self {
        Node::new(Value::List(items))
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Node::new(Value::Identifier(name.into()))
    }

    pub fn operator(name: impl Into<String>) -> Self {
        Node::new(Value::Operator(name.into()))
    }

    pub fn function(params: Vec<String>, body: Vec<Node>) -> Self {
        Node::new(Value::Function { params, body })
    }

    pub fn command(argv: Vec<String>) -> Self {
        Node::new(Value::Command(argv))
    }

    pub fn command_result(status: i64) -> Self {
        Node::new(Value::CommandResult(status))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Node::new(Value::Error(message.into()))
    }

    pub fn raw_ast(node: Node) -> Self {
        Node::new(Value::RawAst(Box::new(node)))
    }

    pub fn defunc(name: impl Into<String>) -> Self {
        Node::new(Value::Defunc(name.into()))
    }

    /// Sets the parse depth
    pub fn at_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Sets the label
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Kind tag of this node
    pub fn kind(&self) -> NodeKind {
        match &self.value {
            Value::String(_) => NodeKind::String,
            Value::Number(_) => NodeKind::Number,
            Value::Boolean(_) => NodeKind::Boolean,
            Value::List(_) => NodeKind::List,
            Value::Function { .. } => NodeKind::Function,
            Value::Operator(_) => NodeKind::Operator,
            Value::Identifier(_) => NodeKind::Identifier,
            Value::Command(_) => NodeKind::Command,
            Value::CommandResult(_) => NodeKind::CommandResult,
            Value::Error(_) => NodeKind::Error,
            Value::RawAst(_) => NodeKind::RawAst,
            Value::Defunc(_) => NodeKind::Defunc,
        }
    }

    /// Kind name as reported in errors and by `typeof`
    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    /// Boolean coercion
    pub fn is_truthy(&self) -> bool {
        match &self.value {
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Number(n) => !n.is_zero(),
            Value::Boolean(b) => *b,
            _ => true,
        }
    }

    /// Text of an identifier or operator
    pub fn symbol(&self) -> Option<&str> {
        match &self.value {
            Value::Identifier(s) | Value::Operator(s) => Some(s),
            _ => None,
        }
    }

    /// Operator name, if this node heads a call
    pub fn operator_name(&self) -> Option<&str> {
        match &self.value {
            Value::Operator(s) => Some(s),
            _ => None,
        }
    }

    /// The `_` wildcard identifier
    pub fn is_wildcard(&self) -> bool {
        matches!(&self.value, Value::Identifier(s) if s == "_")
    }

    pub fn as_list(&self) -> Result<&[Node]> {
        match &self.value {
            Value::List(items) => Ok(items),
            _ => Err(Error::type_error("list", self.type_name())),
        }
    }

    pub fn as_number(&self) -> Result<Number> {
        match &self.value {
            Value::Number(n) => Ok(*n),
            _ => Err(Error::type_error("number", self.type_name())),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match &self.value {
            Value::String(s) => Ok(s),
            _ => Err(Error::type_error("string", self.type_name())),
        }
    }

    /// Text for printing and for external program arguments: strings and
    /// names unquoted, everything else in source form
    pub fn to_plain_string(&self) -> String {
        match &self.value {
            Value::String(s) | Value::Identifier(s) | Value::Operator(s) => s.clone(),
            _ => self.to_string(),
        }
    }

    /// Converts quoted data back into an evaluable expression
    pub fn into_expression(self) -> Node {
        let Node {
            name, value, depth, ..
        } = self;
        let value = match value {
            Value::List(items) => {
                let mut items: Vec<Node> = items.into_iter().map(Node::into_expression).collect();
                if let Some(head) = items.first_mut() {
                    if let Value::Identifier(op) = &mut head.value {
                        let op = std::mem::take(op);
                        head.value = Value::Operator(op);
                    }
                }
                Value::List(items)
            }
            other => other,
        };
        Node {
            name,
            value,
            depth,
            is_literal: false,
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, nested: bool) -> fmt::Result {
        match &self.value {
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::List(items) => {
                let (open, close) = match (self.is_literal, nested) {
                    (true, false) => ("'[", "]"),
                    (true, true) => ("[", "]"),
                    (false, _) => ("(", ")"),
                };
                f.write_str(open)?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    item.write(f, self.is_literal)?;
                }
                f.write_str(close)
            }
            Value::Function { params, body } => {
                write!(f, "({}) => ", params.join(" "))?;
                if let [single] = body.as_slice() {
                    single.write(f, false)
                } else {
                    f.write_str("{ ")?;
                    for expr in body {
                        expr.write(f, false)?;
                        f.write_str("; ")?;
                    }
                    f.write_str("}")
                }
            }
            Value::Operator(s) | Value::Identifier(s) => f.write_str(s),
            Value::Command(argv) => write!(f, "<command {}>", argv.join(" ")),
            Value::CommandResult(status) => write!(f, "<exit {}>", status),
            Value::Error(msg) => write!(f, "<error: {}>", msg),
            Value::RawAst(node) => {
                f.write_str("<ast ")?;
                node.write(f, false)?;
                f.write_str(">")
            }
            Value::Defunc(name) => write!(f, "<procedure {}>", name),
        }
    }
}

/// Source form: literal data prints as text the parser reads back to an equal node
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, false)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::string(s)
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::string(s)
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::boolean(b)
    }
}

impl From<i64> for Node {
    fn from(n: i64) -> Self {
        Node::int(n)
    }
}

impl<T: Into<Node>> From<Vec<T>> for Node {
    fn from(v: Vec<T>) -> Self {
        Node::list(v.into_iter().map(Into::into).collect())
    }
}
