//! exprsh Parser Module
//!
//! Turns a token sequence into [`Node`] trees: list-expressions, list
//! literals, function literals, blocks and the `let`/`match`/`cond` forms.

mod ast;
mod expr_parser;

pub use ast::{Node, NodeKind, Number, Value};
pub use expr_parser::{parse_source, Parsed, Parser, MAX_PARSE_DEPTH};
