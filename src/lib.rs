//! # exprsh - a command shell with an embedded expression language
//!
//! exprsh reads a small, dynamically typed expression language and runs
//! anything it cannot resolve as an external program:
//!
//! - list-expressions `(+ 1 2)` and bare calls `print "hi";`
//! - quoted list literals `'[1 2 3]`
//! - function literals `(x y) => (+ x y)` and blocks `{ ...; ... }`
//! - `let` bindings, `match` with structural and catalog patterns, `cond`
//! - pipelines `(-> (ls) (wc -l))`, command substitution `($ (date))`
//!
//! ## Quick Start
//!
//! ```rust
//! use exprsh::{Evaluator, Node};
//!
//! # fn main() -> exprsh::Result<()> {
//! let mut evaluator = Evaluator::new();
//! let result = evaluator.evaluate(
//!     "let fib = (n) => match n | [< 2] => n | _ => (+ (fib (- n 1)) (fib (- n 2))) ;
//!      (fib 10)",
//! )?;
//! assert_eq!(result, Node::int(55));
//! # Ok(())
//! # }
//! ```
//!
//! The pipeline stages can also be driven one at a time:
//!
//! ```rust
//! use exprsh::{Evaluator, Node, Parser, Scanner};
//!
//! # fn main() -> exprsh::Result<()> {
//! let tokens = Scanner::new("match '[1 2 3] | '[a _ b] => (+ a b) ;").scan_tokens()?;
//! let program = Parser::new(tokens).parse()?;
//! let mut evaluator = Evaluator::new();
//! assert_eq!(evaluator.execute(&program)?, Node::int(4));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! 1. **Lexer** (`lexer`) - source text to [`Token`]s
//! 2. **Parser** (`parser`) - tokens to [`Node`] trees
//! 3. **Evaluator** (`runtime`) - special forms, scopes, procedures, patterns
//! 4. **Tools** (`tools`) - the builtin procedure registry
//!
//! External programs are started through [`ProcessService`], which tests
//! replace with a fake.
//!
//! ## Error Handling
//!
//! Every stage returns [`Result`]; [`Error::category`] names the family
//! (`lexical`, `syntax`, `binding`, `type`, `arity`, `process`, `runtime`).
//!
//! ```rust
//! use exprsh::{Error, Evaluator};
//!
//! let mut evaluator = Evaluator::new();
//! let err = evaluator.evaluate("(hd '[])").unwrap_err();
//! assert!(matches!(err, Error::TypeError { .. }));
//! assert_eq!(err.category(), "type");
//! ```

/// Version of the exprsh interpreter
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod tools;

// Re-export main types
pub use error::{Error, Result};
pub use lexer::{tokenize, Scanner, Token};
pub use parser::{parse_source, Node, NodeKind, Number, Parser, Value};
pub use runtime::{
    CommandSpec, EvalConfig, Environment, Evaluator, OutputMode, ProcessOutput, ProcessService,
    SystemProcess,
};
pub use tools::{Tool, ToolContext, ToolRegistry};
