//! Error types for the exprsh interpreter

use thiserror::Error;

/// Interpreter errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Lexical errors
    /// Illegal character inside a literal, or an unterminated string
    ///
    /// **Triggered by:** `12a`, `abc"def`, `"open`
    #[error("Lexical error at line {line}: {message}")]
    LexicalError {
        /// Line number where the offending literal started
        line: usize,
        /// Error description
        message: String,
    },

    // Syntax errors
    /// Malformed expression
    ///
    /// **Triggered by:** unclosed delimiters, `()` used as a call, a bare call
    /// missing its `;`, `match` without branches
    #[error("Syntax error at line {line}: {message}")]
    SyntaxError {
        /// Line number of the token that opened the construct
        line: usize,
        /// Error description
        message: String,
    },

    // Binding errors
    /// Call head that is neither a builtin, a user procedure nor an executable
    #[error("Unbound procedure: {name}")]
    UnboundProcedure {
        /// Procedure name
        name: String,
    },

    /// Attempt to redefine a global constant
    #[error("Cannot reassign constant: {name}")]
    ConstantReassignment {
        /// Constant name
        name: String,
    },

    // Type errors
    /// Wrong node kind supplied to a builtin or pattern handler
    ///
    /// **Example:** `(hd 5)`, destructuring an empty list with `[cons a b]`
    #[error("Type error: expected {expected}, got {got}")]
    TypeError {
        /// Expected kind
        expected: String,
        /// Actual kind
        got: String,
    },

    // Arity errors
    /// Wrong number of arguments to a builtin or user procedure
    #[error("Arity error: {name} expected {expected} arguments, got {got}")]
    ArityError {
        /// Procedure name
        name: String,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        got: usize,
    },

    /// Invalid arguments provided to a builtin
    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments {
        /// Builtin name
        tool: String,
        /// Reason for invalidity
        reason: String,
    },

    // Arithmetic
    /// Checked arithmetic overflowed both the signed and unsigned paths
    #[error("Arithmetic overflow in {op}")]
    ArithmeticOverflow {
        /// Operator name
        op: String,
    },

    /// Division or remainder by zero
    #[error("Division by zero")]
    DivisionByZero,

    // External process errors
    /// Spawning, piping or waiting on an external program failed
    #[error("Process error: {command}: {reason}")]
    ProcessError {
        /// Program name
        command: String,
        /// Failure reason
        reason: String,
    },

    // Resource errors
    /// User procedure recursion exceeded the configured depth
    #[error("Recursion depth exceeded (limit: {limit})")]
    RecursionLimit {
        /// Maximum allowed depth
        limit: usize,
    },

    /// Error raised while loading a source file
    #[error("{file}: {source}")]
    LoadError {
        /// File being loaded
        file: String,
        /// Inner error
        source: Box<Error>,
    },

    /// General runtime error
    #[error("Runtime error: {0}")]
    RuntimeError(String),

    // Control flow
    /// Explicit `exit`; not really an error, carried up to the embedding shell
    #[error("exit {0}")]
    Exit(i32),
}

impl Error {
    /// Create a runtime error with a message
    pub fn runtime(msg: impl Into<String>) -> Self {
        Error::RuntimeError(msg.into())
    }

    /// Create a syntax error at a line
    pub fn syntax(line: usize, msg: impl Into<String>) -> Self {
        Error::SyntaxError {
            line,
            message: msg.into(),
        }
    }

    /// Create a type error from an expected kind and the offending kind name
    pub fn type_error(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Error::TypeError {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Taxonomy bucket used when reporting the error to a user
    pub fn category(&self) -> &'static str {
        match self {
            Error::LexicalError { .. } => "lexical",
            Error::SyntaxError { .. } => "syntax",
            Error::UnboundProcedure { .. } | Error::ConstantReassignment { .. } => "binding",
            Error::TypeError { .. } | Error::InvalidArguments { .. } => "type",
            Error::ArityError { .. } => "arity",
            Error::ProcessError { .. } => "process",
            Error::ArithmeticOverflow { .. }
            | Error::DivisionByZero
            | Error::RecursionLimit { .. }
            | Error::RuntimeError(_) => "runtime",
            Error::LoadError { source, .. } => source.category(),
            Error::Exit(_) => "control",
        }
    }
}

/// Result type for exprsh operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_keeps_inner_category() {
        let err = Error::LoadError {
            file: "script.esh".to_string(),
            source: Box::new(Error::UnboundProcedure {
                name: "nope".to_string(),
            }),
        };
        assert_eq!(err.category(), "binding");
        assert_eq!(err.to_string(), "script.esh: Unbound procedure: nope");
    }

    #[test]
    fn test_arity_message() {
        let err = Error::ArityError {
            name: "add".to_string(),
            expected: 2,
            got: 3,
        };
        assert_eq!(err.category(), "arity");
        assert!(err.to_string().contains("expected 2 arguments, got 3"));
    }
}
