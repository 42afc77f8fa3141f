//! Lexical analysis for exprsh
//!
//! Converts source text into an ordered stream of tokens, each tagged with the
//! line it starts on.

mod scanner;
mod token;

pub use scanner::{tokenize, Scanner};
pub use token::Token;
