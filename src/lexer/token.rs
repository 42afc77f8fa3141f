use serde::{Deserialize, Serialize};

/// A single token from the source code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Original text of the token (string literals keep both quotes)
    pub text: String,
    /// Line number where the token starts (1-indexed)
    pub line: usize,
}

impl Token {
    /// Creates a new token
    pub fn new(text: impl Into<String>, line: usize) -> Self {
        Token {
            text: text.into(),
            line,
        }
    }

    /// True for a closing delimiter: `)`, `]` or `}`
    pub fn is_closer(&self) -> bool {
        matches!(self.text.as_str(), ")" | "]" | "}")
    }

    /// True for a string literal token
    pub fn is_string(&self) -> bool {
        self.text.len() >= 2 && self.text.starts_with('"') && self.text.ends_with('"')
    }

    /// Matching closer for an opening delimiter (`(`, `[`, `'(`, `'[`, `{`)
    pub fn closer(&self) -> Option<&'static str> {
        match self.text.as_str() {
            "(" | "'(" => Some(")"),
            "[" | "'[" => Some("]"),
            "{" => Some("}"),
            _ => None,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}
