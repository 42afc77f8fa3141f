use super::token::Token;
use crate::error::{Error, Result};

/// Characters that always form a token of their own
const DELIMITERS: &[char] = &['(', ')', '[', ']', '{', '}', ';'];

/// What the scanner is currently accumulating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Between tokens
    Idle,
    /// Inside an identifier (anything that does not start with a digit)
    Identifier,
    /// Inside a digit-only numeric literal
    Number,
    /// Inside a double-quoted string literal
    String,
    /// Inside a `#` comment, until end of line
    Comment,
}

/// Scanner for exprsh source text
pub struct Scanner {
    /// Source code as character vector
    source: Vec<char>,
    /// Accumulated tokens
    tokens: Vec<Token>,
    /// Text of the token being built
    pending: String,
    /// Line where the pending token started
    pending_line: usize,
    /// Current line number (1-indexed)
    line: usize,
    mode: Mode,
}

impl Scanner {
    /// Creates a new scanner from source code
    pub fn new(source: &str) -> Self {
        Scanner {
            source: source.chars().collect(),
            tokens: Vec::new(),
            pending: String::new(),
            pending_line: 1,
            line: 1,
            mode: Mode::Idle,
        }
    }

    /// Scans all tokens from source code and returns them in source order
    pub fn scan_tokens(&mut self) -> Result<Vec<Token>> {
        let source = std::mem::take(&mut self.source);
        for &c in &source {
            self.scan_char(c)?;
        }

        match self.mode {
            Mode::String => {
                return Err(Error::LexicalError {
                    line: self.pending_line,
                    message: "unterminated string literal".to_string(),
                })
            }
            _ => self.flush(),
        }

        Ok(std::mem::take(&mut self.tokens))
    }

    fn scan_char(&mut self, c: char) -> Result<()> {
        match self.mode {
            Mode::String => {
                self.pending.push(c);
                if c == '\n' {
                    self.line += 1;
                }
                if c == '"' {
                    self.flush();
                }
                return Ok(());
            }
            Mode::Comment => {
                if c == '\n' {
                    self.mode = Mode::Idle;
                    self.line += 1;
                }
                return Ok(());
            }
            _ => {}
        }

        match c {
            ' ' | '\t' | '\r' => self.flush(),
            '\n' => {
                self.flush();
                self.line += 1;
            }
            '"' => {
                if self.mode != Mode::Idle {
                    return Err(self.literal_error("quote inside literal"));
                }
                self.begin(Mode::String);
                self.pending.push(c);
            }
            '#' if self.mode == Mode::Idle => self.mode = Mode::Comment,
            c if DELIMITERS.contains(&c) => {
                // `'(` and `'[` open a list literal
                if (c == '(' || c == '[') && self.mode == Mode::Identifier && self.pending == "'"
                {
                    self.pending.push(c);
                    self.flush();
                    return Ok(());
                }
                self.flush();
                self.tokens.push(Token::new(c.to_string(), self.line));
            }
            c if c.is_ascii_digit() => {
                if self.mode == Mode::Idle {
                    self.begin(Mode::Number);
                }
                self.pending.push(c);
            }
            c => {
                match self.mode {
                    Mode::Number => {
                        return Err(self.literal_error(&format!(
                            "character '{}' in numeric literal",
                            c
                        )))
                    }
                    Mode::Idle => self.begin(Mode::Identifier),
                    _ => {}
                }
                self.pending.push(c);
            }
        }

        Ok(())
    }

    fn begin(&mut self, mode: Mode) {
        self.mode = mode;
        self.pending_line = self.line;
    }

    /// Emits the pending token, if any, and returns to idle
    fn flush(&mut self) {
        if !self.pending.is_empty() {
            let text = std::mem::take(&mut self.pending);
            self.tokens.push(Token::new(text, self.pending_line));
        }
        self.mode = Mode::Idle;
    }

    fn literal_error(&self, message: &str) -> Error {
        Error::LexicalError {
            line: self.pending_line,
            message: message.to_string(),
        }
    }
}

/// Scans `source` in one call
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Scanner::new(source).scan_tokens()
}
