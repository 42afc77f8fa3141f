use lazy_static::lazy_static;
use regex::Regex;

use super::ast::{Node, Number, Value};
use crate::error::{Error, Result};
use crate::lexer::Token;

/// Default bound on delimiter nesting
pub const MAX_PARSE_DEPTH: usize = 128;

/// Marker that turns a preceding list-expression into a function literal
const FUNCTION_ARROW: &str = "=>";

/// Branch separator of `match` and `cond`
const BRANCH_BAR: &str = "|";

lazy_static! {
    static ref NUMERIC_LITERAL: Regex = Regex::new(r"^-?[0-9]+$").expect("valid numeric literal regex");
}

/// One parsed expression plus where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    /// The expression
    pub node: Node,
    /// Index of the last token consumed
    pub end_index: usize,
    /// Source line of the first token
    pub line: usize,
}

/// Recursive-descent parser over a token sequence
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    /// Current delimiter nesting
    depth: usize,
    max_depth: usize,
}

impl Parser {
    /// Creates a new parser
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            current: 0,
            depth: 0,
            max_depth: MAX_PARSE_DEPTH,
        }
    }

    /// Overrides the nesting bound
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parses every top-level expression
    pub fn parse(&mut self) -> Result<Vec<Node>> {
        let mut program = Vec::new();

        loop {
            self.skip_separators();
            if self.is_at_end() {
                break;
            }
            program.push(self.parse_statement()?);
        }

        Ok(program)
    }

    /// Parses the single expression starting at `start`
    pub fn parse_at(&mut self, start: usize) -> Result<Parsed> {
        self.current = start;
        self.depth = 0;
        let line = match self.tokens.get(start) {
            Some(token) => token.line,
            None => return Err(Error::syntax(self.last_line(), "unexpected end of input")),
        };
        let node = self.parse_statement()?;
        Ok(Parsed {
            node,
            end_index: self.current.saturating_sub(1),
            line,
        })
    }

    /// Expression at statement position: keyword forms, bare calls, elements
    fn parse_statement(&mut self) -> Result<Node> {
        let token = self.peek_token()?;

        match token.text.as_str() {
            "let" => self.parse_let(),
            "match" => self.parse_match(),
            "cond" => self.parse_cond(),
            _ if is_identifier(&token) => {
                let lone = match self.peek_at(1) {
                    None => true,
                    Some(next) => matches!(next.text.as_str(), "}" | ")" | "]" | BRANCH_BAR),
                };
                if lone {
                    let token = self.advance();
                    Ok(Node::identifier(token.text).at_depth(self.depth))
                } else {
                    self.parse_bare_call()
                }
            }
            _ => self.parse_element(true),
        }
    }

    /// A single element: atom, list-expression, list literal, block or
    /// function literal. `keywords` enables `let`/`match`/`cond` forms.
    fn parse_element(&mut self, keywords: bool) -> Result<Node> {
        let token = self.peek_token()?;
        let text = token.text.as_str();

        match text {
            "let" if keywords => return self.parse_let(),
            "match" if keywords => return self.parse_match(),
            "cond" if keywords => return self.parse_cond(),
            "(" | "[" => return self.parse_list_expression(),
            "'(" | "'[" => return self.parse_list_literal(),
            "{" => {
                let open = self.advance();
                let body = self.parse_block_body(&open)?;
                let mut items = vec![Node::operator("do").at_depth(self.depth + 1)];
                items.extend(body);
                return Ok(Node::expression(items).at_depth(self.depth));
            }
            ")" | "]" | "}" | ";" => {
                return Err(self.syntax_error(format!("unexpected '{}'", text)));
            }
            _ => {}
        }

        let token = self.advance();
        self.parse_atom(token)
    }

    fn parse_atom(&self, token: Token) -> Result<Node> {
        let node = if NUMERIC_LITERAL.is_match(&token.text) {
            Node::number(parse_number(&token)?)
        } else if token.is_string() {
            Node::string(&token.text[1..token.text.len() - 1])
        } else if token.text == "true" || token.text == "false" {
            Node::boolean(token.text == "true")
        } else if token.text.len() > 1 && token.text.starts_with('@') {
            let mut node = Node::identifier(&token.text[1..]);
            node.is_literal = true;
            node
        } else {
            Node::identifier(token.text)
        };
        Ok(node.at_depth(self.depth))
    }

    /// `( head args... )`, or a function literal when followed by `=>`
    fn parse_list_expression(&mut self) -> Result<Node> {
        let open = self.advance();
        let children = self.parse_delimited(&open, false)?;

        if self.check(FUNCTION_ARROW) {
            self.advance();
            return self.parse_function_literal(&open, children);
        }

        self.finish_call(&open, children)
    }

    /// Branch pattern: the `=>` after a list-expression belongs to the branch
    fn parse_pattern(&mut self) -> Result<Node> {
        if self.check("(") || self.check("[") {
            let open = self.advance();
            let children = self.parse_delimited(&open, false)?;
            return self.finish_call(&open, children);
        }
        self.parse_element(false)
    }

    fn finish_call(&self, open: &Token, mut children: Vec<Node>) -> Result<Node> {
        if children.is_empty() {
            return Err(Error::syntax(open.line, "empty function call"));
        }

        match &children[0].value {
            Value::Identifier(name) if !children[0].is_literal => {
                let name = name.clone();
                children[0].value = Value::Operator(name);
            }
            Value::Function { .. } => {}
            // one-off environment overrides before the program name
            Value::List(_) if children[0].is_literal => {}
            _ => {
                return Err(Error::syntax(
                    open.line,
                    format!(
                        "expected a procedure name at the head of a list-expression, found {}",
                        children[0]
                    ),
                ))
            }
        }

        Ok(Node::expression(children).at_depth(self.depth))
    }

    /// `'( data... )`: passive list, nested lists are literal too
    fn parse_list_literal(&mut self) -> Result<Node> {
        let open = self.advance();
        let children = self.parse_delimited(&open, true)?;
        Ok(Node::list(children).at_depth(self.depth))
    }

    /// Children up to the closer matching `open`
    fn parse_delimited(&mut self, open: &Token, literal: bool) -> Result<Vec<Node>> {
        let close = open.closer().unwrap_or(")");
        self.enter(open)?;

        let mut children = Vec::new();
        loop {
            let token = match self.peek() {
                Some(token) => token,
                None => {
                    return Err(Error::syntax(
                        open.line,
                        format!("unclosed '{}': expected '{}'", open.text, close),
                    ))
                }
            };
            if token.text == close {
                self.advance();
                break;
            }
            if token.is_closer() {
                return Err(self.syntax_error(format!(
                    "mismatched '{}': '{}' opened at line {} expects '{}'",
                    token.text, open.text, open.line, close
                )));
            }

            let child = if literal {
                self.parse_literal_element()?
            } else {
                self.parse_element(!children.is_empty())?
            };
            children.push(child);
        }

        self.leave();
        Ok(children)
    }

    fn parse_literal_element(&mut self) -> Result<Node> {
        let token = self.peek_token()?;
        let mut node = match token.text.as_str() {
            "(" | "[" | "'(" | "'[" => {
                let open = self.advance();
                let children = self.parse_delimited(&open, true)?;
                Node::list(children).at_depth(self.depth)
            }
            "{" | ";" => return Err(self.syntax_error(format!("unexpected '{}' in list literal", token.text))),
            _ => {
                let token = self.advance();
                self.parse_atom(token)?
            }
        };
        node.is_literal = true;
        Ok(node)
    }

    /// Parameters were just parsed as `children`; the arrow is consumed
    fn parse_function_literal(&mut self, open: &Token, children: Vec<Node>) -> Result<Node> {
        let mut params = Vec::with_capacity(children.len());
        for child in children {
            match child.value {
                Value::Identifier(name) if !child.is_literal => params.push(name),
                _ => {
                    return Err(Error::syntax(
                        open.line,
                        format!("function parameters must be identifiers, found {}", child),
                    ))
                }
            }
        }

        let body = if self.check("{") {
            let open = self.advance();
            self.parse_block_body(&open)?
        } else {
            if self.is_at_end() {
                return Err(Error::syntax(open.line, "function literal is missing its body"));
            }
            self.enter(open)?;
            let body = self.parse_element(true)?;
            self.leave();
            vec![body]
        };

        Ok(Node::function(params, body).at_depth(self.depth))
    }

    /// Statements up to the `}` matching `open`
    fn parse_block_body(&mut self, open: &Token) -> Result<Vec<Node>> {
        self.enter(open)?;

        let mut body = Vec::new();
        loop {
            self.skip_separators();
            match self.peek() {
                None => return Err(Error::syntax(open.line, "unclosed '{': expected '}'")),
                Some(token) if token.text == "}" => {
                    self.advance();
                    break;
                }
                Some(_) => body.push(self.parse_statement()?),
            }
        }

        self.leave();
        Ok(body)
    }

    /// `name arg... ;`
    fn parse_bare_call(&mut self) -> Result<Node> {
        let head = self.advance();
        let mut items = vec![Node::operator(head.text.clone()).at_depth(self.depth + 1)];

        self.enter(&head)?;
        loop {
            match self.peek() {
                Some(token) if token.text == ";" => {
                    self.advance();
                    break;
                }
                Some(token) if !token.is_closer() => items.push(self.parse_element(false)?),
                _ => {
                    return Err(Error::syntax(
                        head.line,
                        format!("function call '{}' is missing its terminating ';'", head.text),
                    ))
                }
            }
        }
        self.leave();

        Ok(Node::expression(items).at_depth(self.depth))
    }

    /// `let [global] name = value`
    fn parse_let(&mut self) -> Result<Node> {
        let keyword = self.advance();
        let mut items = vec![Node::operator("let").at_depth(self.depth + 1)];

        if self.check("global") && self.peek_at(1).map_or(false, |t| t.text != "=") {
            self.advance();
            items.push(Node::identifier("global").at_depth(self.depth + 1));
        }

        let name = match self.peek() {
            Some(token) if is_identifier(token) => self.advance(),
            _ => {
                return Err(self.expected_error(
                    "identifier after 'let'",
                    Some("Binding syntax: let name = value;"),
                ))
            }
        };
        items.push(Node::identifier(name.text).at_depth(self.depth + 1));

        if !self.check("=") {
            return Err(self.expected_error("'=' in let binding", None));
        }
        self.advance();

        self.enter(&keyword)?;
        let start = self.current;
        let value = match (self.peek(), self.peek_at(1)) {
            (Some(token), Some(next)) if is_identifier(token) && next.text == ";" => {
                let token = self.advance();
                Node::identifier(token.text).at_depth(self.depth)
            }
            (None, _) => {
                return Err(Error::syntax(keyword.line, "let binding is missing its value"));
            }
            _ => self.parse_statement()?,
        };
        self.leave();
        items.push(value);

        let single_token = self.current - start == 1;
        if self.check(";") {
            self.advance();
        } else if single_token && !self.at_nested_closer() {
            return Err(Error::syntax(
                keyword.line,
                "let binding of a single token must end with ';'",
            ));
        }

        Ok(Node::expression(items).at_depth(self.depth))
    }

    /// `match scrutinee | pattern => body ... ;`
    fn parse_match(&mut self) -> Result<Node> {
        let keyword = self.advance();
        self.enter(&keyword)?;
        if self.is_at_end() {
            return Err(Error::syntax(keyword.line, "match is missing its scrutinee"));
        }
        let scrutinee = self.parse_element(false)?;
        self.leave();

        let mut items = vec![Node::operator("match").at_depth(self.depth + 1), scrutinee];
        items.extend(self.parse_branches(&keyword)?);
        Ok(Node::expression(items).at_depth(self.depth))
    }

    /// `cond | test => body ... ;`
    fn parse_cond(&mut self) -> Result<Node> {
        let keyword = self.advance();
        let mut items = vec![Node::operator("cond").at_depth(self.depth + 1)];
        items.extend(self.parse_branches(&keyword)?);
        Ok(Node::expression(items).at_depth(self.depth))
    }

    /// Branches as `[pattern body]` pairs, through the terminator
    fn parse_branches(&mut self, keyword: &Token) -> Result<Vec<Node>> {
        let mut branches = Vec::new();
        self.enter(keyword)?;

        loop {
            match self.peek() {
                Some(token) if token.text == ";" => {
                    self.advance();
                    break;
                }
                Some(token) if token.text == BRANCH_BAR => {
                    self.advance();
                    self.enter(keyword)?;
                    let pattern = self.parse_pattern()?;
                    if !self.check(FUNCTION_ARROW) {
                        return Err(self.expected_error(
                            "'=>' after branch pattern",
                            Some("Branch syntax: | pattern => body"),
                        ));
                    }
                    self.advance();
                    if self.is_at_end() {
                        return Err(Error::syntax(keyword.line, "branch is missing its body"));
                    }
                    let body = self.parse_element(true)?;
                    self.leave();
                    branches.push(
                        Node::expression(vec![pattern, body])
                            .named("branch")
                            .at_depth(self.depth),
                    );
                }
                // nested forms may be closed by the enclosing delimiter
                Some(token) if token.is_closer() && self.depth > 1 => break,
                Some(_) => {
                    return Err(self.expected_error(
                        &format!("'|' or ';' in {}", keyword.text),
                        None,
                    ))
                }
                None => {
                    return Err(Error::syntax(
                        keyword.line,
                        format!("unclosed {}: expected ';'", keyword.text),
                    ))
                }
            }
        }

        self.leave();
        if branches.is_empty() {
            return Err(Error::syntax(
                keyword.line,
                format!("{} requires at least one branch", keyword.text),
            ));
        }
        Ok(branches)
    }

    fn enter(&mut self, open: &Token) -> Result<()> {
        if self.depth >= self.max_depth {
            return Err(Error::syntax(
                open.line,
                format!("nesting too deep (limit: {})", self.max_depth),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn at_nested_closer(&self) -> bool {
        self.depth > 0 && self.peek().map_or(false, Token::is_closer)
    }

    fn skip_separators(&mut self) {
        while self.check(";") {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.current + offset)
    }

    fn peek_token(&self) -> Result<Token> {
        self.peek()
            .cloned()
            .ok_or_else(|| Error::syntax(self.last_line(), "unexpected end of input"))
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.current].clone();
        self.current += 1;
        token
    }

    fn check(&self, text: &str) -> bool {
        self.peek().map_or(false, |t| t.text == text)
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map_or(1, |t| t.line)
    }

    fn syntax_error(&self, message: impl Into<String>) -> Error {
        let line = self.peek().map_or_else(|| self.last_line(), |t| t.line);
        Error::syntax(line, message)
    }

    /// Helper to create a syntax error with expected/got pattern
    fn expected_error(&self, expected: &str, hint: Option<&str>) -> Error {
        let got = self
            .peek()
            .map_or_else(|| "end of input".to_string(), |t| format!("'{}'", t.text));
        let mut message = format!("expected {}, found {}", expected, got);

        if let Some(hint) = hint {
            message.push_str("\n\nHelp: ");
            message.push_str(hint);
        }

        self.syntax_error(message)
    }
}

/// Identifier-shaped token: not a literal, delimiter or escape
fn is_identifier(token: &Token) -> bool {
    let text = token.text.as_str();
    !(token.is_string()
        || NUMERIC_LITERAL.is_match(text)
        || matches!(
            text,
            "(" | ")" | "[" | "]" | "{" | "}" | ";" | "'(" | "'[" | "true" | "false"
        )
        || (text.len() > 1 && text.starts_with('@')))
}

fn parse_number(token: &Token) -> Result<Number> {
    let out_of_range = || Error::syntax(token.line, format!("numeric literal {} out of range", token.text));

    if token.text.starts_with('-') {
        token
            .text
            .parse::<i64>()
            .map(Number::Int)
            .map_err(|_| out_of_range())
    } else {
        token
            .text
            .parse::<u64>()
            .map(Number::from_u64)
            .map_err(|_| out_of_range())
    }
}

/// Scans and parses `source` in one call
pub fn parse_source(source: &str) -> Result<Vec<Node>> {
    let tokens = crate::lexer::tokenize(source)?;
    Parser::new(tokens).parse()
}
