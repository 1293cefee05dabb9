//! Strategy expression parser.
//!
//! Recursive descent parser for the constructor-call subset of expression
//! syntax: literals, dotted enum references, and calls with positional and
//! keyword arguments. Anything else (statements, operators, comprehensions,
//! string prefixes) is a parse error with a character offset.

use crate::domain::error::ParseError;
use crate::domain::expr::{Literal, Node};

/// Deepest call nesting accepted before the parser gives up.
pub const MAX_DEPTH: usize = 64;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.remaining().chars().nth(1)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.pos,
        }
    }

    fn found(&self) -> String {
        match self.peek() {
            Some(ch) => format!("'{}'", ch),
            None => "end of input".to_string(),
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            _ => Err(self.error(format!("expected '{}', found {}", expected, self.found()))),
        }
    }

    fn parse_identifier(&mut self) -> Result<String, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        match self.peek() {
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                self.advance();
            }
            _ => {
                return Err(self.error(format!("expected identifier, found {}", self.found())));
            }
        }
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_number(&mut self) -> Result<Node, ParseError> {
        let start = self.pos;
        let mut text = String::new();
        let mut is_float = false;
        let mut digits = 0;

        if let Some(sign @ ('-' | '+')) = self.peek() {
            self.advance();
            if sign == '-' {
                text.push('-');
            }
            self.skip_whitespace();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                text.push(ch);
                self.advance();
            } else if ch == '_' && digits > 0 {
                self.advance();
            } else if ch == '.' && !is_float {
                is_float = true;
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: "expected number".to_string(),
                position: start,
            });
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            text.push('e');
            self.advance();
            if let Some(sign @ ('-' | '+')) = self.peek() {
                text.push(sign);
                self.advance();
            }
            let mut exp_digits = 0;
            while let Some(ch) = self.peek() {
                if ch.is_ascii_digit() {
                    exp_digits += 1;
                    text.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
            if exp_digits == 0 {
                return Err(self.error("expected exponent digits"));
            }
        }

        if self
            .peek()
            .is_some_and(|ch| ch.is_alphanumeric() || ch == '_')
        {
            return Err(self.error(format!("invalid number literal near {}", self.found())));
        }

        if is_float {
            text.parse::<f64>()
                .map(Node::float)
                .map_err(|_| ParseError {
                    message: format!("invalid number: {}", text),
                    position: start,
                })
        } else {
            text.parse::<i64>().map(Node::int).map_err(|_| ParseError {
                message: format!("integer out of range: {}", text),
                position: start,
            })
        }
    }

    fn parse_string(&mut self) -> Result<Node, ParseError> {
        let start = self.pos;
        let quote = match self.advance() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected string")),
        };
        let mut value = String::new();
        loop {
            match self.advance() {
                None => {
                    return Err(ParseError {
                        message: "unterminated string".to_string(),
                        position: start,
                    });
                }
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(ch @ ('\\' | '\'' | '"')) => value.push(ch),
                    Some(ch) => {
                        return Err(self.error(format!("unsupported escape '\\{}'", ch)));
                    }
                    None => {
                        return Err(ParseError {
                            message: "unterminated string".to_string(),
                            position: start,
                        });
                    }
                },
                Some(ch) if ch == quote => break,
                Some('\n') => {
                    return Err(ParseError {
                        message: "newline in string literal".to_string(),
                        position: start,
                    });
                }
                Some(ch) => value.push(ch),
            }
        }
        Ok(Node::string(value))
    }

    fn parse_expr(&mut self) -> Result<Node, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch.is_ascii_digit() => self.parse_number(),
            Some('.') if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => {
                self.parse_number()
            }
            Some('-' | '+') => self.parse_number(),
            Some('\'' | '"') => self.parse_string(),
            Some(ch) if ch.is_alphabetic() || ch == '_' => self.parse_name_or_call(),
            _ => Err(self.error(format!("expected expression, found {}", self.found()))),
        }
    }

    fn parse_name_or_call(&mut self) -> Result<Node, ParseError> {
        let mut segments = vec![self.parse_identifier()?];
        loop {
            self.skip_whitespace();
            if self.peek() == Some('.') {
                self.advance();
                segments.push(self.parse_identifier()?);
            } else {
                break;
            }
        }

        self.skip_whitespace();
        if self.peek() == Some('(') {
            return self.parse_call(segments.join("."));
        }

        if segments.len() == 1 {
            let name = segments.remove(0);
            return Ok(match name.as_str() {
                "True" => Node::Literal(Literal::Bool(true)),
                "False" => Node::Literal(Literal::Bool(false)),
                "None" => Node::Literal(Literal::None),
                _ => Node::Name(name),
            });
        }

        let member = segments.pop().unwrap_or_default();
        Ok(Node::EnumRef {
            kind: segments.join("."),
            member,
        })
    }

    fn parse_call(&mut self, name: String) -> Result<Node, ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error(format!("nesting deeper than {} calls", MAX_DEPTH)));
        }
        self.expect_char('(')?;

        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Node)> = Vec::new();

        loop {
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.advance();
                break;
            }

            let arg_start = self.pos;
            if let Some(key) = self.try_keyword()? {
                if kwargs.iter().any(|(k, _)| *k == key) {
                    return Err(ParseError {
                        message: format!("keyword argument repeated: {}", key),
                        position: arg_start,
                    });
                }
                let value = self.parse_expr()?;
                kwargs.push((key, value));
            } else {
                if !kwargs.is_empty() {
                    return Err(ParseError {
                        message: "positional argument follows keyword argument".to_string(),
                        position: arg_start,
                    });
                }
                args.push(self.parse_expr()?);
            }

            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.advance();
                }
                Some(')') => {
                    self.advance();
                    break;
                }
                _ => {
                    return Err(self.error(format!(
                        "expected ',' or ')', found {}",
                        self.found()
                    )));
                }
            }
        }

        self.depth -= 1;
        Ok(Node::Call { name, args, kwargs })
    }

    /// Consume `name =` if present, leaving the position untouched otherwise.
    fn try_keyword(&mut self) -> Result<Option<String>, ParseError> {
        let saved = self.pos;
        if !self
            .peek()
            .is_some_and(|ch| ch.is_alphabetic() || ch == '_')
        {
            return Ok(None);
        }
        let name = self.parse_identifier()?;
        self.skip_whitespace();
        if self.peek() == Some('=') && self.peek_second() != Some('=') {
            self.advance();
            Ok(Some(name))
        } else {
            self.pos = saved;
            Ok(None)
        }
    }

    fn parse(&mut self) -> Result<Node, ParseError> {
        let node = self.parse_expr()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error(format!(
                "unexpected input after expression: '{}'",
                self.remaining()
            )));
        }
        Ok(node)
    }
}

pub fn parse(input: &str) -> Result<Node, ParseError> {
    let mut parser = Parser::new(input);
    parser.parse()
}
