//! Tokenizer for the indentation-structured snippet syntax.

use crate::error::ParseError;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum TokenKind {
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),
    Op(&'static str),
    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

/// Longest operators first so that `**=` wins over `**` and `*`.
const OPERATORS: &[&str] = &[
    "**=", "//=", "<<=", ">>=", "**", "//", "==", "!=", "<=", ">=", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "<<", ">>", "->", "+", "-", "*", "/", "%", "<", ">", "=", "(", ")", "[",
    "]", "{", "}", ",", ":", ";", ".", "&", "|", "^", "~",
];

const TAB_WIDTH: usize = 8;

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    indents: Vec<usize>,
    depth: usize,
    brackets: Vec<(char, usize, usize)>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            indents: vec![0],
            depth: 0,
            brackets: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        let mut at_line_start = true;
        while self.pos < self.chars.len() {
            if at_line_start && self.depth == 0 {
                at_line_start = false;
                if self.indentation()? {
                    continue;
                }
            }

            let c = self.chars[self.pos];
            match c {
                '\n' => {
                    self.advance();
                    if self.depth == 0 {
                        self.end_logical_line();
                        at_line_start = true;
                    }
                }
                ' ' | '\t' | '\r' | '\x0c' => self.advance(),
                '#' => self.skip_comment(),
                '\\' if self.peek(1) == Some('\n') => {
                    self.advance();
                    self.advance();
                }
                '\'' | '"' => self.string(c)?,
                c if c.is_ascii_digit() => self.number()?,
                '.' if self.peek(1).is_some_and(|n| n.is_ascii_digit()) => self.number()?,
                c if c.is_alphabetic() || c == '_' => self.name(),
                _ => self.operator()?,
            }
        }

        if let Some((open, line, column)) = self.brackets.last() {
            return Err(ParseError::new(*line, *column, format!("`{open}` was never closed")));
        }

        self.end_logical_line();
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, self.line, self.column);
        }
        self.push(TokenKind::Eof, self.line, self.column);
        Ok(self.tokens)
    }

    /// Measures the indentation of a new line and emits `Indent`/`Dedent`.
    /// Returns true when the line is blank or comment-only and was skipped.
    fn indentation(&mut self) -> Result<bool, ParseError> {
        let mut width = 0;
        while let Some(c) = self.chars.get(self.pos).copied() {
            match c {
                ' ' => width += 1,
                '\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                '\x0c' | '\r' => {}
                _ => break,
            }
            self.advance();
        }

        match self.chars.get(self.pos) {
            None => return Ok(true),
            Some('\n') => {
                self.advance();
                return Ok(true);
            }
            Some('#') => {
                self.skip_comment();
                if self.chars.get(self.pos) == Some(&'\n') {
                    self.advance();
                }
                return Ok(true);
            }
            Some(_) => {}
        }

        let current = self.indents.last().copied().unwrap_or_default();
        if width > current {
            self.indents.push(width);
            self.push(TokenKind::Indent, self.line, 1);
        } else if width < current {
            while self.indents.last().is_some_and(|&level| level > width) {
                self.indents.pop();
                self.push(TokenKind::Dedent, self.line, 1);
            }
            if self.indents.last() != Some(&width) {
                return Err(ParseError::new(
                    self.line,
                    self.column,
                    "unindent does not match any outer indentation level",
                ));
            }
        }
        Ok(false)
    }

    fn end_logical_line(&mut self) {
        let needs_newline = self
            .tokens
            .last()
            .is_some_and(|token| !matches!(token.kind, TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent));
        if needs_newline {
            self.push(TokenKind::Newline, self.line, self.column);
        }
    }

    fn skip_comment(&mut self) {
        while self.chars.get(self.pos).is_some_and(|&c| c != '\n') {
            self.advance();
        }
    }

    fn name(&mut self) {
        let (line, column) = (self.line, self.column);
        let start = self.pos;
        while self
            .chars
            .get(self.pos)
            .is_some_and(|&c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        self.push(TokenKind::Name(name), line, column);
    }

    fn number(&mut self) -> Result<(), ParseError> {
        let (line, column) = (self.line, self.column);
        let mut text = String::new();
        let mut is_float = false;

        self.digits(&mut text);
        if self.chars.get(self.pos) == Some(&'.') {
            is_float = true;
            text.push('.');
            self.advance();
            self.digits(&mut text);
        }
        if matches!(self.chars.get(self.pos), Some('e' | 'E')) {
            let signed = matches!(self.peek(1), Some('+' | '-'));
            let exponent_digit = self.peek(if signed { 2 } else { 1 });
            if exponent_digit.is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('e');
                self.advance();
                if signed {
                    text.push(self.chars[self.pos]);
                    self.advance();
                }
                self.digits(&mut text);
            }
        }
        if self
            .chars
            .get(self.pos)
            .is_some_and(|&c| c.is_alphanumeric() || c == '_')
        {
            return Err(ParseError::new(line, column, "invalid numeric literal"));
        }

        let kind = if is_float {
            let value = text
                .parse::<f64>()
                .map_err(|_| ParseError::new(line, column, "invalid float literal"))?;
            TokenKind::Float(value)
        } else {
            let value = text
                .parse::<i64>()
                .map_err(|_| ParseError::new(line, column, "integer literal is too large"))?;
            TokenKind::Int(value)
        };
        self.push(kind, line, column);
        Ok(())
    }

    fn digits(&mut self, text: &mut String) {
        while let Some(&c) = self.chars.get(self.pos) {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c != '_' || !self.peek(1).is_some_and(|n| n.is_ascii_digit()) {
                break;
            }
            self.advance();
        }
    }

    fn string(&mut self, quote: char) -> Result<(), ParseError> {
        let (line, column) = (self.line, self.column);
        let triple = self.peek(1) == Some(quote) && self.peek(2) == Some(quote);
        let width = if triple { 3 } else { 1 };
        for _ in 0..width {
            self.advance();
        }

        let mut text = String::new();
        loop {
            let Some(c) = self.chars.get(self.pos).copied() else {
                return Err(ParseError::new(line, column, "unterminated string literal"));
            };

            if c == quote
                && (!triple || (self.peek(1) == Some(quote) && self.peek(2) == Some(quote)))
            {
                for _ in 0..width {
                    self.advance();
                }
                break;
            }

            match c {
                '\n' if !triple => {
                    return Err(ParseError::new(line, column, "unterminated string literal"));
                }
                '\\' => {
                    self.advance();
                    let Some(escaped) = self.chars.get(self.pos).copied() else {
                        return Err(ParseError::new(line, column, "unterminated string literal"));
                    };
                    match escaped {
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        'r' => text.push('\r'),
                        '0' => text.push('\0'),
                        '\\' | '\'' | '"' => text.push(escaped),
                        '\n' => {}
                        other => {
                            text.push('\\');
                            text.push(other);
                        }
                    }
                    self.advance();
                }
                _ => {
                    text.push(c);
                    self.advance();
                }
            }
        }

        self.push(TokenKind::Str(text), line, column);
        Ok(())
    }

    fn operator(&mut self) -> Result<(), ParseError> {
        let (line, column) = (self.line, self.column);
        let rest = &self.chars[self.pos..];
        let Some(op) = OPERATORS.iter().copied().find(|op| {
            op.chars().count() <= rest.len() && op.chars().zip(rest.iter()).all(|(a, &b)| a == b)
        }) else {
            return Err(ParseError::new(
                line,
                column,
                format!("unexpected character `{}`", self.chars[self.pos]),
            ));
        };

        match op {
            "(" | "[" | "{" => {
                self.depth += 1;
                self.brackets.push((op.chars().next().unwrap_or('('), line, column));
            }
            ")" | "]" | "}" => {
                let expected = match op {
                    ")" => '(',
                    "]" => '[',
                    _ => '{',
                };
                match self.brackets.pop() {
                    Some((open, _, _)) if open == expected => self.depth -= 1,
                    _ => {
                        return Err(ParseError::new(line, column, format!("unmatched `{op}`")));
                    }
                }
            }
            _ => {}
        }

        for _ in 0..op.len() {
            self.advance();
        }
        self.push(TokenKind::Op(op), line, column);
        Ok(())
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(&c) = self.chars.get(self.pos) {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn push(&mut self, kind: TokenKind, line: usize, column: usize) {
        self.tokens.push(Token { kind, line, column });
    }
}
