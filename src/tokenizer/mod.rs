//! Byte stream → token stream (spec.md §4.1).
//!
//! Grounded in the teacher's single-pass, hand-rolled scanners
//! (`core/parsers/comment.rs`, `core/parsers/json.rs` walk raw `&str`
//! byte-by-byte rather than reaching for a lexer-generator crate); Skir
//! follows the same shape because its grammar is small enough that a
//! generated lexer would be pure overhead.

use std::rc::Rc;

use crate::error::{ErrorKind, SkirError};
use crate::position::{CodeLine, Position};
use crate::token::{Token, TokenKind};

const PUNCTUATORS: &[&str] = &[
    "..", "{", "}", "[", "]", "(", ")", ",", ";", ":", ".", "|", "?", "=", "*", "<", ">",
];

/// Tokenizes one module's source. Never fails outright: lexical problems
/// (unterminated strings/comments, stray bytes) become `SkirError`s
/// alongside a best-effort token stream so downstream strict parsing can
/// still attempt recovery.
pub fn tokenize(module_path: &str, source: &str) -> (Vec<Token>, Vec<SkirError>) {
    let lines: Vec<Rc<CodeLine>> = CodeLine::split(module_path, source)
        .into_iter()
        .map(Rc::new)
        .collect();

    let mut cursor = Cursor {
        bytes: source.as_bytes(),
        source,
        offset: 0,
        lines: &lines,
        line_idx: 0,
        tokens: Vec::new(),
        errors: Vec::new(),
    };
    cursor.run();
    (cursor.tokens, cursor.errors)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    source: &'a str,
    offset: usize,
    lines: &'a [Rc<CodeLine>],
    line_idx: usize,
    tokens: Vec<Token>,
    errors: Vec<SkirError>,
}

impl<'a> Cursor<'a> {
    fn run(&mut self) {
        while self.offset < self.bytes.len() {
            let start = self.offset;
            let c = self.bytes[start];
            if c == b'\n' || c == b' ' || c == b'\t' || c == b'\r' {
                self.consume_whitespace();
            } else if c == b'/' && self.peek(1) == Some(b'/') {
                self.consume_comment();
            } else if c == b'/' && self.peek(1) == Some(b'*') {
                self.consume_block_comment();
            } else if c == b'"' || c == b'\'' {
                self.consume_string(c);
            } else if c.is_ascii_digit() || (c == b'-' && self.peek(1).is_some_and(|n| n.is_ascii_digit())) {
                self.consume_number();
            } else if c.is_ascii_alphabetic() || c == b'_' {
                self.consume_identifier();
            } else if let Some(p) = self.match_punctuator() {
                self.push(TokenKind::Punct, p, p, start);
                self.offset += p.len();
            } else {
                let ch = self.source[start..].chars().next().unwrap_or('?');
                let line = self.line_for(start);
                self.errors.push(SkirError::new(
                    Token::new(
                        TokenKind::Punct,
                        ch.to_string(),
                        ch.to_string(),
                        Position(start),
                        line,
                    ),
                    ErrorKind::InvalidCharacter {
                        found: ch.to_string(),
                    },
                ));
                self.offset += ch.len_utf8();
            }
        }
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.offset + ahead).copied()
    }

    fn line_for(&mut self, offset: usize) -> Rc<CodeLine> {
        while self.line_idx + 1 < self.lines.len()
            && self.lines[self.line_idx + 1].start_offset <= offset
        {
            self.line_idx += 1;
        }
        self.lines[self.line_idx].clone()
    }

    fn push(&mut self, kind: TokenKind, text: impl Into<String>, original: impl Into<String>, start: usize) {
        let line = self.line_for(start);
        self.tokens
            .push(Token::new(kind, text, original, Position(start), line));
    }

    fn consume_whitespace(&mut self) {
        let start = self.offset;
        while let Some(c) = self.peek(0) {
            if c == b'\n' || c == b' ' || c == b'\t' || c == b'\r' {
                self.offset += 1;
            } else {
                break;
            }
        }
        let text = &self.source[start..self.offset];
        self.push(TokenKind::Whitespace, text, text, start);
    }

    fn consume_comment(&mut self) {
        let start = self.offset;
        let is_doc = self.bytes.get(start + 2) == Some(&b'/')
            && self.bytes.get(start + 3) != Some(&b'/');
        while self.offset < self.bytes.len() && self.bytes[self.offset] != b'\n' {
            self.offset += 1;
        }
        let raw = &self.source[start..self.offset];
        if is_doc {
            let body = raw.strip_prefix("///").unwrap_or(raw);
            let body = body.strip_prefix(' ').unwrap_or(body);
            self.push(TokenKind::DocComment, body, raw, start);
        } else {
            self.push(TokenKind::LineComment, raw, raw, start);
        }
    }

    fn consume_block_comment(&mut self) {
        let start = self.offset;
        self.offset += 2;
        let mut terminated = false;
        while self.offset < self.bytes.len() {
            if self.bytes[self.offset] == b'*' && self.peek(1) == Some(b'/') {
                self.offset += 2;
                terminated = true;
                break;
            }
            self.offset += 1;
        }
        let raw = &self.source[start..self.offset];
        if !terminated {
            let line = self.line_for(start);
            self.errors.push(SkirError::new(
                Token::new(TokenKind::BlockComment, raw, raw, Position(start), line),
                ErrorKind::UnterminatedBlockComment,
            ));
        }
        self.push(TokenKind::BlockComment, raw, raw, start);
    }

    fn consume_string(&mut self, quote: u8) {
        let start = self.offset;
        self.offset += 1;
        let mut value = String::new();
        let mut terminated = false;
        while self.offset < self.bytes.len() {
            let c = self.bytes[self.offset];
            if c == quote {
                self.offset += 1;
                terminated = true;
                break;
            }
            if c == b'\n' {
                break;
            }
            if c == b'\\' && self.offset + 1 < self.bytes.len() {
                let next = self.bytes[self.offset + 1];
                value.push(match next {
                    b'n' => '\n',
                    b't' => '\t',
                    b'r' => '\r',
                    b'"' => '"',
                    b'\'' => '\'',
                    b'\\' => '\\',
                    other => other as char,
                });
                self.offset += 2;
            } else {
                let ch = self.source[self.offset..].chars().next().unwrap_or('?');
                value.push(ch);
                self.offset += ch.len_utf8();
            }
        }
        let raw = self.source[start..self.offset].to_string();
        let canonical = format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""));
        if !terminated {
            let line = self.line_for(start);
            self.errors.push(SkirError::new(
                Token::new(
                    TokenKind::StringLiteral,
                    canonical.clone(),
                    raw.clone(),
                    Position(start),
                    line,
                ),
                ErrorKind::UnterminatedString,
            ));
        }
        self.push(TokenKind::StringLiteral, canonical, raw, start);
    }

    fn consume_number(&mut self) {
        let start = self.offset;
        if self.peek(0) == Some(b'-') {
            self.offset += 1;
        }
        while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
            self.offset += 1;
        }
        let mut is_float = false;
        if self.peek(0) == Some(b'.') && self.peek(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.offset += 1;
            while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
                self.offset += 1;
            }
        }
        let text = &self.source[start..self.offset];
        let kind = if is_float {
            TokenKind::Float
        } else {
            TokenKind::Integer
        };
        self.push(kind, text, text, start);
    }

    fn consume_identifier(&mut self) {
        let start = self.offset;
        while self
            .peek(0)
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.offset += 1;
        }
        let text = &self.source[start..self.offset];
        let kind = if text == "as" {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        self.push(kind, text, text, start);
    }

    fn match_punctuator(&self) -> Option<&'static str> {
        PUNCTUATORS
            .iter()
            .find(|p| self.source[self.offset..].starts_with(*p))
            .copied()
    }
}

#[cfg(test)]
mod tests;
