//! Tokens → syntactic AST for one module (§4.2).
//!
//! Recursive-descent, in the teacher's hand-rolled-scanner style rather
//! than a parser-combinator or generated grammar: the language is small
//! and the corpus never reaches for `nom`/`pest` anywhere a straight
//! `match`-on-token-text recursive descent reads just as clearly.

use crate::ast::*;
use crate::doc_comment::{self, Doc};
use crate::error::{ErrorKind, SkirError};
use crate::token::{Token, TokenKind};
use crate::tokenizer::tokenize;

/// Strict mode is used for compilation: every diagnostic is surfaced.
/// Lenient mode is used by the formatter, which must produce *something*
/// for a mid-edit, syntactically-broken buffer as long as brackets
/// balance (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Strict,
    Lenient,
}

pub fn parse_module(module_path: &str, source: &str, mode: Mode) -> (ParsedModule, Vec<Token>) {
    let (tokens, lex_errors) = tokenize(module_path, source);
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        mode,
        errors: lex_errors,
    };
    let declarations = parser.parse_top_level();
    (
        ParsedModule {
            declarations,
            errors: parser.errors,
        },
        tokens,
    )
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    mode: Mode,
    errors: Vec<SkirError>,
}

impl<'a> Parser<'a> {
    fn parse_top_level(&mut self) -> Vec<Decl> {
        let mut decls = Vec::new();
        loop {
            let doc = self.collect_doc();
            if self.peek().is_none() {
                break;
            }
            match self.parse_decl(doc) {
                Some(mut produced) => decls.append(&mut produced),
                None => {
                    if !self.resync_to_boundary() {
                        break;
                    }
                }
            }
        }
        decls
    }

    // -- token stream helpers --------------------------------------

    fn peek(&self) -> Option<&Token> {
        let mut i = self.pos;
        while let Some(t) = self.tokens.get(i) {
            if t.kind.is_trivia() {
                i += 1;
                continue;
            }
            return Some(t);
        }
        None
    }

    fn peek_is_punct(&self, s: &str) -> bool {
        self.peek().is_some_and(|t| t.is_punct(s))
    }

    fn advance(&mut self) -> Option<Token> {
        while let Some(t) = self.tokens.get(self.pos) {
            self.pos += 1;
            if !t.kind.is_trivia() {
                return Some(t.clone());
            }
        }
        None
    }

    /// Collects a contiguous run of doc-comment trivia immediately
    /// preceding the next real token into a `Doc`. A line comment
    /// resets the run (spec.md §4.3: a doc attaches to the *next*
    /// declaration, i.e. the run must be unbroken).
    fn collect_doc(&mut self) -> Option<Doc> {
        let mut doc_tokens: Vec<Token> = Vec::new();
        loop {
            match self.tokens.get(self.pos) {
                Some(t) if t.kind == TokenKind::DocComment => {
                    doc_tokens.push(t.clone());
                    self.pos += 1;
                }
                Some(t) if t.kind == TokenKind::Whitespace => {
                    self.pos += 1;
                }
                Some(t) if t.kind == TokenKind::LineComment || t.kind == TokenKind::BlockComment => {
                    doc_tokens.clear();
                    self.pos += 1;
                }
                _ => break,
            }
        }
        if doc_tokens.is_empty() {
            return None;
        }
        let (doc, mut errs) = doc_comment::parse_doc(&doc_tokens);
        self.errors.append(&mut errs);
        Some(doc)
    }

    fn expect_punct(&mut self, s: &str) -> Option<Token> {
        match self.peek() {
            Some(t) if t.is_punct(s) => self.advance(),
            _ => {
                self.error_here(format!("'{s}'"));
                None
            }
        }
    }

    fn eat_punct(&mut self, s: &str) -> bool {
        if self.peek_is_punct(s) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_identifier(&mut self) -> Option<Token> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Identifier => self.advance(),
            _ => {
                self.error_here("identifier".to_string());
                None
            }
        }
    }

    fn expect_keyword_text(&mut self, text: &str) -> Option<Token> {
        match self.peek() {
            Some(t) if (t.kind == TokenKind::Identifier || t.kind == TokenKind::Keyword) && t.text == text => {
                self.advance()
            }
            _ => {
                self.error_here(format!("'{text}'"));
                None
            }
        }
    }

    fn expect_integer(&mut self) -> Option<Token> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Integer => self.advance(),
            _ => {
                self.error_here("integer".to_string());
                None
            }
        }
    }

    fn expect_string(&mut self) -> Option<Token> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::StringLiteral => self.advance(),
            _ => {
                self.error_here("string literal".to_string());
                None
            }
        }
    }

    fn error_here(&mut self, expected: String) {
        if self.mode == Mode::Lenient {
            return;
        }
        if let Some(t) = self.peek().cloned() {
            self.errors
                .push(SkirError::new(t, ErrorKind::UnexpectedToken { expected }));
        }
    }

    /// Error recovery: skip raw tokens until a statement boundary (`;`
    /// or a brace) so the parser can keep surfacing later diagnostics
    /// instead of aborting (§7 propagation policy).
    fn resync_to_boundary(&mut self) -> bool {
        let start_pos = self.pos;
        while let Some(t) = self.tokens.get(self.pos) {
            if t.kind == TokenKind::Punct && (t.text == ";" || t.text == "}") {
                self.pos += 1;
                return true;
            }
            self.pos += 1;
        }
        self.pos > start_pos
    }

    // -- declarations -------------------------------------------------

    fn parse_decl(&mut self, doc: Option<Doc>) -> Option<Vec<Decl>> {
        let head = self.peek()?.clone();
        if head.is_identifier_text("import") {
            self.parse_import()
        } else if head.is_identifier_text("struct") || head.is_identifier_text("enum") {
            self.parse_record(doc).map(|r| vec![Decl::Record(r)])
        } else if head.is_identifier_text("method") {
            self.parse_method(doc).map(|m| vec![Decl::Method(m)])
        } else if head.is_identifier_text("const") {
            self.parse_const(doc).map(|c| vec![Decl::Const(c)])
        } else {
            self.error_here("declaration".to_string());
            None
        }
    }

    fn parse_import(&mut self) -> Option<Vec<Decl>> {
        self.advance(); // 'import'
        if self.eat_punct("*") {
            self.expect_keyword_text("as")?;
            let alias = self.expect_identifier()?;
            self.expect_keyword_text("from")?;
            let path_literal = self.expect_string()?;
            self.eat_punct(";");
            let path = string_literal_value(&path_literal.text);
            return Some(vec![Decl::ImportAlias(ImportAliasDecl {
                alias,
                path_literal,
                path,
            })]);
        }
        let first = self.expect_identifier()?;
        let mut names = vec![first];
        while self.eat_punct(",") {
            match self.expect_identifier() {
                Some(n) => names.push(n),
                None => break,
            }
        }
        self.expect_keyword_text("from")?;
        let path_literal = self.expect_string()?;
        self.eat_punct(";");
        let path = string_literal_value(&path_literal.text);
        Some(
            names
                .into_iter()
                .map(|name| {
                    Decl::Import(ImportDecl {
                        name,
                        path_literal: path_literal.clone(),
                        path: path.clone(),
                    })
                })
                .collect(),
        )
    }

    fn parse_record(&mut self, doc: Option<Doc>) -> Option<RecordDecl> {
        let kind_tok = self.advance()?; // 'struct' | 'enum'
        let kind = if kind_tok.text == "struct" {
            RecordKind::Struct
        } else {
            RecordKind::Enum
        };
        let name = self.expect_identifier()?;
        let number = if self.eat_punct("(") {
            let n = self.expect_integer();
            self.expect_punct(")");
            n
        } else {
            None
        };
        self.parse_record_body(kind, name, number, doc)
    }

    /// Parses `{ members }` given an already-known kind/name (used both
    /// for top-level/nested named records and for inline `struct { .. }`
    /// types, which share a name supplied by the caller).
    fn parse_record_body(
        &mut self,
        kind: RecordKind,
        name: Token,
        number: Option<Token>,
        doc: Option<Doc>,
    ) -> Option<RecordDecl> {
        let brace_open = self.expect_punct("{")?;
        let mut members = Vec::new();
        loop {
            if self.peek_is_punct("}") {
                break;
            }
            if self.peek().is_none() {
                break;
            }
            let member_doc = self.collect_doc();
            if self.peek_is_punct("}") || self.peek().is_none() {
                break;
            }
            match self.parse_member(kind, member_doc) {
                Some(m) => members.push(m),
                None => {
                    if !self.resync_to_boundary() {
                        break;
                    }
                }
            }
        }
        self.expect_punct("}");
        Some(RecordDecl {
            kind,
            name,
            number,
            members,
            doc,
            brace_open,
        })
    }

    fn parse_member(&mut self, record_kind: RecordKind, doc: Option<Doc>) -> Option<Member> {
        if self.peek().is_some_and(|t| t.is_identifier_text("removed")) {
            return self.parse_removed().map(Member::Removed);
        }
        if self
            .peek()
            .is_some_and(|t| t.is_identifier_text("struct") || t.is_identifier_text("enum"))
            && self
                .peek_ahead_is_ident_then_brace()
        {
            return self.parse_record(doc).map(Member::Nested);
        }
        self.parse_field(record_kind, doc).map(Member::Field)
    }

    fn peek_ahead_is_ident_then_brace(&self) -> bool {
        // Distinguishes a nested named record (`struct Inner { .. }`)
        // from a field whose type happens to start with `struct`/`enum`
        // (an inline type, handled in `parse_type`). A nested record is
        // only recognized at member level when followed by `NAME {`.
        let mut i = self.pos;
        let mut seen_kind = false;
        while let Some(t) = self.tokens.get(i) {
            if t.kind.is_trivia() {
                i += 1;
                continue;
            }
            if !seen_kind {
                seen_kind = true;
                i += 1;
                continue;
            }
            return t.kind == TokenKind::Identifier;
        }
        false
    }

    fn parse_removed(&mut self) -> Option<RemovedDecl> {
        let token = self.advance()?; // 'removed'
        let mut ranges = Vec::new();
        if !self.peek_is_punct(";") {
            loop {
                let start = self.expect_integer()?;
                let start_n: u32 = start.text.parse().unwrap_or(0);
                if self.eat_punct("..") {
                    let end = self.expect_integer()?;
                    let end_n: u32 = end.text.parse().unwrap_or(start_n);
                    ranges.push((start_n, end_n));
                } else {
                    ranges.push((start_n, start_n));
                }
                if !self.eat_punct(",") {
                    break;
                }
            }
        }
        self.eat_punct(";");
        Some(RemovedDecl { token, ranges })
    }

    fn parse_field(&mut self, record_kind: RecordKind, doc: Option<Doc>) -> Option<FieldDecl> {
        let name = self.expect_identifier()?;
        let type_expr = if self.eat_punct(":") {
            Some(self.parse_type()?)
        } else if record_kind == RecordKind::Struct {
            self.error_here("':'".to_string());
            None
        } else {
            None
        };
        let number = if self.eat_punct("=") {
            self.expect_integer()
        } else {
            None
        };
        self.eat_punct(";");
        Some(FieldDecl {
            name,
            type_expr,
            number,
            doc,
        })
    }

    fn parse_method(&mut self, doc: Option<Doc>) -> Option<MethodDecl> {
        self.advance(); // 'method'
        let name = self.expect_identifier()?;
        self.expect_punct("(")?;
        let request = self.parse_type()?;
        self.expect_punct(")")?;
        self.expect_punct(":")?;
        let response = self.parse_type()?;
        self.expect_punct("=")?;
        let number = self.expect_integer()?;
        self.eat_punct(";");
        Some(MethodDecl {
            name,
            request,
            response,
            number,
            doc,
        })
    }

    fn parse_const(&mut self, doc: Option<Doc>) -> Option<ConstDecl> {
        self.advance(); // 'const'
        let name = self.expect_identifier()?;
        self.expect_punct(":")?;
        let type_expr = self.parse_type()?;
        self.expect_punct("=")?;
        let value = self.parse_literal()?;
        self.eat_punct(";");
        Some(ConstDecl {
            name,
            type_expr,
            value,
            doc,
        })
    }

    // -- types ----------------------------------------------------------

    fn parse_type(&mut self) -> Option<TypeExpr> {
        let base = if self.peek_is_punct("[") {
            self.parse_array_type()?
        } else if self
            .peek()
            .is_some_and(|t| t.is_identifier_text("struct") || t.is_identifier_text("enum"))
        {
            self.parse_inline_record()?
        } else {
            TypeExpr::Named(self.parse_qualified_name()?)
        };
        if self.eat_punct("?") {
            Some(TypeExpr::Optional(Box::new(base)))
        } else {
            Some(base)
        }
    }

    fn parse_array_type(&mut self) -> Option<TypeExpr> {
        self.expect_punct("[")?;
        let item = self.parse_type()?;
        let key = if self.eat_punct("|") {
            let mut parts = vec![self.expect_identifier()?];
            while self.eat_punct(".") {
                parts.push(self.expect_identifier()?);
            }
            Some(parts)
        } else {
            None
        };
        self.expect_punct("]")?;
        Some(TypeExpr::Array {
            item: Box::new(item),
            key,
        })
    }

    fn parse_inline_record(&mut self) -> Option<TypeExpr> {
        let kind_tok = self.advance()?; // 'struct' | 'enum'
        let kind = if kind_tok.text == "struct" {
            RecordKind::Struct
        } else {
            RecordKind::Enum
        };
        // Inline records have no name of their own; the caller (field
        // lifting, in module_set) assigns one derived from the
        // enclosing field/method name (§4.3).
        let record = self.parse_record_body(kind, kind_tok, None, None)?;
        Some(TypeExpr::InlineRecord(Box::new(record)))
    }

    fn parse_qualified_name(&mut self) -> Option<QualifiedName> {
        let leading_dot = self.eat_punct(".");
        let mut parts = vec![self.expect_identifier()?];
        while self.eat_punct(".") {
            parts.push(self.expect_identifier()?);
        }
        Some(QualifiedName { leading_dot, parts })
    }

    // -- literals --------------------------------------------------------

    fn parse_literal(&mut self) -> Option<Literal> {
        let t = self.peek()?.clone();
        if t.is_identifier_text("null") {
            self.advance();
            return Some(Literal::Null(t));
        }
        if t.is_identifier_text("true") {
            self.advance();
            return Some(Literal::Bool(t, true));
        }
        if t.is_identifier_text("false") {
            self.advance();
            return Some(Literal::Bool(t, false));
        }
        match t.kind {
            TokenKind::Integer => {
                self.advance();
                Some(Literal::Int(t))
            }
            TokenKind::Float => {
                self.advance();
                Some(Literal::Float(t))
            }
            TokenKind::StringLiteral => {
                self.advance();
                let value = string_literal_value(&t.text);
                Some(Literal::Str(t, value))
            }
            TokenKind::Identifier => {
                self.advance();
                Some(Literal::Ident(t))
            }
            TokenKind::Punct if t.text == "[" => self.parse_array_literal(t),
            TokenKind::Punct if t.text == "{" => self.parse_object_literal(t),
            _ => {
                self.error_here("literal".to_string());
                None
            }
        }
    }

    fn parse_array_literal(&mut self, open: Token) -> Option<Literal> {
        self.advance(); // '['
        let mut items = Vec::new();
        while !self.peek_is_punct("]") && self.peek().is_some() {
            items.push(self.parse_literal()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct("]");
        Some(Literal::Array(open, items))
    }

    fn parse_object_literal(&mut self, open: Token) -> Option<Literal> {
        self.advance(); // '{'
        let partial = self.eat_punct("|");
        self.parse_object_entries(open, partial)
    }

    fn parse_object_entries(&mut self, open: Token, partial: bool) -> Option<Literal> {
        let mut entries: Vec<(Token, Literal)> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        loop {
            let is_close = if partial {
                self.peek_is_punct("|")
            } else {
                self.peek_is_punct("}")
            };
            if is_close || self.peek().is_none() {
                break;
            }
            let key = self.expect_identifier()?;
            self.expect_punct(":")?;
            let value = self.parse_literal()?;
            if !seen.insert(key.text.clone()) {
                self.errors
                    .push(SkirError::new(key.clone(), ErrorKind::DuplicateKey));
            }
            entries.push((key, value));
            if !self.eat_punct(",") {
                break;
            }
        }
        if partial {
            self.expect_punct("|")?;
            self.expect_punct("}")?;
        } else {
            self.expect_punct("}")?;
        }
        Some(Literal::Object {
            token: open,
            partial,
            entries,
        })
    }
}

fn string_literal_value(canonical_text: &str) -> String {
    canonical_text
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(canonical_text)
        .replace("\\\"", "\"")
        .replace("\\\\", "\\")
}

#[cfg(test)]
mod tests;
