//! The `Token` type shared by every stage of the pipeline: tokenizer,
//! parser, resolver, formatter, and the definition/reference finder.

use std::fmt;
use std::rc::Rc;

use crate::position::{CodeLine, Position};

/// The syntactic class of a token, as produced by the tokenizer.
///
/// Whitespace and non-doc comments are kept as trivia (§4.1) so the
/// formatter can reconstruct stable comment placement; the parser skips
/// over them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Keyword,
    Integer,
    Float,
    StringLiteral,
    Punct,
    LineComment,
    BlockComment,
    DocComment,
    Whitespace,
    Eof,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }
}

/// A single lexeme plus enough positional information to report errors,
/// drive the formatter, and answer definition/reference queries.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Canonical text: string literals are normalized to double-quoted
    /// form here (§4.1).
    pub text: String,
    /// The text exactly as it appeared in the source, before
    /// normalization. Used by the formatter to preserve single- vs
    /// double-quote intent only where it matters (it doesn't — the
    /// formatter always emits double quotes — but `original_text` is
    /// retained for diagnostics that quote the user's own source).
    pub original_text: String,
    pub position: Position,
    /// 0-based column within `line`.
    pub col_number: usize,
    pub line: Rc<CodeLine>,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        text: impl Into<String>,
        original_text: impl Into<String>,
        position: Position,
        line: Rc<CodeLine>,
    ) -> Self {
        let text = text.into();
        let original_text = original_text.into();
        let col_number = line.col_number(position.offset());
        Token {
            kind,
            text,
            original_text,
            position,
            col_number,
            line,
        }
    }

    /// 1-based line number for external diagnostic rendering (§3: the
    /// core stores 0-based everywhere; callers that render to a human
    /// convert at the boundary).
    pub fn line_number_one_based(&self) -> usize {
        self.line.line_number + 1
    }

    /// 1-based column for external diagnostic rendering.
    pub fn col_number_one_based(&self) -> usize {
        self.col_number + 1
    }

    pub fn module_path(&self) -> &str {
        &self.line.module_path
    }

    pub fn is_identifier_text(&self, s: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == s
    }

    pub fn is_punct(&self, s: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == s
    }

    pub fn is_keyword(&self, s: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == s
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.text == other.text
            && self.position == other.position
            && self.module_path() == other.module_path()
    }
}
impl Eq for Token {}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.module_path(),
            self.line_number_one_based(),
            self.col_number_one_based()
        )
    }
}
