//! Parses merged `///` doc-comment text into text/reference pieces
//! (spec.md §4.3 "Doc comments").
//!
//! Grounded in the teacher's `core/collect/comments` subsystem, which
//! likewise walks raw comment text looking for an inline marker syntax
//! (`glot-message-keys` patterns) and turns it into structured pieces
//! consumed by a later resolution phase.

use crate::error::{ErrorKind, SkirError};
use crate::token::Token;

/// One parsed doc comment, attached to the declaration immediately
/// following the run of `///` lines that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doc {
    pub text: String,
    pub pieces: Vec<DocPiece>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocPiece {
    Text(String),
    Reference(DocReference),
}

/// An unresolved `[…]` reference. `absolute` is set when the bracket
/// content had a leading `.`. Resolution against a name scope happens in
/// `module_set::doc_refs`, not here: this module only knows syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocReference {
    pub absolute: bool,
    pub parts: Vec<String>,
    pub token: Token,
}

/// Merges consecutive `///` line tokens (as produced by the tokenizer,
/// already filtered to `TokenKind::DocComment`) into one `Doc`.
pub fn parse_doc(doc_lines: &[Token]) -> (Doc, Vec<SkirError>) {
    let mut text_parts = Vec::with_capacity(doc_lines.len());
    let mut pieces = Vec::new();
    let mut errors = Vec::new();

    for line_tok in doc_lines {
        text_parts.push(line_tok.text.clone());
        parse_line(line_tok, &mut pieces, &mut errors);
    }

    (
        Doc {
            text: text_parts.join("\n"),
            pieces,
        },
        errors,
    )
}

fn parse_line(line_tok: &Token, pieces: &mut Vec<DocPiece>, errors: &mut Vec<SkirError>) {
    let prefix_len = line_tok.original_text.len() - line_tok.text.len();
    let base_offset = line_tok.position.offset() + prefix_len;
    let body = &line_tok.text;

    let mut current_text = String::new();
    let mut chars = body.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            '[' if chars.peek().map(|&(_, c)| c) == Some('[') => {
                // `[[` is a literal bracket.
                chars.next();
                current_text.push('[');
            }
            ']' if chars.peek().map(|&(_, c)| c) == Some(']') => {
                chars.next();
                current_text.push(']');
            }
            '[' => {
                if !current_text.is_empty() {
                    pieces.push(DocPiece::Text(std::mem::take(&mut current_text)));
                }
                let start_idx = idx;
                let mut content = String::new();
                let mut closed = false;
                for (inner_idx, inner_c) in chars.by_ref() {
                    if inner_c == ']' {
                        closed = true;
                        let _ = inner_idx;
                        break;
                    }
                    content.push(inner_c);
                }
                if !closed {
                    // Unterminated reference: treat the bracket itself as
                    // literal text rather than fabricating a reference.
                    current_text.push('[');
                    current_text.push_str(&content);
                    continue;
                }
                let reference_token = Token::new(
                    line_tok.kind,
                    content.clone(),
                    content.clone(),
                    crate::position::Position(base_offset + start_idx),
                    line_tok.line.clone(),
                );
                match parse_reference_content(&content, reference_token.clone()) {
                    Ok(reference) => pieces.push(DocPiece::Reference(reference)),
                    Err(err) => errors.push(err),
                }
            }
            ']' => {
                // A `]` without a preceding `[` is literal (spec.md §4.3).
                current_text.push(']');
            }
            other => current_text.push(other),
        }
    }

    if !current_text.is_empty() {
        pieces.push(DocPiece::Text(current_text));
    }
}

fn parse_reference_content(content: &str, token: Token) -> Result<DocReference, SkirError> {
    if content.chars().any(|c| c.is_whitespace()) {
        return Err(SkirError::new(token, ErrorKind::CannotResolveReference)
            .with_message("Whitespace is not allowed inside a doc reference"));
    }
    let (absolute, rest) = match content.strip_prefix('.') {
        Some(rest) => (true, rest),
        None => (false, content),
    };
    if rest.is_empty() {
        return Err(SkirError::new(token, ErrorKind::CannotResolveReference));
    }
    let mut parts = Vec::new();
    for part in rest.split('.') {
        if part.is_empty() || !is_valid_reference_part(part) {
            return Err(SkirError::new(token, ErrorKind::CannotResolveReference));
        }
        parts.push(part.to_string());
    }
    Ok(DocReference {
        absolute,
        parts,
        token,
    })
}

fn is_valid_reference_part(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests;
