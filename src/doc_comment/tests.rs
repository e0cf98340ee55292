use super::*;
use crate::token::TokenKind;
use crate::tokenizer::tokenize;

fn doc_lines(source: &str) -> Vec<Token> {
    let (tokens, errors) = tokenize("m.skir", source);
    assert!(errors.is_empty(), "{errors:?}");
    tokens
        .into_iter()
        .filter(|t| t.kind == TokenKind::DocComment)
        .collect()
}

#[test]
fn plain_text_with_no_references() {
    let (doc, errors) = parse_doc(&doc_lines("/// Hello world\n"));
    assert!(errors.is_empty());
    assert_eq!(doc.pieces, vec![DocPiece::Text("Hello world".to_string())]);
}

#[test]
fn reference_resolves_to_dotted_parts() {
    let (doc, errors) = parse_doc(&doc_lines("/// Hello [Bar.OK]\n"));
    assert!(errors.is_empty());
    assert_eq!(doc.pieces.len(), 2);
    assert_eq!(doc.pieces[0], DocPiece::Text("Hello ".to_string()));
    match &doc.pieces[1] {
        DocPiece::Reference(r) => {
            assert!(!r.absolute);
            assert_eq!(r.parts, vec!["Bar".to_string(), "OK".to_string()]);
        }
        _ => panic!("expected reference"),
    }
}

#[test]
fn absolute_reference_leading_dot() {
    let (doc, errors) = parse_doc(&doc_lines("/// See [.Foo]\n"));
    assert!(errors.is_empty());
    match &doc.pieces[1] {
        DocPiece::Reference(r) => {
            assert!(r.absolute);
            assert_eq!(r.parts, vec!["Foo".to_string()]);
        }
        _ => panic!("expected reference"),
    }
}

#[test]
fn double_brackets_are_literal() {
    let (doc, errors) = parse_doc(&doc_lines("/// Array [[literal]] brackets\n"));
    assert!(errors.is_empty());
    assert_eq!(doc.pieces.len(), 1);
    assert_eq!(
        doc.pieces[0],
        DocPiece::Text("Array [literal] brackets".to_string())
    );
}

#[test]
fn lone_close_bracket_is_literal() {
    let (doc, errors) = parse_doc(&doc_lines("/// oops ] here\n"));
    assert!(errors.is_empty());
    assert_eq!(doc.pieces[0], DocPiece::Text("oops ] here".to_string()));
}

#[test]
fn whitespace_inside_reference_errors() {
    let (_, errors) = parse_doc(&doc_lines("/// bad [A B]\n"));
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0].kind, ErrorKind::CannotResolveReference));
}

#[test]
fn multiple_lines_join_with_newline() {
    let (doc, _) = parse_doc(&doc_lines("/// Line one\n/// Line two\n"));
    assert_eq!(doc.text, "Line one\nLine two");
}
