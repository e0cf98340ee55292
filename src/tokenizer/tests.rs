use super::*;

fn non_trivia(tokens: &[Token]) -> Vec<(TokenKind, String)> {
    tokens
        .iter()
        .filter(|t| !t.kind.is_trivia())
        .map(|t| (t.kind, t.text.clone()))
        .collect()
}

#[test]
fn tokenizes_struct_declaration() {
    let (tokens, errors) = tokenize("m.skir", "struct Foo(1) { x: int32 = 0; }");
    assert!(errors.is_empty());
    let kinds = non_trivia(&tokens);
    assert_eq!(kinds[0], (TokenKind::Identifier, "struct".to_string()));
    assert_eq!(kinds[1], (TokenKind::Identifier, "Foo".to_string()));
    assert_eq!(kinds[2], (TokenKind::Punct, "(".to_string()));
    assert_eq!(kinds[3], (TokenKind::Integer, "1".to_string()));
}

#[test]
fn normalizes_single_quoted_strings() {
    let (tokens, errors) = tokenize("m.skir", "const X: string = 'hi';");
    assert!(errors.is_empty());
    let string_tok = tokens
        .iter()
        .find(|t| t.kind == TokenKind::StringLiteral)
        .unwrap();
    assert_eq!(string_tok.text, "\"hi\"");
    assert_eq!(string_tok.original_text, "'hi'");
}

#[test]
fn unterminated_string_reports_error() {
    let (_, errors) = tokenize("m.skir", "const X: string = \"oops;");
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0].kind, ErrorKind::UnterminatedString));
}

#[test]
fn doc_comment_strips_leading_slashes_and_space() {
    let (tokens, _) = tokenize("m.skir", "/// Hello world\nstruct A {}");
    let doc = tokens
        .iter()
        .find(|t| t.kind == TokenKind::DocComment)
        .unwrap();
    assert_eq!(doc.text, "Hello world");
}

#[test]
fn distinguishes_dotdot_from_dot() {
    let (tokens, _) = tokenize("m.skir", "removed 1..3;");
    let puncts: Vec<_> = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Punct)
        .map(|t| t.text.as_str())
        .collect();
    assert_eq!(puncts, vec![".."]);
}

#[test]
fn float_vs_integer_literal() {
    let (tokens, _) = tokenize("m.skir", "1 1.5 -3 -2.25");
    let nums: Vec<_> = tokens
        .iter()
        .filter(|t| matches!(t.kind, TokenKind::Integer | TokenKind::Float))
        .map(|t| (t.kind, t.text.as_str()))
        .collect();
    assert_eq!(
        nums,
        vec![
            (TokenKind::Integer, "1"),
            (TokenKind::Float, "1.5"),
            (TokenKind::Integer, "-3"),
            (TokenKind::Float, "-2.25"),
        ]
    );
}

#[test]
fn unterminated_block_comment_reports_error() {
    let (_, errors) = tokenize("m.skir", "/* never closes");
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0].kind, ErrorKind::UnterminatedBlockComment));
}

#[test]
fn invalid_character_is_reported_and_skipped() {
    let (tokens, errors) = tokenize("m.skir", "struct A { x: int32 $ };");
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0].kind, ErrorKind::InvalidCharacter { .. }));
    // Scanning continues past the bad byte.
    assert!(non_trivia(&tokens).iter().any(|(_, t)| t == "}"));
}
