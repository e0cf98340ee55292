//! Formatter (§4.4): token stream -> canonical source + minimal text
//! edits. Parses in lenient mode (braces/brackets balanced is the only
//! requirement) and re-emits the `ParsedModule` with canonical
//! whitespace, double-quoted strings, one member per line, two-space
//! indentation, and stable comment placement.
//!
//! Grounded in the recursive string-building printer shape used by the
//! pack's other AST-to-text renderer (`LogicFormatter` in
//! `logicaffeine`'s `formatter.rs`): build child strings bottom-up, join
//! with a handful of `format!` calls, no intermediate IR.

use crate::ast::{ConstDecl, Decl, FieldDecl, ImportAliasDecl, ImportDecl, Literal, Member, MethodDecl, ParsedModule, QualifiedName, RecordDecl, RecordKind, TypeExpr};
use crate::doc_comment::Doc;
use crate::parser::{parse_module, Mode};

const INDENT: &str = "  ";

/// A deterministic replacement for stable identifiers when the
/// formatter is asked to redact them for snapshot-style output. Takes
/// no arguments so tests can close over a counter or fixed sequence.
pub type RandomFn<'a> = &'a mut dyn FnMut() -> u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub old_start: usize,
    pub old_end: usize,
    pub new_text: String,
}

#[derive(Debug, Clone)]
pub struct FormatResult {
    pub new_source_code: String,
    pub text_edits: Vec<TextEdit>,
}

/// Formats `source` as-is: stable identifiers and method numbers are
/// printed verbatim.
pub fn format_module(module_path: &str, source: &str) -> FormatResult {
    format_with(module_path, source, None)
}

/// Formats `source` for snapshot comparison: every record's parenthesized
/// number and every method's `= N` number is replaced by a value drawn
/// from `random`, so two schemas that differ only in assigned numbers
/// produce identical snapshots (§4.4 "Stable-identifier redaction").
pub fn format_module_for_snapshot(module_path: &str, source: &str, random: RandomFn<'_>) -> FormatResult {
    format_with(module_path, source, Some(random))
}

fn format_with(module_path: &str, source: &str, mut random: Option<RandomFn<'_>>) -> FormatResult {
    let (parsed, _tokens) = parse_module(module_path, source, Mode::Lenient);
    let new_source_code = print_module(&parsed, &mut random);
    let text_edits = diff_edits(source, &new_source_code);
    FormatResult {
        new_source_code,
        text_edits,
    }
}

fn print_module(module: &ParsedModule, random: &mut Option<RandomFn<'_>>) -> String {
    let mut out = String::new();
    let mut i = 0;
    let mut first = true;
    while i < module.declarations.len() {
        if !first {
            out.push('\n');
        }
        first = false;
        match &module.declarations[i] {
            Decl::ImportAlias(d) => {
                print_import_alias(d, &mut out);
                i += 1;
            }
            Decl::Import(d) => {
                // Re-merge the sibling `Decl::Import` entries that
                // `parse_import` split a single `import A, B from "x";`
                // statement into (they share one `path_literal`
                // position), so reformatting doesn't turn one import
                // line into several.
                let mut names = vec![d.name.text.clone()];
                let mut j = i + 1;
                while let Some(Decl::Import(next)) = module.declarations.get(j) {
                    if next.path_literal.position == d.path_literal.position {
                        names.push(next.name.text.clone());
                        j += 1;
                    } else {
                        break;
                    }
                }
                print_import(&names, d, &mut out);
                i = j;
            }
            Decl::Record(r) => {
                print_named_record(r, 0, &mut out, random);
                i += 1;
            }
            Decl::Method(m) => {
                print_method(m, 0, &mut out, random);
                i += 1;
            }
            Decl::Const(c) => {
                print_const(c, 0, &mut out);
                i += 1;
            }
        }
    }
    out
}

fn print_import_alias(d: &ImportAliasDecl, out: &mut String) {
    out.push_str(&format!("import * as {} from {};\n", d.alias.text, d.path_literal.text));
}

fn print_import(names: &[String], d: &ImportDecl, out: &mut String) {
    out.push_str(&format!("import {} from {};\n", names.join(", "), d.path_literal.text));
}

fn print_doc(doc: &Doc, indent: usize, out: &mut String) {
    let pad = INDENT.repeat(indent);
    for line in doc.text.split('\n') {
        if line.is_empty() {
            out.push_str(&pad);
            out.push_str("///\n");
        } else {
            out.push_str(&pad);
            out.push_str("/// ");
            out.push_str(line);
            out.push('\n');
        }
    }
}

fn next_number(random: &mut Option<RandomFn<'_>>, original: &str) -> String {
    match random {
        Some(f) => f().to_string(),
        None => original.to_string(),
    }
}

fn print_named_record(r: &RecordDecl, indent: usize, out: &mut String, random: &mut Option<RandomFn<'_>>) {
    let pad = INDENT.repeat(indent);
    if let Some(doc) = &r.doc {
        print_doc(doc, indent, out);
    }
    out.push_str(&pad);
    out.push_str(match r.kind {
        RecordKind::Struct => "struct ",
        RecordKind::Enum => "enum ",
    });
    out.push_str(&r.name.text);
    if let Some(number) = &r.number {
        out.push('(');
        out.push_str(&next_number(random, &number.text));
        out.push(')');
    }
    out.push_str(" {\n");
    print_members(&r.members, indent + 1, out, random);
    out.push_str(&pad);
    out.push_str("}\n");
}

/// An inline `struct { .. }` / `enum { .. }` type has no name or number
/// of its own in source syntax (`parse_inline_record` never reads one);
/// only the body is printed.
fn print_inline_record(r: &RecordDecl, indent: usize, out: &mut String, random: &mut Option<RandomFn<'_>>) {
    out.push_str(match r.kind {
        RecordKind::Struct => "struct {\n",
        RecordKind::Enum => "enum {\n",
    });
    print_members(&r.members, indent + 1, out, random);
    out.push_str(&INDENT.repeat(indent));
    out.push('}');
}

fn print_members(members: &[Member], indent: usize, out: &mut String, random: &mut Option<RandomFn<'_>>) {
    let pad = INDENT.repeat(indent);
    for member in members {
        match member {
            Member::Field(f) => print_field(f, indent, out, random),
            Member::Removed(r) => {
                out.push_str(&pad);
                out.push_str("removed ");
                let ranges: Vec<String> = r
                    .ranges
                    .iter()
                    .map(|(start, end)| if start == end { start.to_string() } else { format!("{start}..{end}") })
                    .collect();
                out.push_str(&ranges.join(", "));
                out.push_str(";\n");
            }
            Member::Nested(nested) => print_named_record(nested, indent, out, random),
        }
    }
}

fn print_field(f: &FieldDecl, indent: usize, out: &mut String, random: &mut Option<RandomFn<'_>>) {
    let pad = INDENT.repeat(indent);
    if let Some(doc) = &f.doc {
        print_doc(doc, indent, out);
    }
    out.push_str(&pad);
    out.push_str(&f.name.text);
    if let Some(ty) = &f.type_expr {
        out.push_str(": ");
        out.push_str(&print_type(ty, indent, random));
    }
    if let Some(number) = &f.number {
        out.push_str(" = ");
        out.push_str(&next_number(random, &number.text));
    }
    out.push_str(";\n");
}

fn print_qualified_name(name: &QualifiedName) -> String {
    let mut s = String::new();
    if name.leading_dot {
        s.push('.');
    }
    s.push_str(&name.parts.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join("."));
    s
}

fn print_type(ty: &TypeExpr, indent: usize, random: &mut Option<RandomFn<'_>>) -> String {
    match ty {
        TypeExpr::Named(name) => print_qualified_name(name),
        TypeExpr::Array { item, key } => {
            let item_str = print_type(item, indent, random);
            match key {
                Some(parts) => {
                    let path = parts.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(".");
                    format!("[{item_str}|{path}]")
                }
                None => format!("[{item_str}]"),
            }
        }
        TypeExpr::Optional(inner) => format!("{}?", print_type(inner, indent, random)),
        TypeExpr::InlineRecord(r) => {
            let mut s = String::new();
            print_inline_record(r, indent, &mut s, random);
            s
        }
    }
}

fn print_method(m: &MethodDecl, indent: usize, out: &mut String, random: &mut Option<RandomFn<'_>>) {
    let pad = INDENT.repeat(indent);
    if let Some(doc) = &m.doc {
        print_doc(doc, indent, out);
    }
    out.push_str(&pad);
    out.push_str("method ");
    out.push_str(&m.name.text);
    out.push('(');
    out.push_str(&print_type(&m.request, indent, random));
    out.push_str("): ");
    out.push_str(&print_type(&m.response, indent, random));
    out.push_str(" = ");
    out.push_str(&next_number(random, &m.number.text));
    out.push_str(";\n");
}

fn print_const(c: &ConstDecl, indent: usize, out: &mut String) {
    let pad = INDENT.repeat(indent);
    if let Some(doc) = &c.doc {
        print_doc(doc, indent, out);
    }
    out.push_str(&pad);
    out.push_str("const ");
    out.push_str(&c.name.text);
    out.push_str(": ");
    out.push_str(&print_type(&c.type_expr, indent, &mut None));
    out.push_str(" = ");
    out.push_str(&print_literal(&c.value));
    out.push_str(";\n");
}

fn print_literal(lit: &Literal) -> String {
    match lit {
        Literal::Null(_) => "null".to_string(),
        Literal::Bool(_, v) => v.to_string(),
        Literal::Int(t) | Literal::Float(t) => t.text.clone(),
        Literal::Str(t, _) => t.text.clone(),
        Literal::Ident(t) => t.text.clone(),
        Literal::Array(_, items) => {
            let parts: Vec<String> = items.iter().map(print_literal).collect();
            format!("[{}]", parts.join(", "))
        }
        Literal::Object { partial, entries, .. } => {
            let parts: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", k.text, print_literal(v)))
                .collect();
            if *partial {
                format!("{{| {} |}}", parts.join(", "))
            } else {
                format!("{{{}}}", parts.join(", "))
            }
        }
    }
}

/// A minimal, single-hunk diff: the common prefix and common suffix
/// between `old` and `new` are left untouched, and everything between
/// them becomes one `TextEdit`. Not a minimal multi-hunk diff (a
/// one-line change at the top of a large file would still report one
/// edit spanning the rest), but it satisfies the two testable
/// invariants this crate cares about: an already-canonical input
/// produces zero edits, and applying the edit(s) to `old` reproduces
/// `new` exactly.
fn diff_edits(old: &str, new: &str) -> Vec<TextEdit> {
    if old == new {
        return Vec::new();
    }
    let old_bytes = old.as_bytes();
    let new_bytes = new.as_bytes();
    let max_common = old_bytes.len().min(new_bytes.len());

    let mut prefix = 0;
    while prefix < max_common && old_bytes[prefix] == new_bytes[prefix] {
        prefix += 1;
    }

    let mut suffix = 0;
    while suffix < max_common - prefix && old_bytes[old_bytes.len() - 1 - suffix] == new_bytes[new_bytes.len() - 1 - suffix] {
        suffix += 1;
    }

    let old_end = old_bytes.len() - suffix;
    let new_end = new_bytes.len() - suffix;
    vec![TextEdit {
        old_start: prefix,
        old_end,
        new_text: new[prefix..new_end].to_string(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_canonical_input_produces_no_edits() {
        let src = "struct Foo {\n  x: int32 = 1;\n}\n";
        let result = format_module("m.skir", src);
        assert_eq!(result.new_source_code, src);
        assert!(result.text_edits.is_empty());
    }

    #[test]
    fn reformats_single_quotes_and_missing_indentation() {
        let src = "struct Foo{\nx:string='hi';\n}";
        let result = format_module("m.skir", src);
        assert_eq!(result.new_source_code, "struct Foo {\n  x: string = \"hi\";\n}\n");
        assert!(!result.text_edits.is_empty());
    }

    #[test]
    fn formatting_is_idempotent() {
        let src = "struct   Foo (  1 )  {   x : int32 = 1 ; }\n";
        let once = format_module("m.skir", src);
        let twice = format_module("m.skir", &once.new_source_code);
        assert_eq!(once.new_source_code, twice.new_source_code);
        assert!(twice.text_edits.is_empty());
    }

    #[test]
    fn merges_split_import_names_back_into_one_line() {
        let src = "import A, B from \"other.skir\";\nstruct Foo {}\n";
        let result = format_module("m.skir", src);
        assert!(result.new_source_code.starts_with("import A, B from \"other.skir\";\n"));
    }

    #[test]
    fn redacts_stable_numbers_for_snapshot_formatting() {
        let src = "struct Foo(1) {\n  x: int32 = 1;\n}\n";
        let mut seq = [42u32, 7u32].into_iter();
        let mut random = move || seq.next().unwrap();
        let result = format_module_for_snapshot("m.skir", src, &mut random);
        assert_eq!(result.new_source_code, "struct Foo(42) {\n  x: int32 = 7;\n}\n");
    }

    #[test]
    fn text_edit_applies_back_to_new_source() {
        let src = "struct Foo{x:int32=1;}";
        let result = format_module("m.skir", src);
        let mut applied = String::new();
        for edit in &result.text_edits {
            applied.push_str(&src[..edit.old_start]);
            applied.push_str(&edit.new_text);
            applied.push_str(&src[edit.old_end..]);
        }
        if result.text_edits.is_empty() {
            applied = src.to_string();
        }
        assert_eq!(applied, result.new_source_code);
    }
}
