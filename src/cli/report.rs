//! Cargo-style diagnostic rendering for `SkirError` and
//! `compat::BreakingChange`.
//!
//! Grounded in the teacher's `cli::report`: a `report_to<W: Write>`
//! entry point so tests can assert against a `Vec<u8>` instead of
//! stdout, `-->` path:line:col, and a blue `|` gutter with a
//! `unicode_width`-aware caret under the offending column.

use std::io::{self, Write};

use colored::Colorize;
use unicode_width::UnicodeWidthStr;

use crate::compat::BreakingChange;
use crate::error::SkirError;
use crate::token::Token;

pub fn report_errors(errors: &[&SkirError]) {
    report_errors_to(errors, &mut io::stderr().lock());
}

pub fn report_errors_to<W: Write>(errors: &[&SkirError], writer: &mut W) {
    for error in errors {
        print_diagnostic(&error.token, &error.to_string(), writer);
    }
    print_summary(errors.len(), "error", writer);
}

pub fn report_breaking_changes(changes: &[BreakingChange]) {
    report_breaking_changes_to(changes, &mut io::stderr().lock());
}

pub fn report_breaking_changes_to<W: Write>(changes: &[BreakingChange], writer: &mut W) {
    for change in changes {
        print_diagnostic(&change.token, &change.kind.description(), writer);
    }
    print_summary(changes.len(), "breaking change", writer);
}

pub fn print_success(message: &str) {
    print_success_to(message, &mut io::stdout().lock());
}

pub fn print_success_to<W: Write>(message: &str, writer: &mut W) {
    let _ = writeln!(writer, "{} {}", "\u{2713}".green(), message.green());
}

fn print_diagnostic<W: Write>(token: &Token, message: &str, writer: &mut W) {
    let line = token.line_number_one_based();
    let col = token.col_number_one_based();
    let width = line.to_string().len();

    let _ = writeln!(writer, "{}: {}", "error:".bold().red(), message);
    let _ = writeln!(
        writer,
        "{:>width$} {} {}:{}:{}",
        "",
        "-->".blue(),
        token.module_path(),
        line,
        col,
        width = width
    );
    let _ = writeln!(writer, "{:>width$} {}", "", "|".blue(), width = width);
    let _ = writeln!(
        writer,
        "{:>width$} {} {}",
        line,
        "|".blue(),
        token.line.text,
        width = width
    );

    let prefix = if col > 1 {
        token.line.text.chars().take(col - 1).collect::<String>()
    } else {
        String::new()
    };
    let caret_padding = UnicodeWidthStr::width(prefix.as_str());
    let _ = writeln!(
        writer,
        "{:>width$} {} {:>padding$}{}",
        "",
        "|".blue(),
        "",
        "^".red(),
        width = width,
        padding = caret_padding
    );
    let _ = writeln!(writer);
}

fn print_summary<W: Write>(count: usize, noun: &str, writer: &mut W) {
    if count == 0 {
        return;
    }
    let plural = if count == 1 { "" } else { "s" };
    let _ = writeln!(writer, "{}: {count} {noun}{plural}", "error".bold().red());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Decl, Member, TypeExpr};
    use crate::error::ErrorKind;
    use crate::parser::{parse_module, Mode};

    fn strip_ansi(s: &str) -> String {
        let mut out = String::new();
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\u{1b}' {
                while let Some(&next) = chars.peek() {
                    chars.next();
                    if next == 'm' {
                        break;
                    }
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn renders_a_caret_under_the_offending_column() {
        let (parsed, _tokens) = parse_module("m.skir", "struct A {\n  x: Bogus;\n}\n", Mode::Strict);
        let Decl::Record(record) = &parsed.declarations[0] else {
            panic!("expected a record declaration");
        };
        let Member::Field(field) = &record.members[0] else {
            panic!("expected a field member");
        };
        let TypeExpr::Named(name) = field.type_expr.as_ref().unwrap() else {
            panic!("expected a named type");
        };
        let token = name.parts[0].clone();
        let error = SkirError::new(token, ErrorKind::CannotFindName {
            name: "Bogus".to_string(),
            expected_names: vec![],
        });

        let mut buf = Vec::new();
        report_errors_to(&[&error], &mut buf);
        let rendered = strip_ansi(&String::from_utf8(buf).unwrap());
        assert!(rendered.contains("m.skir:2:6"));
        assert!(rendered.contains("Cannot find name 'Bogus'"));
        assert!(rendered.contains("^"));
    }
}
