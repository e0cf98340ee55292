//! Resolves `[…]` doc-comment references (§4.3 "Doc comments") against
//! the name/type graph built by `declarations` and `type_resolve`.
//!
//! Scope priority, from the spec: for a reference attached to a field
//! of record `R`, try the field's own type's record scope first, then
//! `R` itself, then `R`'s enclosing records (walking outward), then the
//! module's top-level scope. A method's doc tries its request type's
//! scope before its response type's scope. Everything else (record and
//! constant docs) just searches the enclosing-record chain, then the
//! module.

use std::collections::{HashMap, HashSet};

use crate::ast::{self, Decl, Member, ParsedModule};
use crate::doc_comment::{Doc, DocPiece};
use crate::error::{ErrorKind, SkirError};
use crate::resolved::{Record, RecordKey};

use super::NameScope;

pub fn resolve_module(
    module_path: &str,
    parsed: &ParsedModule,
    name_scope: &NameScope,
    record_map: &HashMap<RecordKey, Record>,
    used_imports: &mut HashSet<String>,
    errors: &mut Vec<SkirError>,
) {
    let ctx = Ctx {
        module_path,
        name_scope,
        record_map,
        used_imports,
        errors,
    };
    ctx.run(parsed);
}

struct Ctx<'a> {
    module_path: &'a str,
    name_scope: &'a NameScope,
    record_map: &'a HashMap<RecordKey, Record>,
    used_imports: &'a mut HashSet<String>,
    errors: &'a mut Vec<SkirError>,
}

impl<'a> Ctx<'a> {
    fn run(mut self, parsed: &ParsedModule) {
        for decl in &parsed.declarations {
            match decl {
                Decl::Record(r) => self.visit_record(r, &[]),
                Decl::Method(m) => self.visit_method(m),
                Decl::Const(c) => {
                    if let Some(doc) = &c.doc {
                        self.resolve_doc(doc, &[]);
                    }
                }
                Decl::ImportAlias(_) | Decl::Import(_) => {}
            }
        }
    }

    /// `ancestors` is the chain of enclosing record keys, outermost
    /// first, NOT including `decl` itself.
    fn visit_record(&mut self, decl: &ast::RecordDecl, ancestors: &[RecordKey]) {
        let key = RecordKey::new(self.module_path, decl.name.position.offset());
        if let Some(doc) = &decl.doc {
            self.resolve_doc(doc, ancestors);
        }
        let mut chain = ancestors.to_vec();
        chain.push(key);
        for member in &decl.members {
            match member {
                Member::Field(f) => {
                    if let Some(doc) = &f.doc {
                        let field_record_scope = self.field_record_scope(&chain, &f.name.text);
                        self.resolve_doc_with_extra_scope(doc, &chain, field_record_scope);
                    }
                }
                Member::Nested(nested) => self.visit_record(nested, &chain),
                Member::Removed(_) => {}
            }
        }
    }

    fn visit_method(&mut self, decl: &ast::MethodDecl) {
        let Some(doc) = &decl.doc else { return };
        // Request-type scope is tried before response-type scope,
        // ahead of the module scope, per spec.md §4.3.
        let mut extra = Vec::new();
        if let Some(key) = self.named_type_record(&decl.request) {
            extra.push(key);
        }
        if let Some(key) = self.named_type_record(&decl.response) {
            extra.push(key);
        }
        self.resolve_doc_pieces(doc, &extra, &[]);
    }

    fn named_type_record(&self, type_expr: &ast::TypeExpr) -> Option<RecordKey> {
        match type_expr {
            ast::TypeExpr::Named(name) if name.parts.len() == 1 => {
                match self.name_scope.get(&name.parts[0].text)? {
                    crate::resolved::Declaration::Record(key) => Some(key.clone()),
                    _ => None,
                }
            }
            ast::TypeExpr::Optional(inner) => self.named_type_record(inner),
            _ => None,
        }
    }

    /// The record scope of `field_name`'s own declared type, if it
    /// resolved to a record (the highest-priority scope for that
    /// field's doc references).
    fn field_record_scope(&self, chain: &[RecordKey], field_name: &str) -> Option<RecordKey> {
        let key = chain.last()?;
        let record = self.record_map.get(key)?;
        let field = record.field_by_name(field_name)?;
        field.ty.record_key().cloned()
    }

    fn resolve_doc(&mut self, doc: &Doc, ancestors: &[RecordKey]) {
        self.resolve_doc_pieces(doc, &[], ancestors);
    }

    fn resolve_doc_with_extra_scope(&mut self, doc: &Doc, chain: &[RecordKey], extra: Option<RecordKey>) {
        let ancestors = &chain[..chain.len().saturating_sub(1)];
        let extra_vec: Vec<RecordKey> = extra.into_iter().collect();
        self.resolve_doc_pieces(doc, &extra_vec, &{
            // The enclosing record itself is the first "ancestor" tried
            // after the field's own type scope.
            let mut v = vec![chain[chain.len() - 1].clone()];
            v.extend(ancestors.iter().rev().cloned());
            v
        });
    }

    /// `leading` scopes are tried first, in order, then `ancestors`
    /// (innermost first), then the module's top-level scope.
    fn resolve_doc_pieces(&mut self, doc: &Doc, leading: &[RecordKey], ancestors: &[RecordKey]) {
        for piece in &doc.pieces {
            let DocPiece::Reference(reference) = piece else {
                continue;
            };
            if reference.absolute {
                if self.resolve_in_module(&reference.parts) {
                    continue;
                }
                self.errors
                    .push(SkirError::new(reference.token.clone(), ErrorKind::CannotResolveReference));
                continue;
            }

            let mut resolved = false;
            for key in leading {
                if self.resolve_in_record(key, &reference.parts) {
                    resolved = true;
                    break;
                }
            }
            if !resolved {
                for key in ancestors {
                    if self.resolve_in_record(key, &reference.parts) {
                        resolved = true;
                        break;
                    }
                }
            }
            if !resolved && self.resolve_in_module(&reference.parts) {
                resolved = true;
            }
            if !resolved {
                self.errors
                    .push(SkirError::new(reference.token.clone(), ErrorKind::CannotResolveReference));
            }
        }
    }

    fn resolve_in_module(&mut self, parts: &[String]) -> bool {
        let Some(first) = parts.first() else { return false };
        match self.name_scope.get(first).cloned() {
            Some(crate::resolved::Declaration::Record(key)) => self.resolve_rest_in_record(&key, &parts[1..]),
            Some(crate::resolved::Declaration::Import { .. } | crate::resolved::Declaration::ImportAlias { .. }) => {
                self.used_imports.insert(first.clone());
                true
            }
            Some(_) => parts.len() == 1,
            None => false,
        }
    }

    fn resolve_in_record(&self, key: &RecordKey, parts: &[String]) -> bool {
        let Some(first) = parts.first() else { return false };
        let Some(record) = self.record_map.get(key) else {
            return false;
        };
        if record.field_by_name(first).is_some() {
            return parts.len() == 1 || self.descend_field(record, first, &parts[1..]);
        }
        if let Some(nested_key) = record.nested.get(first) {
            return self.resolve_rest_in_record(nested_key, &parts[1..]);
        }
        false
    }

    fn descend_field(&self, record: &Record, field_name: &str, rest: &[String]) -> bool {
        if rest.is_empty() {
            return true;
        }
        let Some(field) = record.field_by_name(field_name) else {
            return false;
        };
        match field.ty.record_key() {
            Some(key) => self.resolve_rest_in_record(key, rest),
            None => false,
        }
    }

    fn resolve_rest_in_record(&self, key: &RecordKey, rest: &[String]) -> bool {
        if rest.is_empty() {
            return true;
        }
        self.resolve_in_record(key, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_set::compile;
    use std::collections::HashMap as Map;

    fn compile_one(source: &str) -> crate::module_set::ModuleSet {
        let mut sources = Map::new();
        sources.insert("m.skir".to_string(), source.to_string());
        compile(&sources)
    }

    #[test]
    fn resolves_reference_to_enum_variant() {
        let set = compile_one(
            "/// Hello [Bar.OK]\nstruct Foo { x: int32; }\nenum Bar { OK; }\n",
        );
        assert!(set.is_ok(), "{:?}", set.all_errors());
    }

    #[test]
    fn unresolved_reference_is_reported() {
        let set = compile_one("/// See [Nope]\nstruct Foo { x: int32; }\n");
        assert!(set
            .all_errors()
            .iter()
            .any(|e| matches!(e.kind, ErrorKind::CannotResolveReference)));
    }

    #[test]
    fn field_doc_resolves_against_own_struct_scope() {
        let set = compile_one(
            "struct Foo {\n  /// see [line1]\n  addr: struct { line1: string; };\n}\n",
        );
        assert!(set.is_ok(), "{:?}", set.all_errors());
    }
}
