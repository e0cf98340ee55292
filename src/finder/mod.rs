//! Definition / reference finder (§4.6): two read-only queries over a
//! compiled `ModuleSet` plus the raw parsed ASTs it was built from.
//!
//! Grounded in the same traversal `doc_refs` already does to resolve
//! `[…]` references against the name/type graph; this module collects
//! every token that names *something* (a type name, a nested-record
//! path segment, a doc reference, an import's string literal) together
//! with what it resolves to, so both queries are answered by filtering
//! one list instead of re-walking the AST per call.

use std::collections::HashMap;

use crate::ast::{self, Decl, Member, TypeExpr};
use crate::doc_comment::{Doc, DocPiece};
use crate::module_set::{ModuleResult, ModuleSet};
use crate::resolved::{Declaration, Record, RecordKey};
use crate::token::Token;

/// What a located token names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Record(RecordKey),
    Field { record: RecordKey, field_name: String },
    Method { module_path: String, name: String },
    Constant { module_path: String, name: String },
    Module(String),
}

pub struct DefinitionMatch {
    pub module_path: String,
    pub target: Target,
    pub hovered_token: Token,
}

/// One token and what it resolves to, collected from a single module.
struct Candidate {
    token: Token,
    target: Target,
}

/// Given a byte offset into `module_path`'s source, locates the token
/// under the cursor and what it refers to.
pub fn find_definition(set: &ModuleSet, module_path: &str, pos: usize) -> Option<DefinitionMatch> {
    let module = set.module(module_path)?;
    let candidates = collect_candidates(module_path, module, &set.modules, &set.record_map);
    let hit = candidates
        .iter()
        .filter(|c| {
            let start = c.token.position.offset();
            let end = start + c.token.text.len();
            pos >= start && pos < end.max(start + 1)
        })
        // Prefer the longest (most specific) match at this offset.
        .max_by_key(|c| c.token.text.len())?;
    Some(DefinitionMatch {
        module_path: module_path.to_string(),
        target: hit.target.clone(),
        hovered_token: hit.token.clone(),
    })
}

/// Enumerates every reference to `decl_token`'s declaration across
/// `modules` (a subset of `set`'s module paths), in module-path then
/// source-position order.
pub fn find_references(set: &ModuleSet, decl_token: &Token, modules: &[String]) -> Vec<Token> {
    let Some(target) = declaration_target_of(set, decl_token) else {
        return Vec::new();
    };

    let mut paths: Vec<&String> = modules.iter().collect();
    paths.sort();

    let mut out = Vec::new();
    for path in paths {
        let Some(module) = set.module(path) else { continue };
        let candidates = collect_candidates(path, module, &set.modules, &set.record_map);
        let mut matches: Vec<Token> = candidates
            .into_iter()
            .filter(|c| c.target == target)
            .map(|c| c.token)
            .collect();
        matches.sort_by_key(|t| t.position.offset());
        out.extend(matches);
    }
    out
}

/// Identifies which declaration `token` names, by checking whether it
/// is (the name token of) a record, method, or constant declared in its
/// own module.
fn declaration_target_of(set: &ModuleSet, token: &Token) -> Option<Target> {
    let module = set.module(token.module_path())?;
    for (name, decl) in module.name_to_declaration.iter() {
        match decl {
            Declaration::Record(key) if key == &RecordKey::new(token.module_path(), token.position.offset()) => {
                return Some(Target::Record(key.clone()));
            }
            Declaration::Method(m) if m.name == *token => {
                return Some(Target::Method {
                    module_path: module.module_path.clone(),
                    name: name.to_string(),
                });
            }
            Declaration::Constant(c) if c.name == *token => {
                return Some(Target::Constant {
                    module_path: module.module_path.clone(),
                    name: name.to_string(),
                });
            }
            _ => {}
        }
    }
    // Not a top-level declaration name; maybe a field or nested record.
    for key in &module.records {
        if let Some(record) = set.record_map.get(key) {
            if record.name.position == token.position && record.name.module_path() == token.module_path() {
                return Some(Target::Record(key.clone()));
            }
            for field in &record.fields {
                if field.name == *token {
                    return Some(Target::Field {
                        record: key.clone(),
                        field_name: field.name.text.clone(),
                    });
                }
            }
        }
    }
    None
}

fn collect_candidates(
    module_path: &str,
    module: &ModuleResult,
    modules: &HashMap<String, ModuleResult>,
    record_map: &HashMap<RecordKey, Record>,
) -> Vec<Candidate> {
    let mut out = Vec::new();

    for (name, decl) in module.name_to_declaration.iter() {
        match decl {
            Declaration::Record(key) => {
                if let Some(record) = record_map.get(key) {
                    out.push(Candidate {
                        token: record.name.clone(),
                        target: Target::Record(key.clone()),
                    });
                }
            }
            Declaration::Method(m) => out.push(Candidate {
                token: m.name.clone(),
                target: Target::Method {
                    module_path: module_path.to_string(),
                    name: name.to_string(),
                },
            }),
            Declaration::Constant(c) => out.push(Candidate {
                token: c.name.clone(),
                target: Target::Constant {
                    module_path: module_path.to_string(),
                    name: name.to_string(),
                },
            }),
            Declaration::Import { module_path: target, .. } | Declaration::ImportAlias { module_path: target, .. } => {
                out.push(Candidate {
                    token: decl_name_token(decl),
                    target: Target::Module(target.clone()),
                });
            }
        }
    }

    for decl in &module.parsed.declarations {
        match decl {
            Decl::ImportAlias(d) => out.push(Candidate {
                token: d.path_literal.clone(),
                target: Target::Module(resolved_import_target(module, &d.alias.text)),
            }),
            Decl::Import(d) => out.push(Candidate {
                token: d.path_literal.clone(),
                target: Target::Module(resolved_import_target(module, &d.name.text)),
            }),
            Decl::Record(r) => walk_record(module_path, r, &[], modules, record_map, &mut out),
            Decl::Method(m) => {
                walk_type_expr(&m.request, &mut out, modules, record_map, module_path);
                walk_type_expr(&m.response, &mut out, modules, record_map, module_path);
                if let Some(doc) = &m.doc {
                    // Request-type scope before response-type scope,
                    // ahead of the module scope (mirrors `doc_refs`).
                    let mut leading = Vec::new();
                    leading.extend(named_type_record(modules, record_map, module_path, &m.request));
                    leading.extend(named_type_record(modules, record_map, module_path, &m.response));
                    walk_doc_pieces(doc, &mut out, modules, record_map, &leading, &[]);
                }
            }
            Decl::Const(c) => {
                walk_type_expr(&c.type_expr, &mut out, modules, record_map, module_path);
                if let Some(doc) = &c.doc {
                    walk_doc_pieces(doc, &mut out, modules, record_map, &[], &[]);
                }
            }
        }
    }

    out
}

fn decl_name_token(decl: &Declaration) -> Token {
    match decl {
        Declaration::Record(_) => unreachable!("handled separately"),
        Declaration::Method(m) => m.name.clone(),
        Declaration::Constant(c) => c.name.clone(),
        Declaration::Import { name, .. } | Declaration::ImportAlias { name, .. } => name.clone(),
    }
}

fn resolved_import_target(module: &ModuleResult, local_name: &str) -> String {
    match module.name_to_declaration.get(local_name) {
        Some(Declaration::Import { module_path, .. } | Declaration::ImportAlias { module_path, .. }) => {
            module_path.clone()
        }
        _ => String::new(),
    }
}

fn walk_record(
    module_path: &str,
    decl: &ast::RecordDecl,
    ancestors: &[RecordKey],
    modules: &HashMap<String, ModuleResult>,
    record_map: &HashMap<RecordKey, Record>,
    out: &mut Vec<Candidate>,
) {
    let key = RecordKey::new(module_path, decl.name.position.offset());
    let mut chain = ancestors.to_vec();
    chain.push(key.clone());

    if let Some(doc) = &decl.doc {
        walk_doc_pieces(doc, out, modules, record_map, &[], ancestors);
    }

    for member in &decl.members {
        match member {
            Member::Field(f) => {
                if let Some(te) = &f.type_expr {
                    walk_type_expr(te, out, modules, record_map, module_path);
                }
                if let Some(doc) = &f.doc {
                    let leading = field_type_record(record_map, &key, &f.name.text)
                        .into_iter()
                        .collect::<Vec<_>>();
                    // Self first, then enclosing records innermost-out
                    // (mirrors `doc_refs::resolve_doc_with_extra_scope`).
                    let mut doc_ancestors = vec![key.clone()];
                    doc_ancestors.extend(ancestors.iter().rev().cloned());
                    walk_doc_pieces(doc, out, modules, record_map, &leading, &doc_ancestors);
                }
            }
            Member::Nested(nested) => walk_record(module_path, nested, &chain, modules, record_map, out),
            Member::Removed(_) => {}
        }
    }
}

fn field_type_record(record_map: &HashMap<RecordKey, Record>, key: &RecordKey, field_name: &str) -> Option<RecordKey> {
    let record = record_map.get(key)?;
    let field = record.field_by_name(field_name)?;
    field.ty.record_key().cloned()
}

fn walk_type_expr(
    te: &TypeExpr,
    out: &mut Vec<Candidate>,
    modules: &HashMap<String, ModuleResult>,
    record_map: &HashMap<RecordKey, Record>,
    module_path: &str,
) {
    match te {
        TypeExpr::Named(qn) => {
            let mut prefix: Vec<String> = Vec::with_capacity(qn.parts.len());
            for part in &qn.parts {
                prefix.push(part.text.clone());
                if let Some(key) = resolve_type_qualified(modules, record_map, module_path, &prefix) {
                    out.push(Candidate {
                        token: part.clone(),
                        target: Target::Record(key),
                    });
                }
            }
        }
        TypeExpr::Array { item, .. } => walk_type_expr(item, out, modules, record_map, module_path),
        TypeExpr::Optional(inner) => walk_type_expr(inner, out, modules, record_map, module_path),
        TypeExpr::InlineRecord(r) => walk_record(module_path, r, &[], modules, record_map, out),
    }
}

/// Resolves a dotted type reference (`Outer.User`, or through an
/// import/alias into another module) to the `RecordKey` it names.
fn resolve_type_qualified(
    modules: &HashMap<String, ModuleResult>,
    record_map: &HashMap<RecordKey, Record>,
    module_path: &str,
    parts: &[String],
) -> Option<RecordKey> {
    let module = modules.get(module_path)?;
    let first = parts.first()?;
    match module.name_to_declaration.get(first)? {
        Declaration::Record(key) => descend_nested(record_map, key, &parts[1..]),
        Declaration::Import { module_path: target, .. } => resolve_type_qualified(modules, record_map, target, parts),
        Declaration::ImportAlias { module_path: target, .. } => {
            resolve_type_qualified(modules, record_map, target, &parts[1..])
        }
        Declaration::Method(_) | Declaration::Constant(_) => None,
    }
}

fn named_type_record(
    modules: &HashMap<String, ModuleResult>,
    record_map: &HashMap<RecordKey, Record>,
    module_path: &str,
    type_expr: &TypeExpr,
) -> Option<RecordKey> {
    match type_expr {
        TypeExpr::Named(name) if name.parts.len() == 1 => {
            resolve_type_qualified(modules, record_map, module_path, &[name.parts[0].text.clone()])
        }
        TypeExpr::Optional(inner) => named_type_record(modules, record_map, module_path, inner),
        _ => None,
    }
}

fn descend_nested(record_map: &HashMap<RecordKey, Record>, key: &RecordKey, rest: &[String]) -> Option<RecordKey> {
    if rest.is_empty() {
        return Some(key.clone());
    }
    let record = record_map.get(key)?;
    let next = record.nested.get(&rest[0])?;
    descend_nested(record_map, next, &rest[1..])
}

/// Mirrors `doc_refs`'s scope-priority resolution (leading scopes, then
/// the enclosing-record chain innermost first, then the module), but
/// captures the resolved `Target` instead of just success/failure.
fn walk_doc_pieces(
    doc: &Doc,
    out: &mut Vec<Candidate>,
    modules: &HashMap<String, ModuleResult>,
    record_map: &HashMap<RecordKey, Record>,
    leading: &[RecordKey],
    ancestors: &[RecordKey],
) {
    for piece in &doc.pieces {
        let DocPiece::Reference(reference) = piece else { continue };
        let module_path = reference.token.module_path();
        let scopes: Vec<&RecordKey> = leading.iter().chain(ancestors.iter()).collect();
        let mut target = None;
        for key in &scopes {
            if let Some(t) = resolve_in_record(record_map, key, &reference.parts) {
                target = Some(t);
                break;
            }
        }
        if target.is_none() {
            target = resolve_in_module(modules, record_map, module_path, &reference.parts);
        }
        if let Some(target) = target {
            out.push(Candidate {
                token: reference.token.clone(),
                target,
            });
        }
    }
}

fn resolve_in_module(
    modules: &HashMap<String, ModuleResult>,
    record_map: &HashMap<RecordKey, Record>,
    module_path: &str,
    parts: &[String],
) -> Option<Target> {
    let module = modules.get(module_path)?;
    let first = parts.first()?;
    match module.name_to_declaration.get(first)? {
        Declaration::Record(key) => resolve_rest_in_record(record_map, key, &parts[1..]),
        Declaration::Method(_) if parts.len() == 1 => Some(Target::Method {
            module_path: module_path.to_string(),
            name: first.clone(),
        }),
        Declaration::Constant(_) if parts.len() == 1 => Some(Target::Constant {
            module_path: module_path.to_string(),
            name: first.clone(),
        }),
        Declaration::Import { module_path: target, .. } => resolve_in_module(modules, record_map, target, parts),
        Declaration::ImportAlias { module_path: target, .. } => {
            resolve_in_module(modules, record_map, target, &parts[1..])
        }
        _ => None,
    }
}

fn resolve_in_record(record_map: &HashMap<RecordKey, Record>, key: &RecordKey, parts: &[String]) -> Option<Target> {
    let first = parts.first()?;
    let record = record_map.get(key)?;
    if record.field_by_name(first).is_some() {
        return if parts.len() == 1 {
            Some(Target::Field {
                record: key.clone(),
                field_name: first.clone(),
            })
        } else {
            descend_field(record_map, record, first, &parts[1..])
        };
    }
    if let Some(nested_key) = record.nested.get(first) {
        return resolve_rest_in_record(record_map, nested_key, &parts[1..]);
    }
    None
}

fn descend_field(
    record_map: &HashMap<RecordKey, Record>,
    record: &Record,
    field_name: &str,
    rest: &[String],
) -> Option<Target> {
    let field = record.field_by_name(field_name)?;
    let key = field.ty.record_key()?;
    resolve_rest_in_record(record_map, key, rest)
}

fn resolve_rest_in_record(record_map: &HashMap<RecordKey, Record>, key: &RecordKey, rest: &[String]) -> Option<Target> {
    if rest.is_empty() {
        return Some(Target::Record(key.clone()));
    }
    resolve_in_record(record_map, key, rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_set::compile;
    use std::collections::HashMap as Map;

    #[test]
    fn finds_definition_of_field_type_reference() {
        let mut sources = Map::new();
        sources.insert(
            "m.skir".to_string(),
            "struct User { id: string; }\nstruct Group { owner: User; }\n".to_string(),
        );
        let set = compile(&sources);
        assert!(set.is_ok(), "{:?}", set.all_errors());

        let src = &sources["m.skir"];
        let owner_type_pos = src.find("User;").unwrap();
        let found = find_definition(&set, "m.skir", owner_type_pos).expect("should resolve");
        assert!(matches!(found.target, Target::Record(_)));
        assert_eq!(found.hovered_token.text, "User");
    }

    #[test]
    fn finds_references_to_a_record() {
        let mut sources = Map::new();
        sources.insert(
            "m.skir".to_string(),
            "struct User { id: string; }\nstruct A { u: User; }\nstruct B { u: User; }\n".to_string(),
        );
        let set = compile(&sources);
        assert!(set.is_ok(), "{:?}", set.all_errors());

        let Declaration::Record(key) = set.module("m.skir").unwrap().name_to_declaration.get("User").unwrap()
        else {
            panic!()
        };
        let record = set.record(key).unwrap();
        let decl_token = record.name.clone();
        let refs = find_references(&set, &decl_token, &["m.skir".to_string()]);
        assert_eq!(refs.len(), 2, "{refs:?}");
    }
}
