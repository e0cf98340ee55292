//! Name and type resolution (§4.3): turns `ast::TypeExpr`/
//! `ast::QualifiedName` into `resolved::ResolvedType`, fills in each
//! record's fields and numbering, and builds the `Method`/`Constant`
//! declarations that the declaration pass only reserved a name slot
//! for.
//!
//! Name resolution rule: the head identifier of a qualified name
//! resolves only against the *current* module's top-level scope.
//! Every dot-step after that either descends into a record's `nested`
//! map, or — when the head was an import/import-alias — switches into
//! the imported module's own top-level scope for exactly one step
//! before continuing to descend into `nested` maps from there. A
//! second hop through another module's imports is rejected
//! (`CannotReferToImportsOfImportedModule` /
//! `CannotReimportImportedRecord`): re-exporting is not transitive.

use std::collections::{HashMap, HashSet};

use crate::ast::{self, Decl, QualifiedName, TypeExpr};
use crate::error::{ErrorKind, SkirError};
use crate::resolved::{
    Constant, Declaration, Field, Method, Primitive, Record, RecordKey, ResolvedType,
};
use crate::token::Token;

use super::casing::CasingRule;
use super::declarations::next_implicit_number;
use super::{ModuleResult, NameScope};

pub fn resolve_module(
    module_path: &str,
    parsed: &ast::ParsedModule,
    synthesized_method_records: &HashMap<String, (Option<RecordKey>, Option<RecordKey>)>,
    name_scope: &mut NameScope,
    record_map: &mut HashMap<RecordKey, Record>,
    other_modules: &HashMap<String, ModuleResult>,
    used_imports: &mut HashSet<String>,
    errors: &mut Vec<SkirError>,
) {
    let mut ctx = Ctx {
        module_path,
        name_scope,
        record_map,
        other_modules,
        used_imports,
        errors,
    };

    for decl in &parsed.declarations {
        match decl {
            Decl::Record(r) => ctx.resolve_record(r),
            Decl::Method(m) => ctx.resolve_method(m, synthesized_method_records),
            Decl::Const(c) => ctx.resolve_const(c),
            Decl::ImportAlias(_) | Decl::Import(_) => {}
        }
    }
}

struct Ctx<'a> {
    module_path: &'a str,
    name_scope: &'a mut NameScope,
    record_map: &'a mut HashMap<RecordKey, Record>,
    other_modules: &'a HashMap<String, ModuleResult>,
    used_imports: &'a mut HashSet<String>,
    errors: &'a mut Vec<SkirError>,
}

impl<'a> Ctx<'a> {
    fn resolve_record(&mut self, decl: &ast::RecordDecl) {
        let key = RecordKey::new(self.module_path, decl.name.position.offset());
        if !CasingRule::UpperCamel.matches(&decl.name.text) {
            self.errors.push(SkirError::new(
                decl.name.clone(),
                ErrorKind::BadCasing {
                    expected: CasingRule::UpperCamel.describe().to_string(),
                },
            ));
        }
        self.resolve_record_body(&key, decl);
    }

    /// Resolves one record's direct fields/variants and recurses into
    /// its nested records. The record's skeleton (including its
    /// `nested` map, already populated by the declaration pass) must
    /// already be in `record_map` under `key`.
    fn resolve_record_body(&mut self, key: &RecordKey, decl: &ast::RecordDecl) {
        let nested = self
            .record_map
            .get(key)
            .map(|r| r.nested.clone())
            .unwrap_or_default();
        let removed_numbers = self
            .record_map
            .get(key)
            .map(|r| r.removed_numbers.clone())
            .unwrap_or_default();
        let kind = decl.kind;

        let mut fields = Vec::new();
        let mut used_numbers: HashSet<u32> = HashSet::new();
        let mut used_number_owner: HashMap<u32, Token> = HashMap::new();

        // An enum that doesn't itself claim slot 0 gets the implicit
        // `UNKNOWN = 0` variant prepended (§4.3 "Field numbering").
        if kind == ast::RecordKind::Enum && !decl_claims_zero(decl) {
            let unknown_token = Token::new(
                decl.name.kind,
                "UNKNOWN",
                "UNKNOWN",
                decl.name.position,
                decl.name.line.clone(),
            );
            used_numbers.insert(0);
            used_number_owner.insert(0, unknown_token.clone());
            fields.push(Field {
                name: unknown_token,
                number: 0,
                ty: ResolvedType::Null,
                is_kind_carrying_or_struct_field: false,
                is_recursive: crate::resolved::Recursivity::None,
                doc: None,
            });
        }

        for member in &decl.members {
            let ast::Member::Field(f) = member else {
                if let ast::Member::Nested(nested_decl) = member {
                    let nested_key = nested
                        .get(&nested_decl.name.text)
                        .cloned()
                        .unwrap_or_else(|| RecordKey::new(self.module_path, nested_decl.name.position.offset()));
                    self.resolve_record(nested_decl);
                    let _ = nested_key;
                }
                continue;
            };

            let casing = if f.type_expr.is_some() {
                CasingRule::LowerUnderscore
            } else {
                CasingRule::UpperUnderscore
            };
            if !casing.matches(&f.name.text) {
                self.errors.push(SkirError::new(
                    f.name.clone(),
                    ErrorKind::BadCasing {
                        expected: casing.describe().to_string(),
                    },
                ));
            }

            let ty = match &f.type_expr {
                Some(type_expr) => {
                    self.resolve_type_expr(type_expr, Some(&nested), &nested_name_for_field(f))
                }
                None => ResolvedType::Null,
            };

            let number = match &f.number {
                Some(tok) => {
                    let n: u32 = tok.text.parse().unwrap_or(0);
                    if !used_numbers.insert(n) || removed_numbers.contains(&n) {
                        self.errors.push(SkirError::new(
                            tok.clone(),
                            ErrorKind::SameNumberAs {
                                other_name: used_number_owner
                                    .get(&n)
                                    .map(|t| t.text.clone())
                                    .unwrap_or_default(),
                                other_path: self.module_path.to_string(),
                            },
                        ));
                    }
                    used_number_owner.insert(n, f.name.clone());
                    n
                }
                None => {
                    let n = next_implicit_number(&used_numbers, &removed_numbers);
                    used_numbers.insert(n);
                    used_number_owner.insert(n, f.name.clone());
                    n
                }
            };

            fields.push(Field {
                name: f.name.clone(),
                number,
                ty,
                is_kind_carrying_or_struct_field: f.type_expr.is_some() || kind == ast::RecordKind::Struct,
                is_recursive: crate::resolved::Recursivity::None,
                doc: f.doc.clone(),
            });
        }

        // §4.3 "Field numbering": a slot count is the highest number in
        // play plus one, not a count of fields — numbering need not be
        // dense, so `a = 0; b = 5;` has 6 slots, not 2.
        let highest_active = fields.iter().map(|f| f.number).max();
        let num_slots = highest_active.map_or(0, |n| n + 1);
        let highest_incl_removed = removed_numbers
            .iter()
            .copied()
            .chain(highest_active)
            .max();
        let num_slots_incl_removed = highest_incl_removed.map_or(0, |n| n + 1);

        if let Some(record) = self.record_map.get_mut(key) {
            record.fields = fields;
            record.num_slots = num_slots;
            record.num_slots_incl_removed = num_slots_incl_removed;
        }
    }

    fn resolve_method(
        &mut self,
        decl: &ast::MethodDecl,
        synthesized: &HashMap<String, (Option<RecordKey>, Option<RecordKey>)>,
    ) {
        if !CasingRule::UpperCamel.matches(&decl.name.text) {
            self.errors.push(SkirError::new(
                decl.name.clone(),
                ErrorKind::BadCasing {
                    expected: CasingRule::UpperCamel.describe().to_string(),
                },
            ));
        }
        let (request_key, response_key) = synthesized.get(&decl.name.text).cloned().unwrap_or((None, None));

        let request_type = match request_key {
            Some(key) => {
                if let TypeExpr::InlineRecord(inline) = &decl.request {
                    self.resolve_record_body(&key, inline);
                }
                ResolvedType::Record(key)
            }
            None => self.resolve_type_expr(&decl.request, None, ""),
        };
        let response_type = match response_key {
            Some(key) => {
                if let TypeExpr::InlineRecord(inline) = &decl.response {
                    self.resolve_record_body(&key, inline);
                }
                ResolvedType::Record(key)
            }
            None => self.resolve_type_expr(&decl.response, None, ""),
        };

        let number: u32 = decl.number.text.parse().unwrap_or(0);
        let method = Method {
            name: decl.name.clone(),
            number,
            request_type,
            response_type,
            doc: decl.doc.clone(),
        };
        self.name_scope.fill(&decl.name.text, Declaration::Method(method));
    }

    fn resolve_const(&mut self, decl: &ast::ConstDecl) {
        if !CasingRule::UpperUnderscore.matches(&decl.name.text) {
            self.errors.push(SkirError::new(
                decl.name.clone(),
                ErrorKind::BadCasing {
                    expected: CasingRule::UpperUnderscore.describe().to_string(),
                },
            ));
        }
        let ty = self.resolve_type_expr(&decl.type_expr, None, "");
        let dense_json = super::constants::encode(&decl.value, &ty, self.record_map, self.errors);
        let constant = Constant {
            name: decl.name.clone(),
            ty,
            value: std::rc::Rc::new(decl.value.clone()),
            value_as_dense_json: dense_json,
        };
        self.name_scope
            .fill(&decl.name.text, Declaration::Constant(constant));
    }

    /// Resolves a syntactic type expression to a `ResolvedType`.
    /// `enclosing_nested` is the nested-record map of the record this
    /// type expression lives directly inside (used to find a field's
    /// own `struct { .. }`/`enum { .. }` inline type, which the
    /// declaration pass already pre-registered under
    /// `synthesized_field_name`).
    fn resolve_type_expr(
        &mut self,
        type_expr: &TypeExpr,
        enclosing_nested: Option<&std::collections::BTreeMap<String, RecordKey>>,
        synthesized_field_name: &str,
    ) -> ResolvedType {
        match type_expr {
            TypeExpr::Named(name) => self.resolve_qualified_name(name),
            TypeExpr::Optional(inner) => {
                let resolved = self.resolve_type_expr(inner, enclosing_nested, synthesized_field_name);
                ResolvedType::Optional(Box::new(resolved))
            }
            TypeExpr::Array { item, key } => {
                let item_resolved = self.resolve_type_expr(item, enclosing_nested, synthesized_field_name);
                let keyed = key
                    .as_ref()
                    .and_then(|path| super::keyed_array::resolve(path, &item_resolved, self.record_map, self.errors));
                ResolvedType::Array {
                    item: Box::new(item_resolved),
                    key: keyed,
                }
            }
            TypeExpr::InlineRecord(_) => {
                let key = enclosing_nested
                    .and_then(|nested| nested.get(synthesized_field_name))
                    .cloned();
                match key {
                    Some(key) => ResolvedType::Record(key),
                    None => ResolvedType::Null,
                }
            }
        }
    }

    fn resolve_qualified_name(&mut self, name: &QualifiedName) -> ResolvedType {
        let head = &name.parts[0];
        if name.parts.len() == 1 && !name.leading_dot {
            if let Some(primitive) = Primitive::from_name(&head.text) {
                return ResolvedType::Primitive(primitive);
            }
        }

        let Some(declaration) = self.name_scope.get(&head.text).cloned() else {
            self.errors.push(SkirError::new(
                head.clone(),
                ErrorKind::CannotFindName {
                    name: head.text.clone(),
                    expected_names: self.expected_names(),
                },
            ));
            return ResolvedType::Null;
        };

        if matches!(
            declaration,
            Declaration::Import { .. } | Declaration::ImportAlias { .. }
        ) {
            self.used_imports.insert(head.text.clone());
        }
        self.descend(declaration, &name.parts[1..], head)
    }

    /// Follows the dot-steps in `rest` starting from `declaration`,
    /// which is whatever the head identifier resolved to.
    fn descend(&mut self, declaration: Declaration, rest: &[Token], head: &Token) -> ResolvedType {
        match declaration {
            Declaration::Record(key) => self.descend_into_record(key, rest),
            Declaration::ImportAlias { module_path, .. } => {
                let Some(first) = rest.first() else {
                    self.errors
                        .push(SkirError::new(head.clone(), ErrorKind::MustHaveStructType));
                    return ResolvedType::Null;
                };
                let Some(target_decl) = self
                    .other_modules
                    .get(&module_path)
                    .and_then(|m| m.name_to_declaration.get(&first.text))
                    .cloned()
                else {
                    self.errors.push(SkirError::new(
                        first.clone(),
                        ErrorKind::CannotFindName {
                            name: first.text.clone(),
                            expected_names: self.expected_names_in(&module_path),
                        },
                    ));
                    return ResolvedType::Null;
                };
                if matches!(target_decl, Declaration::Import { .. } | Declaration::ImportAlias { .. }) {
                    self.errors.push(SkirError::new(
                        first.clone(),
                        ErrorKind::CannotReferToImportsOfImportedModule,
                    ));
                    return ResolvedType::Null;
                }
                self.descend(target_decl, &rest[1..], first)
            }
            Declaration::Import { module_path, name } => {
                let Some(target_decl) = self
                    .other_modules
                    .get(&module_path)
                    .and_then(|m| m.name_to_declaration.get(&name.text))
                    .cloned()
                else {
                    self.errors.push(SkirError::new(
                        name.clone(),
                        ErrorKind::CannotFindName {
                            name: name.text.clone(),
                            expected_names: self.expected_names_in(&module_path),
                        },
                    ));
                    return ResolvedType::Null;
                };
                if matches!(target_decl, Declaration::Import { .. } | Declaration::ImportAlias { .. }) {
                    self.errors
                        .push(SkirError::new(name.clone(), ErrorKind::CannotReimportImportedRecord));
                    return ResolvedType::Null;
                }
                self.descend(target_decl, rest, &name)
            }
            Declaration::Method(_) | Declaration::Constant(_) => {
                self.errors
                    .push(SkirError::new(head.clone(), ErrorKind::NotARecord));
                ResolvedType::Null
            }
        }
    }

    fn descend_into_record(&mut self, key: RecordKey, rest: &[Token]) -> ResolvedType {
        let Some(step) = rest.first() else {
            return ResolvedType::Record(key);
        };
        let Some(record) = self.record_map.get(&key) else {
            return ResolvedType::Null;
        };
        let Some(nested_key) = record.nested.get(&step.text).cloned() else {
            self.errors.push(SkirError::new(
                step.clone(),
                ErrorKind::FieldNotFoundInStruct {
                    struct_name: record.name.text.clone(),
                    expected_names: record.nested.keys().cloned().collect(),
                },
            ));
            return ResolvedType::Null;
        };
        self.descend_into_record(nested_key, &rest[1..])
    }

    fn expected_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.name_scope.names().map(|s| s.to_string()).collect();
        names.sort();
        names.dedup();
        names
    }

    fn expected_names_in(&self, module_path: &str) -> Vec<String> {
        let Some(module) = self.other_modules.get(module_path) else {
            return Vec::new();
        };
        let mut names: Vec<String> = module.name_to_declaration.names().map(|s| s.to_string()).collect();
        names.sort();
        names.dedup();
        names
    }
}

/// True if some member of `decl` explicitly declares slot `0`, either
/// via `= 0` on a field/variant, or a `removed 0;`/`removed 0..N;`
/// placeholder.
fn decl_claims_zero(decl: &ast::RecordDecl) -> bool {
    decl.members.iter().any(|m| match m {
        ast::Member::Field(f) => f.number.as_ref().is_some_and(|t| t.text == "0"),
        ast::Member::Removed(r) => r.ranges.iter().any(|(start, _)| *start == 0),
        ast::Member::Nested(_) => false,
    })
}

fn nested_name_for_field(field: &ast::FieldDecl) -> String {
    super::casing::to_upper_camel(&field.name.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_set::compile;
    use std::collections::HashMap;

    fn compile_one(source: &str) -> crate::module_set::ModuleSet {
        let mut sources = HashMap::new();
        sources.insert("m.skir".to_string(), source.to_string());
        compile(&sources)
    }

    #[test]
    fn resolves_primitive_field_type() {
        let set = compile_one("struct Foo { x: int32; }\n");
        assert!(set.is_ok(), "{:?}", set.all_errors());
        let Declaration::Record(key) = set.module("m.skir").unwrap().name_to_declaration.get("Foo").unwrap() else {
            panic!()
        };
        let record = set.record(key).unwrap();
        assert_eq!(record.fields.len(), 1);
        assert!(matches!(record.fields[0].ty, ResolvedType::Primitive(Primitive::Int32)));
    }

    #[test]
    fn resolves_self_referential_record_field() {
        let set = compile_one("struct Node { next: Node?; }\n");
        assert!(set.is_ok(), "{:?}", set.all_errors());
    }

    #[test]
    fn reports_cannot_find_name_for_unknown_type() {
        let set = compile_one("struct Foo { x: Bogus; }\n");
        assert!(set
            .all_errors()
            .iter()
            .any(|e| matches!(e.kind, ErrorKind::CannotFindName { .. })));
    }

    #[test]
    fn assigns_implicit_sequential_field_numbers() {
        let set = compile_one("struct Foo { a: int32; b: int32; }\n");
        let Declaration::Record(key) = set.module("m.skir").unwrap().name_to_declaration.get("Foo").unwrap() else {
            panic!()
        };
        let record = set.record(key).unwrap();
        assert_eq!(record.fields[0].number, 0);
        assert_eq!(record.fields[1].number, 1);
    }

    #[test]
    fn num_slots_is_the_highest_number_plus_one_not_a_field_count() {
        let set = compile_one("struct Foo { a: int32 = 0; b: int32 = 5; }\n");
        assert!(set.is_ok(), "{:?}", set.all_errors());
        let Declaration::Record(key) = set.module("m.skir").unwrap().name_to_declaration.get("Foo").unwrap() else {
            panic!()
        };
        let record = set.record(key).unwrap();
        assert_eq!(record.num_slots, 6);
        assert_eq!(record.num_slots_incl_removed, 6);
    }

    #[test]
    fn num_slots_incl_removed_accounts_for_a_removed_number_past_the_highest_field() {
        let set = compile_one("struct Foo { a: int32; removed 5; }\n");
        assert!(set.is_ok(), "{:?}", set.all_errors());
        let Declaration::Record(key) = set.module("m.skir").unwrap().name_to_declaration.get("Foo").unwrap() else {
            panic!()
        };
        let record = set.record(key).unwrap();
        assert_eq!(record.num_slots, 1);
        assert_eq!(record.num_slots_incl_removed, 6);
    }

    #[test]
    fn rejects_bad_field_casing() {
        let set = compile_one("struct Foo { BadName: int32; }\n");
        assert!(set.all_errors().iter().any(|e| matches!(e.kind, ErrorKind::BadCasing { .. })));
    }

    #[test]
    fn resolves_import_alias_member_access() {
        let mut sources = HashMap::new();
        sources.insert("a.skir".to_string(), "struct Foo { x: int32; }\n".to_string());
        sources.insert(
            "b.skir".to_string(),
            "import * as A from \"a.skir\";\nstruct Bar { f: A.Foo; }\n".to_string(),
        );
        let set = compile(&sources);
        assert!(set.is_ok(), "{:?}", set.all_errors());
    }
}
