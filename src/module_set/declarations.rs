//! Declaration pass (§4.3): walks one module's syntactic AST and
//! produces its name scope plus a skeleton `Record` (key, kind, name,
//! number, nested map) for every struct/enum the module declares —
//! including records synthesized from inline types and `method`
//! request/response shorthand. Field types are filled in later by
//! [`super::type_resolve`], once the whole import graph is available.

use std::collections::{HashMap, HashSet};

use crate::ast::{self, Decl, Member, ParsedModule, RecordKind as AstRecordKind, TypeExpr};
use crate::error::{ErrorKind, SkirError};
use crate::resolved::{Record, RecordKey, RecordKind};
use crate::token::Token;

use super::casing::to_upper_camel;
use super::paths::{self, PathError};
use super::NameScope;

pub struct DeclResult {
    pub name_scope: NameScope,
    /// All record keys declared directly or nested within this module,
    /// top-level declaration order first, depth-first within each.
    pub records: Vec<RecordKey>,
    /// The skeleton `Record` for each key above, in the same order;
    /// the caller merges these into the shared `ModuleSet::record_map`.
    pub record_skeletons: Vec<Record>,
    /// Local import name -> resolved target module path, for the
    /// unused-import pass and as the dependency edges the compiler
    /// walks before resolving this module's own types.
    pub imports: Vec<ImportEdge>,
    /// Keys of the request/response records synthesized for a method
    /// whose request/response type was written inline, by method name.
    pub synthesized_method_records: HashMap<String, (Option<RecordKey>, Option<RecordKey>)>,
    pub errors: Vec<SkirError>,
}

pub struct ImportEdge {
    pub local_name: Token,
    pub target_module: String,
    /// `true` for `import * as X`, `false` for `import X from "..."`.
    pub is_alias: bool,
}

pub fn run(module_path: &str, parsed: &ParsedModule) -> DeclResult {
    let mut ctx = Ctx {
        module_path: module_path.to_string(),
        name_scope: NameScope::default(),
        records: Vec::new(),
        record_skeletons: Vec::new(),
        imports: Vec::new(),
        synthesized_method_records: HashMap::new(),
        aliased_modules: HashMap::new(),
        errors: Vec::new(),
    };
    for decl in &parsed.declarations {
        ctx.visit_top_level(decl);
    }
    // §4.3: synthesized method request/response records are injected
    // into name scope only after every user declaration has claimed
    // its name, so a user's own `struct FooRequest {}` always wins.
    ctx.inject_synthesized_method_names(parsed);
    DeclResult {
        name_scope: ctx.name_scope,
        records: ctx.records,
        record_skeletons: ctx.record_skeletons,
        imports: ctx.imports,
        synthesized_method_records: ctx.synthesized_method_records,
        errors: ctx.errors,
    }
}

struct Ctx {
    module_path: String,
    name_scope: NameScope,
    records: Vec<RecordKey>,
    record_skeletons: Vec<Record>,
    imports: Vec<ImportEdge>,
    synthesized_method_records: HashMap<String, (Option<RecordKey>, Option<RecordKey>)>,
    /// Target module path -> alias name, for the first `import * as X`
    /// statement seen for that module (§4.3 "Import kinds").
    aliased_modules: HashMap<String, String>,
    errors: Vec<SkirError>,
}

impl Ctx {
    fn visit_top_level(&mut self, decl: &Decl) {
        match decl {
            Decl::ImportAlias(d) => {
                let target = self.resolve_literal_path(&d.path_literal, &d.path);
                if let Some(target) = target {
                    if let Some(existing_alias) = self.aliased_modules.get(&target) {
                        if existing_alias != &d.alias.text {
                            self.errors.push(SkirError::new(
                                d.alias.clone(),
                                ErrorKind::ModuleAlreadyImportedWithDifferentAlias,
                            ));
                        }
                    } else {
                        self.aliased_modules.insert(target.clone(), d.alias.text.clone());
                    }
                    let declared = crate::resolved::Declaration::ImportAlias {
                        name: d.alias.clone(),
                        module_path: target.clone(),
                    };
                    self.declare(&d.alias, declared);
                    self.imports.push(ImportEdge {
                        local_name: d.alias.clone(),
                        target_module: target,
                        is_alias: true,
                    });
                }
            }
            Decl::Import(d) => {
                let target = self.resolve_literal_path(&d.path_literal, &d.path);
                if let Some(target) = target {
                    if self.aliased_modules.contains_key(&target) {
                        self.errors.push(SkirError::new(
                            d.name.clone(),
                            ErrorKind::ModuleAlreadyImportedWithAlias,
                        ));
                    }
                    let declared = crate::resolved::Declaration::Import {
                        name: d.name.clone(),
                        module_path: target.clone(),
                    };
                    self.declare(&d.name, declared);
                    self.imports.push(ImportEdge {
                        local_name: d.name.clone(),
                        target_module: target,
                        is_alias: false,
                    });
                }
            }
            Decl::Record(r) => {
                let key = self.declare_record(r, None);
                self.declare(&r.name, crate::resolved::Declaration::Record(key));
            }
            Decl::Method(m) => {
                let request_key = self.synthesize_method_record(m, true);
                let response_key = self.synthesize_method_record(m, false);
                self.synthesized_method_records
                    .insert(m.name.text.clone(), (request_key, response_key));
                // The fully resolved `Method` (with its `ResolvedType`s)
                // is built in the type-resolution pass; here we only
                // reserve the synthesized request/response records and
                // leave the method's own name-scope slot to be filled
                // in there, so forward references within this module's
                // const/method declarations still see it registered.
                self.name_scope.reserve(m.name.text.clone());
            }
            Decl::Const(_) => {
                // Constants, like methods, get their name-scope entry
                // once their type is resolved; reserve the slot now so
                // declaration order and duplicate-name checks see it.
            }
        }
    }

    fn resolve_literal_path(&mut self, literal: &Token, raw: &str) -> Option<String> {
        match paths::resolve_import_path(&self.module_path, raw) {
            Ok(resolved) => Some(resolved),
            Err(PathError::BackslashInPath) => {
                self.errors.push(SkirError::new(
                    literal.clone(),
                    ErrorKind::ReplaceBackslashWithSlash,
                ));
                None
            }
            Err(PathError::EscapesRoot) => {
                self.errors
                    .push(SkirError::new(literal.clone(), ErrorKind::ModulePathEscapesRoot));
                None
            }
        }
    }

    fn declare(&mut self, name: &Token, declaration: crate::resolved::Declaration) {
        if !self.name_scope.insert(name.text.clone(), declaration) {
            self.errors.push(SkirError::new(
                name.clone(),
                ErrorKind::DuplicateDeclarationName {
                    name: name.text.clone(),
                },
            ));
        }
    }

    /// Builds the skeleton `Record` for a (possibly nested) record
    /// declaration and every record nested within it, returning the
    /// key assigned to `decl` itself. `parent_key` is `Some` for a
    /// record nested inside another record (used only to decide
    /// whether `decl.name` participates in the *enclosing* record's
    /// `nested` map, done by the caller).
    fn declare_record(&mut self, decl: &ast::RecordDecl, _parent_key: Option<&RecordKey>) -> RecordKey {
        let key = RecordKey::new(&self.module_path, decl.name.position.offset());
        let kind = match decl.kind {
            AstRecordKind::Struct => RecordKind::Struct,
            AstRecordKind::Enum => RecordKind::Enum,
        };
        let number = decl
            .number
            .as_ref()
            .and_then(|t| t.text.parse::<u32>().ok());

        let mut nested = std::collections::BTreeMap::new();
        let mut seen_field_names: HashSet<String> = HashSet::new();
        for member in &decl.members {
            match member {
                Member::Nested(nested_decl) => {
                    let nested_key = self.declare_record(nested_decl, Some(&key));
                    nested.insert(nested_decl.name.text.clone(), nested_key);
                }
                Member::Field(f) => {
                    if !seen_field_names.insert(f.name.text.clone()) {
                        self.errors.push(SkirError::new(
                            f.name.clone(),
                            ErrorKind::DuplicateFieldName {
                                name: f.name.text.clone(),
                            },
                        ));
                    }
                    // An inline `struct { .. }`/`enum { .. }` field type
                    // is lifted into a synthesized nested record named
                    // after the field, UpperCamel-cased (§4.3).
                    if let Some(TypeExpr::InlineRecord(inline)) = &f.type_expr {
                        let synthesized_name = to_upper_camel(&f.name.text);
                        let nested_key = self.declare_inline_record(inline, &synthesized_name, &f.name, &f.name);
                        nested.insert(synthesized_name, nested_key);
                    }
                }
                Member::Removed(_) => {}
            }
        }

        let record = Record {
            key: key.clone(),
            kind,
            name: decl.name.clone(),
            number,
            fields: Vec::new(),
            removed_numbers: flatten_removed(decl),
            nested,
            num_slots: 0,
            num_slots_incl_removed: 0,
            doc: decl.doc.clone(),
            is_synthesized: false,
        };
        self.insert_record(record)
    }

    /// Like `declare_record`, but for a record synthesized from an
    /// inline type; it has no `name` token of its own in the source so
    /// we use the position of the field/method name that introduced it
    /// as the synthesized record's identity anchor (still unique: no
    /// two fields share a position). `source_name` is the token whose
    /// `original_text` the synthesized name is derived from (the field
    /// or method name) — kept distinct from `anchor` since a method's
    /// anchor is its inline record's opening brace, not its own name.
    fn declare_inline_record(
        &mut self,
        decl: &ast::RecordDecl,
        synthesized_name: &str,
        anchor: &Token,
        source_name: &Token,
    ) -> RecordKey {
        let key = RecordKey::new(&self.module_path, anchor.position.offset());
        let kind = match decl.kind {
            AstRecordKind::Struct => RecordKind::Struct,
            AstRecordKind::Enum => RecordKind::Enum,
        };

        let mut nested = std::collections::BTreeMap::new();
        for member in &decl.members {
            match member {
                Member::Nested(nested_decl) => {
                    let nested_key = self.declare_record(nested_decl, Some(&key));
                    nested.insert(nested_decl.name.text.clone(), nested_key);
                }
                Member::Field(f) => {
                    if let Some(TypeExpr::InlineRecord(inline)) = &f.type_expr {
                        let name = to_upper_camel(&f.name.text);
                        let nested_key = self.declare_inline_record(inline, &name, &f.name, &f.name);
                        nested.insert(name, nested_key);
                    }
                }
                Member::Removed(_) => {}
            }
        }

        let name = Token::new(
            anchor.kind,
            synthesized_name.to_string(),
            source_name.original_text.clone(),
            anchor.position,
            anchor.line.clone(),
        );
        let record = Record {
            key: key.clone(),
            kind,
            name,
            number: None,
            fields: Vec::new(),
            removed_numbers: flatten_removed(decl),
            nested,
            num_slots: 0,
            num_slots_incl_removed: 0,
            doc: None,
            is_synthesized: true,
        };
        self.insert_record(record)
    }

    /// `method Foo(Bar): Baz = N;` where `Bar`/`Baz` is an inline
    /// record synthesizes `FooRequest`/`FooResponse` (§4.3). When the
    /// request/response is a named type instead, no record is created
    /// here — `type_resolve` just resolves the name.
    fn synthesize_method_record(&mut self, method: &ast::MethodDecl, is_request: bool) -> Option<RecordKey> {
        let type_expr = if is_request { &method.request } else { &method.response };
        let TypeExpr::InlineRecord(inline) = type_expr else {
            return None;
        };
        let suffix = if is_request { "Request" } else { "Response" };
        let synthesized_name = format!("{}{}", method.name.text, suffix);
        // Anchor on the inline record's own opening brace, not the
        // method name: request and response can both be inline on the
        // same method, and each needs a distinct position to key on.
        let anchor = inline.brace_open.clone();
        let key = self.declare_inline_record(inline, &synthesized_name, &anchor, &method.name);
        Some(key)
    }

    /// Registers each method's synthesized `FooRequest`/`FooResponse`
    /// record under that name, after every user declaration in this
    /// module has already claimed its name (§4.3).
    fn inject_synthesized_method_names(&mut self, parsed: &ParsedModule) {
        for decl in &parsed.declarations {
            let Decl::Method(m) = decl else { continue };
            let Some((request_key, response_key)) =
                self.synthesized_method_records.get(&m.name.text).cloned()
            else {
                continue;
            };
            if let Some(key) = request_key {
                self.declare_synthesized_method_name(&m.name, "Request", key, parsed);
            }
            if let Some(key) = response_key {
                self.declare_synthesized_method_name(&m.name, "Response", key, parsed);
            }
        }
    }

    fn declare_synthesized_method_name(
        &mut self,
        method_name: &Token,
        suffix: &str,
        key: RecordKey,
        parsed: &ParsedModule,
    ) {
        let synthesized_name = format!("{}{}", method_name.text, suffix);
        if self
            .name_scope
            .insert(synthesized_name.clone(), crate::resolved::Declaration::Record(key))
        {
            return;
        }
        // The name is already taken by a real declaration; point the
        // error at that user declaration rather than at the method,
        // since the method never wrote `synthesized_name` itself.
        let existing = parsed
            .declarations
            .iter()
            .find(|d| d.name_token().text == synthesized_name)
            .map(|d| d.name_token().clone())
            .unwrap_or_else(|| method_name.clone());
        self.errors.push(SkirError::new(
            existing,
            ErrorKind::DuplicateDeclarationName {
                name: synthesized_name,
            },
        ));
    }

    fn insert_record(&mut self, record: Record) -> RecordKey {
        let key = record.key.clone();
        self.records.push(key.clone());
        self.record_skeletons.push(record);
        key
    }
}

fn flatten_removed(decl: &ast::RecordDecl) -> Vec<u32> {
    let mut out = Vec::new();
    for member in &decl.members {
        if let Member::Removed(r) = member {
            for (start, end) in &r.ranges {
                out.extend(*start..=*end);
            }
        }
    }
    out
}

/// Assigns slot numbers to a record's fields in declaration order,
/// honoring explicit `= N` numbers, skipping numbers already reserved
/// by `removed`, and defaulting the first struct field / first enum
/// variant to the well-known `UNKNOWN = 0` convention only when slot 0
/// is otherwise free (§4.3 "Field numbering").
pub fn next_implicit_number(used: &HashSet<u32>, removed: &[u32]) -> u32 {
    let mut n = 0u32;
    loop {
        if !used.contains(&n) && !removed.contains(&n) {
            return n;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_module, Mode};

    fn declare(source: &str) -> DeclResult {
        let (parsed, _tokens) = parse_module("m.skir", source, Mode::Strict);
        run("m.skir", &parsed)
    }

    #[test]
    fn registers_top_level_record_name() {
        let result = declare("struct Foo { x: int32; }\n");
        assert!(result.name_scope.get("Foo").is_some());
        assert_eq!(result.records.len(), 1);
    }

    #[test]
    fn duplicate_top_level_name_is_reported() {
        let result = declare("struct Foo {}\nstruct Foo {}\n");
        assert_eq!(result.errors.len(), 1);
        assert!(matches!(
            result.errors[0].kind,
            ErrorKind::DuplicateDeclarationName { .. }
        ));
    }

    #[test]
    fn nested_record_gets_its_own_key_and_parent_entry() {
        let result = declare("struct Outer {\n  struct Inner { x: int32; }\n}\n");
        assert_eq!(result.records.len(), 2);
    }

    #[test]
    fn inline_field_type_is_lifted_into_nested_record() {
        let result = declare("struct Outer {\n  shipping_address: struct { line1: string; };\n}\n");
        assert_eq!(result.records.len(), 2);
    }

    #[test]
    fn method_request_response_inline_types_are_synthesized() {
        let result = declare(
            "method CreateUser(struct { name: string; }): struct { id: string; } = 1;\n",
        );
        assert_eq!(result.records.len(), 2);
    }

    #[test]
    fn synthesized_method_records_are_resolvable_by_name() {
        let result = declare(
            "method CreateUser(struct { name: string; }): struct { id: string; } = 1;\n",
        );
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert!(matches!(
            result.name_scope.get("CreateUserRequest"),
            Some(crate::resolved::Declaration::Record(_))
        ));
        assert!(matches!(
            result.name_scope.get("CreateUserResponse"),
            Some(crate::resolved::Declaration::Record(_))
        ));
    }

    #[test]
    fn user_declared_name_wins_over_a_synthesized_method_record_name() {
        let result = declare(
            "struct CreateUserRequest {}\n\
             method CreateUser(struct { name: string; }): struct { id: string; } = 1;\n",
        );
        let error = result
            .errors
            .iter()
            .find(|e| matches!(e.kind, ErrorKind::DuplicateDeclarationName { .. }))
            .expect("expected a duplicate-name error");
        // Points at the user's own declaration, not at the method.
        assert_eq!(error.token.text, "CreateUserRequest");
        assert_eq!(error.token.line.line_number, 0);
        assert!(matches!(
            result.name_scope.get("CreateUserRequest"),
            Some(crate::resolved::Declaration::Record(_))
        ));
    }

    #[test]
    fn duplicate_field_name_within_struct_is_reported() {
        let result = declare("struct Foo { x: int32; x: string; }\n");
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e.kind, ErrorKind::DuplicateFieldName { .. })));
    }

    #[test]
    fn import_path_is_normalized_relative_to_module() {
        let result = declare("import Foo from \"./shared.skir\";\n");
        assert_eq!(result.imports.len(), 1);
        assert_eq!(result.imports[0].target_module, "shared.skir");
    }
}
