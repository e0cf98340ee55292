//! Cross-module name/type resolution (§4.3): turns the syntactic ASTs
//! produced by `parser` into the resolved declaration graph described
//! in §3, one `ModuleSet` per `compile()` call.
//!
//! Grounded in the teacher's top-level driver (`src/lib.rs`'s
//! `run_on_files`/`Checker`): a pure function over an in-memory set of
//! sources, a `HashMap`-backed cache keyed by path, and a stack used to
//! reject cycles before any pass assumes the dependency graph is a DAG.

pub mod casing;
pub mod constants;
pub mod declarations;
pub mod doc_refs;
pub mod keyed_array;
pub mod paths;
pub mod recursivity;
pub mod type_resolve;
pub mod uniqueness;

use std::collections::HashMap;

use crate::ast::ParsedModule;
use crate::error::{ErrorKind, SkirError};
use crate::parser::{parse_module, Mode};
use crate::resolved::{Declaration, Record, RecordKey};
use crate::token::Token;

/// Insertion-ordered name -> declaration scope (§3: "name_to_declaration
/// ... order preserved"), built as a parallel `Vec`+`HashMap` pair
/// rather than pulling in `indexmap`, which isn't part of the stack
/// this crate otherwise uses.
#[derive(Debug, Clone, Default)]
pub struct NameScope {
    order: Vec<String>,
    index: HashMap<String, usize>,
    values: Vec<Option<Declaration>>,
}

impl NameScope {
    /// Reserves `name`'s position in iteration order without a value
    /// yet (used for methods/constants, whose `Declaration` needs a
    /// resolved type not yet available during the declaration pass).
    /// Returns `false` (and reserves nothing) if the name is already
    /// taken.
    pub fn reserve(&mut self, name: String) -> bool {
        if self.index.contains_key(&name) {
            return false;
        }
        self.index.insert(name.clone(), self.order.len());
        self.order.push(name);
        self.values.push(None);
        true
    }

    /// Inserts `name` with an immediately-known `Declaration`. Returns
    /// `false` if the name is already taken (the existing entry is
    /// left untouched).
    pub fn insert(&mut self, name: String, declaration: Declaration) -> bool {
        if !self.reserve(name.clone()) {
            return false;
        }
        let idx = self.index[&name];
        self.values[idx] = Some(declaration);
        true
    }

    /// Fills a name reserved earlier via `reserve`. Panics if `name`
    /// was never reserved; that would be a bug in the calling pass.
    pub fn fill(&mut self, name: &str, declaration: Declaration) {
        let idx = self.index[name];
        self.values[idx] = Some(declaration);
    }

    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.index
            .get(name)
            .and_then(|&idx| self.values[idx].as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Declaration)> {
        self.order
            .iter()
            .zip(self.values.iter())
            .filter_map(|(name, value)| value.as_ref().map(|v| (name.as_str(), v)))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }
}

pub struct ModuleResult {
    pub module_path: String,
    pub parsed: ParsedModule,
    pub name_to_declaration: NameScope,
    /// All records declared in this module, including nested and
    /// synthesized ones, in declaration order.
    pub records: Vec<RecordKey>,
    pub errors: Vec<SkirError>,
}

impl ModuleResult {
    pub fn doc_for(&self, name: &str) -> Option<&crate::doc_comment::Doc> {
        match self.name_to_declaration.get(name)? {
            Declaration::Constant(c) => c.doc.as_ref(),
            Declaration::Method(m) => m.doc.as_ref(),
            _ => None,
        }
    }
}

/// The output of `compile()`: every module's resolved declarations plus
/// the shared record arena, and every diagnostic collected across every
/// pass and every module (§3, §7: `compile()` never returns `Err`).
pub struct ModuleSet {
    pub modules: HashMap<String, ModuleResult>,
    pub record_map: HashMap<RecordKey, Record>,
}

impl ModuleSet {
    pub fn record(&self, key: &RecordKey) -> Option<&Record> {
        self.record_map.get(key)
    }

    pub fn module(&self, path: &str) -> Option<&ModuleResult> {
        self.modules.get(path)
    }

    /// All diagnostics across every module, in module-path order for a
    /// deterministic report.
    pub fn all_errors(&self) -> Vec<&SkirError> {
        let mut paths: Vec<&String> = self.modules.keys().collect();
        paths.sort();
        paths
            .into_iter()
            .flat_map(|p| self.modules[p].errors.iter())
            .collect()
    }

    pub fn is_ok(&self) -> bool {
        self.all_errors().is_empty()
    }

    /// `true` if no modules were compiled at all (an empty `sources`
    /// map), distinct from a non-empty set that happens to be error-free.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Diagnostics across every module, in the same deterministic
    /// module-path order as `all_errors`, without collecting into a
    /// `Vec` first.
    pub fn iter_errors(&self) -> impl Iterator<Item = &SkirError> {
        let mut paths: Vec<&String> = self.modules.keys().collect();
        paths.sort();
        paths.into_iter().flat_map(|p| self.modules[p].errors.iter())
    }

    /// Merges another `ModuleSet`'s modules and records into this one,
    /// re-resolving nothing (§9 "mergeFrom equivalence": the result of
    /// merging two independently-compiled sets with disjoint module
    /// paths is equivalent to compiling the union directly, since
    /// resolution never depends on modules outside a module's own
    /// import closure).
    pub fn merge_from(&mut self, other: ModuleSet) {
        self.modules.extend(other.modules);
        self.record_map.extend(other.record_map);
    }
}

/// Compiles every module in `sources` (module path -> source text) into
/// a `ModuleSet`. Pure: the same map always produces the same set, with
/// no filesystem access of its own (that lives in `glue`).
pub fn compile(sources: &HashMap<String, String>) -> ModuleSet {
    let mut compiler = Compiler {
        sources,
        resolving_stack: Vec::new(),
        set: ModuleSet {
            modules: HashMap::new(),
            record_map: HashMap::new(),
        },
    };
    let mut paths: Vec<&String> = sources.keys().collect();
    paths.sort();
    for path in paths {
        compiler.resolve_module(path);
    }
    // Recursivity is a property of the whole record graph, not of one
    // module in isolation (a field can recurse through a record
    // declared in a module resolved later), so it only runs once every
    // module has contributed its records (§4.3 "Recursivity
    // classification").
    recursivity::classify(&mut compiler.set.record_map);
    // Likewise a cross-module property (§4.3 "Stable identifiers"): a
    // record's or method's number only conflicts with another module's
    // once every module's declarations are visible.
    uniqueness::check(&mut compiler.set.modules, &compiler.set.record_map);
    compiler.set
}

struct Compiler<'a> {
    sources: &'a HashMap<String, String>,
    resolving_stack: Vec<String>,
    set: ModuleSet,
}

impl<'a> Compiler<'a> {
    fn resolve_module(&mut self, module_path: &str) {
        if self.set.modules.contains_key(module_path) {
            return;
        }
        let Some(source) = self.sources.get(module_path) else {
            return;
        };
        if self.resolving_stack.iter().any(|p| p == module_path) {
            // The module that closes the cycle reports it; its
            // dependents each see `ModuleNotFound`-free resolution of
            // a partially-built result rather than cascading the same
            // diagnostic through every module on the cycle.
            return;
        }
        self.resolving_stack.push(module_path.to_string());

        let (parsed, _tokens) = parse_module(module_path, source, Mode::Strict);
        let decl_result = declarations::run(module_path, &parsed);

        for import in &decl_result.imports {
            if self.sources.contains_key(&import.target_module) {
                self.resolve_module(&import.target_module);
            }
        }

        let mut name_scope = decl_result.name_scope;
        let mut errors = decl_result.errors;
        for record in decl_result.record_skeletons {
            self.set.record_map.insert(record.key.clone(), record);
        }

        let cycle = self.import_cycle_through(module_path, &decl_result.imports);
        if cycle {
            errors.push(SkirError::new(
                parsed
                    .declarations
                    .first()
                    .map(|d| d.name_token().clone())
                    .unwrap_or_else(|| eof_token(module_path, source)),
                ErrorKind::CircularDependency,
            ));
        }

        for import in &decl_result.imports {
            if !self.sources.contains_key(&import.target_module) {
                errors.push(SkirError::new(
                    import.local_name.clone(),
                    ErrorKind::ModuleNotFound {
                        path: import.target_module.clone(),
                    },
                ));
            }
        }

        let mut used_imports: std::collections::HashSet<String> = std::collections::HashSet::new();
        type_resolve::resolve_module(
            module_path,
            &parsed,
            &decl_result.synthesized_method_records,
            &mut name_scope,
            &mut self.set.record_map,
            &self.set.modules,
            &mut used_imports,
            &mut errors,
        );

        doc_refs::resolve_module(
            module_path,
            &parsed,
            &name_scope,
            &self.set.record_map,
            &mut used_imports,
            &mut errors,
        );

        for import in &decl_result.imports {
            if !used_imports.contains(&import.local_name.text) {
                let kind = if import.is_alias {
                    ErrorKind::UnusedImportAlias
                } else {
                    ErrorKind::UnusedImport
                };
                errors.push(SkirError::new(import.local_name.clone(), kind));
            }
        }

        self.resolving_stack.pop();
        self.set.modules.insert(
            module_path.to_string(),
            ModuleResult {
                module_path: module_path.to_string(),
                parsed,
                name_to_declaration: name_scope,
                records: decl_result.records,
                errors,
            },
        );
    }

    fn import_cycle_through(&self, module_path: &str, imports: &[declarations::ImportEdge]) -> bool {
        imports
            .iter()
            .any(|i| self.resolving_stack.iter().filter(|p| *p == &i.target_module).count() > 0)
    }
}

fn eof_token(module_path: &str, source: &str) -> Token {
    use crate::position::CodeLine;
    use crate::token::TokenKind;
    let lines = CodeLine::split(module_path, source);
    let last = lines.into_iter().last().unwrap_or(CodeLine {
        module_path: module_path.to_string(),
        line_number: 0,
        start_offset: 0,
        text: String::new(),
    });
    let offset = last.start_offset + last.text.len();
    Token::new(
        TokenKind::Eof,
        "",
        "",
        crate::position::Position(offset),
        std::rc::Rc::new(last),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_one(source: &str) -> ModuleSet {
        let mut sources = HashMap::new();
        sources.insert("m.skir".to_string(), source.to_string());
        compile(&sources)
    }

    #[test]
    fn compiles_single_module_without_errors() {
        let set = compile_one("struct Foo { x: int32; }\n");
        assert!(set.is_ok(), "{:?}", set.all_errors());
        assert!(set.module("m.skir").unwrap().name_to_declaration.get("Foo").is_some());
    }

    #[test]
    fn reports_module_not_found() {
        let set = compile_one("import Foo from \"missing.skir\";\n");
        assert!(set
            .all_errors()
            .iter()
            .any(|e| matches!(e.kind, ErrorKind::ModuleNotFound { .. })));
    }

    #[test]
    fn resolves_import_across_two_modules() {
        let mut sources = HashMap::new();
        sources.insert("a.skir".to_string(), "struct Foo { x: int32; }\n".to_string());
        sources.insert(
            "b.skir".to_string(),
            "import Foo from \"a.skir\";\nstruct Bar { f: Foo; }\n".to_string(),
        );
        let set = compile(&sources);
        assert!(set.is_ok(), "{:?}", set.all_errors());
    }

    #[test]
    fn detects_circular_dependency() {
        let mut sources = HashMap::new();
        sources.insert("a.skir".to_string(), "import X from \"b.skir\";\n".to_string());
        sources.insert("b.skir".to_string(), "import Y from \"a.skir\";\n".to_string());
        let set = compile(&sources);
        assert!(set
            .all_errors()
            .iter()
            .any(|e| matches!(e.kind, ErrorKind::CircularDependency)));
    }
}
