//! Cross-module uniqueness checks for record stable identifiers and
//! method numbers (§4.3 "Stable identifiers"). Unlike per-module field
//! slot numbers (enforced inline by [`super::type_resolve`]), these two
//! scopes span every module in the `ModuleSet` and are partitioned by
//! *package*: two top-level records (or two methods) that share a
//! number conflict only when they also share a package, never across
//! packages (§8 scenario 2).
//!
//! §9's Open Question — whether method numbers are unique per package
//! or globally — is resolved here as per-package, the same partitioning
//! record numbers use; see `DESIGN.md` for the record of that decision.

use std::collections::HashMap;

use crate::error::{ErrorKind, SkirError};
use crate::resolved::{Declaration, Record, RecordKey};

use super::paths;
use super::ModuleResult;

/// Bucket key for the package-scoped uniqueness checks: the package
/// name if the module path is packaged, or `""` for every unpackaged
/// module (so two unpackaged modules still conflict with each other,
/// matching §8 scenario 2's "without the `@org/pkg/` prefix" case).
fn bucket_of(module_path: &str) -> String {
    paths::package_of(module_path).unwrap_or_default()
}

/// Runs both checks, appending any conflict to the offending module's
/// own `errors` (the *second*-seen declaration, in module-path then
/// declaration order, is the one reported — mirroring the per-module
/// slot-number check in `type_resolve`).
pub fn check(modules: &mut HashMap<String, ModuleResult>, record_map: &HashMap<RecordKey, Record>) {
    check_records(modules, record_map);
    check_methods(modules);
}

fn sorted_module_paths(modules: &HashMap<String, ModuleResult>) -> Vec<String> {
    let mut paths: Vec<String> = modules.keys().cloned().collect();
    paths.sort();
    paths
}

fn check_records(modules: &mut HashMap<String, ModuleResult>, record_map: &HashMap<RecordKey, Record>) {
    let paths = sorted_module_paths(modules);
    let mut seen: HashMap<(String, u32), (String, String)> = HashMap::new();
    let mut conflicts: Vec<(String, SkirError)> = Vec::new();

    for path in &paths {
        let module = &modules[path];
        let bucket = bucket_of(path);
        // Only *top-level* records participate: nested records and the
        // synthesized method request/response records never land in a
        // module's own `name_to_declaration`, so this naturally excludes
        // them (§4.3 "Stable identifiers" only discusses top-level
        // `Name(N)` declarations).
        for (name, decl) in module.name_to_declaration.iter() {
            let Declaration::Record(key) = decl else { continue };
            let Some(record) = record_map.get(key) else { continue };
            let Some(number) = record.number else { continue };
            let entry_key = (bucket.clone(), number);
            match seen.get(&entry_key) {
                Some((other_path, other_name)) => {
                    conflicts.push((
                        path.clone(),
                        SkirError::new(
                            record.name.clone(),
                            ErrorKind::SameNumberAs {
                                other_name: other_name.clone(),
                                other_path: other_path.clone(),
                            },
                        ),
                    ));
                }
                None => {
                    seen.insert(entry_key, (path.clone(), name.to_string()));
                }
            }
        }
    }

    for (path, error) in conflicts {
        if let Some(module) = modules.get_mut(&path) {
            module.errors.push(error);
        }
    }
}

fn check_methods(modules: &mut HashMap<String, ModuleResult>) {
    let paths = sorted_module_paths(modules);
    let mut seen: HashMap<(String, u32), (String, String)> = HashMap::new();
    let mut conflicts: Vec<(String, SkirError)> = Vec::new();

    for path in &paths {
        let module = &modules[path];
        let bucket = bucket_of(path);
        for (name, decl) in module.name_to_declaration.iter() {
            let Declaration::Method(method) = decl else { continue };
            let entry_key = (bucket.clone(), method.number);
            match seen.get(&entry_key) {
                Some((other_path, other_name)) => {
                    conflicts.push((
                        path.clone(),
                        SkirError::new(
                            method.name.clone(),
                            ErrorKind::SameNumberAs {
                                other_name: other_name.clone(),
                                other_path: other_path.clone(),
                            },
                        ),
                    ));
                }
                None => {
                    seen.insert(entry_key, (path.clone(), name.to_string()));
                }
            }
        }
    }

    for (path, error) in conflicts {
        if let Some(module) = modules.get_mut(&path) {
            module.errors.push(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_set::compile;

    #[test]
    fn same_number_in_different_packages_does_not_conflict() {
        let mut sources = HashMap::new();
        sources.insert("@org/a/m1.skir".to_string(), "struct Foo(100) {}\n".to_string());
        sources.insert("@org/b/m2.skir".to_string(), "struct Bar(100) {}\n".to_string());
        let set = compile(&sources);
        assert!(set.is_ok(), "{:?}", set.all_errors());
    }

    #[test]
    fn same_number_without_package_prefix_conflicts() {
        let mut sources = HashMap::new();
        sources.insert("a/m1.skir".to_string(), "struct Foo(100) {}\n".to_string());
        sources.insert("b/m2.skir".to_string(), "struct Bar(100) {}\n".to_string());
        let set = compile(&sources);
        assert!(set
            .all_errors()
            .iter()
            .any(|e| matches!(&e.kind, ErrorKind::SameNumberAs { other_name, .. } if other_name == "Foo")));
    }

    #[test]
    fn same_method_number_in_same_package_conflicts() {
        let mut sources = HashMap::new();
        sources.insert(
            "@org/a/m1.skir".to_string(),
            "struct Req {}\nstruct Res {}\nmethod DoA(Req): Res = 1;\n".to_string(),
        );
        sources.insert(
            "@org/a/m2.skir".to_string(),
            "struct Req {}\nstruct Res {}\nmethod DoB(Req): Res = 1;\n".to_string(),
        );
        let set = compile(&sources);
        assert!(set
            .all_errors()
            .iter()
            .any(|e| matches!(&e.kind, ErrorKind::SameNumberAs { other_name, .. } if other_name == "DoA")));
    }
}
