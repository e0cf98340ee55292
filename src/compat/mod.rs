//! Compatibility checker (§4.5): diffs two compiled `ModuleSet`s,
//! `before` and `after`, and reports every breaking change between
//! them.
//!
//! Grounded in the same "collect, never throw" shape as `module_set`'s
//! passes: a flat `Vec` of findings rather than a `Result`, since a
//! compatibility check that stops at the first difference would be
//! useless for a CLI meant to list everything at once.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::module_set::paths;
use crate::resolved::{Primitive, Record, RecordKey, RecordKind, ResolvedType};
use crate::token::Token;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakingChangeKind {
    RecordRemoved { record_name: String },
    KindChanged { record_name: String },
    FieldTypeChanged { record_name: String, field_name: String },
    FieldRemovedWithoutRemovedMarker { record_name: String, field_name: String },
    KeyedArrayKeyChanged { record_name: String, field_name: String },
    MethodRequestChanged { method_name: String },
    MethodResponseChanged { method_name: String },
}

impl BreakingChangeKind {
    pub fn description(&self) -> String {
        match self {
            BreakingChangeKind::RecordRemoved { record_name } => {
                format!("Record {record_name} was removed")
            }
            BreakingChangeKind::KindChanged { record_name } => {
                format!("Record {record_name} changed kind (struct/enum)")
            }
            BreakingChangeKind::FieldTypeChanged { record_name, field_name } => {
                format!("Field {record_name}.{field_name} changed type incompatibly")
            }
            BreakingChangeKind::FieldRemovedWithoutRemovedMarker { record_name, field_name } => {
                format!("Field {record_name}.{field_name} was removed without a `removed` marker")
            }
            BreakingChangeKind::KeyedArrayKeyChanged { record_name, field_name } => {
                format!("Field {record_name}.{field_name}'s keyed-array key changed")
            }
            BreakingChangeKind::MethodRequestChanged { method_name } => {
                format!("Method {method_name}'s request type changed")
            }
            BreakingChangeKind::MethodResponseChanged { method_name } => {
                format!("Method {method_name}'s response type changed")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct BreakingChange {
    pub token: Token,
    pub kind: BreakingChangeKind,
}

/// A record's cross-`ModuleSet` identity. Numbered top-level records
/// are identified by `(package, recordNumber)`, per §4.5. A record
/// without its own number — reachable only by nesting under a tracked
/// record, or referenced by a field type — has no wire-stable number of
/// its own, so it is identified by its qualified name within its
/// package instead; §9's "open questions" leaves the exact shape of
/// this secondary identity unspecified, and this is the resolution
/// recorded in `DESIGN.md`.
fn stable_id(module_path: &str, record: &Record) -> String {
    let package = paths::package_of(module_path).unwrap_or_default();
    match record.number {
        Some(n) => format!("{package}#{n}"),
        None => format!("{package}::{}", record.name.text),
    }
}

/// Seeds tracked identity at every numbered record, then propagates it
/// along every field/variant type edge (§4.5 "the set of tracked
/// records propagates transitively"). Returns a map from `RecordKey` to
/// stable id, covering exactly the tracked subgraph.
fn compute_tracked(record_map: &HashMap<RecordKey, Record>) -> HashMap<RecordKey, String> {
    let mut stable_ids = HashMap::new();
    let mut queue = VecDeque::new();

    for (key, record) in record_map {
        if record.number.is_some() {
            stable_ids.insert(key.clone(), stable_id(key.module_path(), record));
            queue.push_back(key.clone());
        }
    }

    while let Some(key) = queue.pop_front() {
        let Some(record) = record_map.get(&key) else { continue };
        for field in &record.fields {
            for reached in record_keys_in(&field.ty) {
                if !stable_ids.contains_key(reached) {
                    if let Some(reached_record) = record_map.get(reached) {
                        stable_ids.insert(reached.clone(), stable_id(reached.module_path(), reached_record));
                        queue.push_back(reached.clone());
                    }
                }
            }
        }
    }

    stable_ids
}

fn record_keys_in(ty: &ResolvedType) -> Vec<&RecordKey> {
    match ty {
        ResolvedType::Record(key) => vec![key],
        ResolvedType::Optional(inner) => record_keys_in(inner),
        ResolvedType::Array { item, .. } => record_keys_in(item),
        ResolvedType::Primitive(_) | ResolvedType::Null => Vec::new(),
    }
}

fn key_path_text(ty: &ResolvedType) -> Option<String> {
    match ty {
        ResolvedType::Array { key: Some(key), .. } => {
            Some(key.path.iter().map(|s| s.field_name.as_str()).collect::<Vec<_>>().join("."))
        }
        _ => None,
    }
}

/// Whether `after_ty` is a backward-compatible evolution of
/// `before_ty`: identical, numerically widened, or required-turned-
/// optional. `stable` maps both sets' `RecordKey`s to the shared
/// identity space computed by `compute_tracked`.
fn is_compatible_evolution(
    before_ty: &ResolvedType,
    after_ty: &ResolvedType,
    stable_before: &HashMap<RecordKey, String>,
    stable_after: &HashMap<RecordKey, String>,
) -> bool {
    match (before_ty, after_ty) {
        (ResolvedType::Optional(b), ResolvedType::Optional(a)) => {
            is_compatible_evolution(b, a, stable_before, stable_after)
        }
        // Required -> optional is explicitly allowed (§4.5).
        (b, ResolvedType::Optional(a)) if !matches!(b, ResolvedType::Optional(_)) => {
            is_compatible_evolution(b, a, stable_before, stable_after)
        }
        // Optional -> required is the breaking direction.
        (ResolvedType::Optional(_), a) if !matches!(a, ResolvedType::Optional(_)) => false,
        (ResolvedType::Primitive(b), ResolvedType::Primitive(a)) => {
            if b == a {
                return true;
            }
            match (b.numeric_family(), a.numeric_family()) {
                (Some(bf), Some(af)) => bf == af && a.width() >= b.width(),
                _ => false,
            }
        }
        (ResolvedType::Record(b), ResolvedType::Record(a)) => {
            match (stable_before.get(b), stable_after.get(a)) {
                (Some(bid), Some(aid)) => bid == aid,
                _ => false,
            }
        }
        (
            ResolvedType::Array { item: b_item, key: b_key },
            ResolvedType::Array { item: a_item, key: a_key },
        ) => {
            if let (Some(b_key), Some(a_key)) = (b_key, a_key) {
                if key_path_text_for(b_key) != key_path_text_for(a_key) {
                    return false;
                }
            }
            is_compatible_evolution(b_item, a_item, stable_before, stable_after)
        }
        (ResolvedType::Null, ResolvedType::Null) => true,
        _ => false,
    }
}

fn key_path_text_for(key: &crate::resolved::KeyedArrayKey) -> String {
    key.path.iter().map(|s| s.field_name.as_str()).collect::<Vec<_>>().join(".")
}

/// Compares two compiled module sets and lists every breaking change
/// from `before` to `after` (§4.5).
pub fn check(
    before_records: &HashMap<RecordKey, Record>,
    after_records: &HashMap<RecordKey, Record>,
    before_methods: &[(&str, &crate::resolved::Method)],
    after_methods: &[(&str, &crate::resolved::Method)],
) -> Vec<BreakingChange> {
    let mut out = Vec::new();
    let stable_before = compute_tracked(before_records);
    let stable_after = compute_tracked(after_records);

    // Invert `after`'s stable-id map so a `before` record's identity can
    // be looked up directly instead of scanning.
    let after_by_stable_id: HashMap<&String, &RecordKey> =
        stable_after.iter().map(|(key, id)| (id, key)).collect();

    let mut visited_ids: HashSet<&String> = HashSet::new();
    for (before_key, before_id) in &stable_before {
        if !visited_ids.insert(before_id) {
            continue;
        }
        let Some(before_record) = before_records.get(before_key) else { continue };
        let Some(after_key) = after_by_stable_id.get(before_id) else {
            out.push(BreakingChange {
                token: before_record.name.clone(),
                kind: BreakingChangeKind::RecordRemoved {
                    record_name: before_record.name.text.clone(),
                },
            });
            continue;
        };
        let after_record = &after_records[*after_key];

        if before_record.kind != after_record.kind {
            out.push(BreakingChange {
                token: after_record.name.clone(),
                kind: BreakingChangeKind::KindChanged {
                    record_name: after_record.name.text.clone(),
                },
            });
            continue;
        }

        for field in &before_record.fields {
            match after_record.field_by_number(field.number) {
                None => {
                    if !after_record.removed_numbers.contains(&field.number) {
                        out.push(BreakingChange {
                            token: after_record.name.clone(),
                            kind: BreakingChangeKind::FieldRemovedWithoutRemovedMarker {
                                record_name: after_record.name.text.clone(),
                                field_name: field.name.text.clone(),
                            },
                        });
                    }
                }
                Some(after_field) => {
                    let before_key_path = key_path_text(&field.ty);
                    let after_key_path = key_path_text(&after_field.ty);
                    if before_key_path.is_some() && after_key_path.is_some() && before_key_path != after_key_path {
                        out.push(BreakingChange {
                            token: after_field.name.clone(),
                            kind: BreakingChangeKind::KeyedArrayKeyChanged {
                                record_name: after_record.name.text.clone(),
                                field_name: after_field.name.text.clone(),
                            },
                        });
                        continue;
                    }
                    if !is_compatible_evolution(&field.ty, &after_field.ty, &stable_before, &stable_after) {
                        out.push(BreakingChange {
                            token: after_field.name.clone(),
                            kind: BreakingChangeKind::FieldTypeChanged {
                                record_name: after_record.name.text.clone(),
                                field_name: after_field.name.text.clone(),
                            },
                        });
                    }
                }
            }
        }
    }

    check_methods(before_methods, after_methods, &stable_before, &stable_after, &mut out);
    out
}

fn check_methods(
    before_methods: &[(&str, &crate::resolved::Method)],
    after_methods: &[(&str, &crate::resolved::Method)],
    stable_before: &HashMap<RecordKey, String>,
    stable_after: &HashMap<RecordKey, String>,
    out: &mut Vec<BreakingChange>,
) {
    let mut before_by_number: HashMap<(String, u32), &crate::resolved::Method> = HashMap::new();
    for (module_path, method) in before_methods {
        let bucket = paths::package_of(module_path).unwrap_or_default();
        before_by_number.entry((bucket, method.number)).or_insert(method);
    }
    let mut after_by_number: HashMap<(String, u32), &crate::resolved::Method> = HashMap::new();
    for (module_path, method) in after_methods {
        let bucket = paths::package_of(module_path).unwrap_or_default();
        after_by_number.entry((bucket, method.number)).or_insert(method);
    }

    for (key, before_method) in &before_by_number {
        let Some(after_method) = after_by_number.get(key) else { continue };
        if !is_identical_type(&before_method.request_type, &after_method.request_type, stable_before, stable_after) {
            out.push(BreakingChange {
                token: after_method.name.clone(),
                kind: BreakingChangeKind::MethodRequestChanged {
                    method_name: after_method.name.text.clone(),
                },
            });
        }
        if !is_identical_type(&before_method.response_type, &after_method.response_type, stable_before, stable_after)
        {
            out.push(BreakingChange {
                token: after_method.name.clone(),
                kind: BreakingChangeKind::MethodResponseChanged {
                    method_name: after_method.name.text.clone(),
                },
            });
        }
    }
}

/// Method request/response identity is stricter than field evolution:
/// any change at all — including a safe numeric widening — changes the
/// wire shape of the call, so no widening allowance applies here.
fn is_identical_type(
    before_ty: &ResolvedType,
    after_ty: &ResolvedType,
    stable_before: &HashMap<RecordKey, String>,
    stable_after: &HashMap<RecordKey, String>,
) -> bool {
    match (before_ty, after_ty) {
        (ResolvedType::Optional(b), ResolvedType::Optional(a)) => {
            is_identical_type(b, a, stable_before, stable_after)
        }
        (ResolvedType::Primitive(b), ResolvedType::Primitive(a)) => b == a,
        (ResolvedType::Record(b), ResolvedType::Record(a)) => {
            matches!((stable_before.get(b), stable_after.get(a)), (Some(bid), Some(aid)) if bid == aid)
        }
        (ResolvedType::Array { item: b_item, key: b_key }, ResolvedType::Array { item: a_item, key: a_key }) => {
            b_key.as_ref().map(key_path_text_for) == a_key.as_ref().map(key_path_text_for)
                && is_identical_type(b_item, a_item, stable_before, stable_after)
        }
        (ResolvedType::Null, ResolvedType::Null) => true,
        _ => false,
    }
}

/// Collects `(module_path, method)` pairs across a compiled set's
/// modules, for feeding into `check`.
pub fn methods_of(set: &crate::module_set::ModuleSet) -> Vec<(&str, &crate::resolved::Method)> {
    let mut out = Vec::new();
    for (path, module) in &set.modules {
        for (_, decl) in module.name_to_declaration.iter() {
            if let crate::resolved::Declaration::Method(method) = decl {
                out.push((path.as_str(), method));
            }
        }
    }
    out
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
    fn widening_int32_to_int64_is_not_breaking() {
        let before = compile_one("struct S(1) { a: int32; }\n");
        let after = compile_one("struct S(1) { a: int64; }\n");
        let before_methods = methods_of(&before);
        let after_methods = methods_of(&after);
        let changes = check(&before.record_map, &after.record_map, &before_methods, &after_methods);
        assert!(changes.is_empty(), "{changes:?}");
    }

    #[test]
    fn crossing_numeric_family_is_breaking() {
        let before = compile_one("struct S(1) { a: int32; }\n");
        let after = compile_one("struct S(1) { a: uint32; }\n");
        let changes = check(&before.record_map, &after.record_map, &[], &[]);
        assert!(changes
            .iter()
            .any(|c| matches!(&c.kind, BreakingChangeKind::FieldTypeChanged { .. })));
    }

    #[test]
    fn removing_field_without_removed_marker_is_breaking() {
        let before = compile_one("struct S(1) { a: int32; }\n");
        let after = compile_one("struct S(1) { removed 0; }\n");
        let changes = check(&before.record_map, &after.record_map, &[], &[]);
        assert!(changes.is_empty(), "removed marker should make this safe: {changes:?}");

        let after_unmarked = compile_one("struct S(1) { b: int32 = 1; }\n");
        let changes = check(&before.record_map, &after_unmarked.record_map, &[], &[]);
        assert!(changes
            .iter()
            .any(|c| matches!(&c.kind, BreakingChangeKind::FieldRemovedWithoutRemovedMarker { .. })));
    }

    #[test]
    fn required_to_optional_is_not_breaking_but_reverse_is() {
        let before = compile_one("struct S(1) { a: int32; }\n");
        let after = compile_one("struct S(1) { a: int32?; }\n");
        let changes = check(&before.record_map, &after.record_map, &[], &[]);
        assert!(changes.is_empty(), "{changes:?}");

        let changes_reverse = check(&after.record_map, &before.record_map, &[], &[]);
        assert!(changes_reverse
            .iter()
            .any(|c| matches!(&c.kind, BreakingChangeKind::FieldTypeChanged { .. })));
    }
}
