//! Hard/soft recursion classification (§4.3, §8): a DFS over the
//! record-type graph that decides, for each field referencing a
//! record, whether following that reference can loop back to the
//! declaring record — and if so, whether every edge on some such path
//! is a direct record-to-record edge (hard recursion, which back ends
//! must represent without an owning pointer — the whole reason
//! `RecordKey` exists) or at least one edge on every such path goes
//! through an `optional`/array wrapper (soft recursion, which owning
//! pointers could represent just fine, but which this crate still
//! classifies uniformly through `RecordKey`).

use std::collections::{HashMap, HashSet};

use crate::resolved::{Record, RecordKey, Recursivity, ResolvedType};

/// Fills in `Field::is_recursive` for every field of every record in
/// `record_map` that targets a record type, direct or indirect.
pub fn classify(record_map: &mut HashMap<RecordKey, Record>) {
    let edges: HashMap<RecordKey, Vec<(RecordKey, bool)>> = record_map
        .iter()
        .map(|(key, record)| {
            let field_edges = record
                .fields
                .iter()
                .filter_map(|f| field_edge(&f.ty))
                .collect();
            (key.clone(), field_edges)
        })
        .collect();

    let mut results: HashMap<RecordKey, Vec<Recursivity>> = HashMap::new();
    for (key, record) in record_map.iter() {
        let mut per_field = Vec::with_capacity(record.fields.len());
        for field in &record.fields {
            let classification = match field_edge(&field.ty) {
                Some((target, is_direct)) => classify_edge(key, &target, is_direct, &edges),
                None => Recursivity::None,
            };
            per_field.push(classification);
        }
        results.insert(key.clone(), per_field);
    }

    for (key, classifications) in results {
        if let Some(record) = record_map.get_mut(&key) {
            for (field, classification) in record.fields.iter_mut().zip(classifications) {
                field.is_recursive = classification;
            }
        }
    }
}

/// A field's direct edge to a record type, and whether that edge is
/// "direct" (the field's own type, with no intervening `optional` or
/// array) as opposed to reached only by unwrapping one.
fn field_edge(ty: &ResolvedType) -> Option<(RecordKey, bool)> {
    match ty {
        ResolvedType::Record(key) => Some((key.clone(), true)),
        ResolvedType::Optional(inner) => field_edge(inner).map(|(key, _)| (key, false)),
        ResolvedType::Array { item, .. } => field_edge(item).map(|(key, _)| (key, false)),
        ResolvedType::Primitive(_) | ResolvedType::Null => None,
    }
}

fn classify_edge(
    origin: &RecordKey,
    target: &RecordKey,
    edge_is_direct: bool,
    edges: &HashMap<RecordKey, Vec<(RecordKey, bool)>>,
) -> Recursivity {
    let mut visiting = HashSet::new();
    match dfs(origin, target, edge_is_direct, edges, &mut visiting) {
        Some(true) => Recursivity::Hard,
        Some(false) => Recursivity::Soft,
        None => Recursivity::None,
    }
}

/// Returns `Some(true)` if a path exists back to `origin` using only
/// direct edges (hard), `Some(false)` if a path exists but every such
/// path uses at least one indirect edge (soft), `None` if `origin` is
/// unreachable from `target`.
fn dfs(
    origin: &RecordKey,
    node: &RecordKey,
    path_all_direct_so_far: bool,
    edges: &HashMap<RecordKey, Vec<(RecordKey, bool)>>,
    visiting: &mut HashSet<RecordKey>,
) -> Option<bool> {
    if node == origin {
        return Some(path_all_direct_so_far);
    }
    if !visiting.insert(node.clone()) {
        return None;
    }
    let mut best: Option<bool> = None;
    if let Some(out_edges) = edges.get(node) {
        for (next, is_direct) in out_edges {
            let all_direct = path_all_direct_so_far && *is_direct;
            if let Some(found_hard) = dfs(origin, next, all_direct, edges, visiting) {
                best = Some(best.unwrap_or(false) || found_hard);
                if best == Some(true) {
                    break;
                }
            }
        }
    }
    visiting.remove(node);
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_set::compile;
    use crate::resolved::Declaration;
    use std::collections::HashMap;

    fn record_of<'a>(set: &'a crate::module_set::ModuleSet, name: &str) -> &'a Record {
        let Declaration::Record(key) = set.module("m.skir").unwrap().name_to_declaration.get(name).unwrap() else {
            panic!()
        };
        set.record(key).unwrap()
    }

    #[test]
    fn direct_self_reference_is_hard() {
        let mut sources = HashMap::new();
        sources.insert("m.skir".to_string(), "struct Node { next: Node; }\n".to_string());
        let set = compile(&sources);
        assert_eq!(record_of(&set, "Node").fields[0].is_recursive, Recursivity::Hard);
    }

    #[test]
    fn optional_self_reference_is_soft() {
        let mut sources = HashMap::new();
        sources.insert("m.skir".to_string(), "struct Node { next: Node?; }\n".to_string());
        let set = compile(&sources);
        assert_eq!(record_of(&set, "Node").fields[0].is_recursive, Recursivity::Soft);
    }

    #[test]
    fn non_recursive_field_is_none() {
        let mut sources = HashMap::new();
        sources.insert("m.skir".to_string(), "struct Leaf { x: int32; }\n".to_string());
        let set = compile(&sources);
        assert_eq!(record_of(&set, "Leaf").fields[0].is_recursive, Recursivity::None);
    }

    #[test]
    fn mutual_direct_recursion_through_two_records_is_hard() {
        let mut sources = HashMap::new();
        sources.insert(
            "m.skir".to_string(),
            "struct A { b: B; }\nstruct B { a: A; }\n".to_string(),
        );
        let set = compile(&sources);
        assert_eq!(record_of(&set, "A").fields[0].is_recursive, Recursivity::Hard);
        assert_eq!(record_of(&set, "B").fields[0].is_recursive, Recursivity::Hard);
    }
}
