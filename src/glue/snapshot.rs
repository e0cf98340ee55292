//! On-disk snapshot format (§6 "Snapshot file"): a point-in-time record
//! of a compiled `ModuleSet`'s tracked/untracked record IDs plus the
//! module sources needed to recompile it, used by the compatibility
//! checker to diff "before" against "after" (§4.5).
//!
//! Grounded in the teacher's `config.rs` serde-struct-plus-validation
//! shape; the corruption check itself is new (there's nothing
//! equivalent in the teacher, which has no notion of a stable-id
//! snapshot) and is built directly from spec.md's definition: "the
//! file is treated as corrupted if JSON parse fails or if the
//! recompiled `modules` contents produce errors."

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::module_set::{compile, ModuleSet};
use crate::resolved::{Record, RecordKey};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub read_me: Vec<String>,
    pub last_change: String,
    pub tracked_record_ids: Vec<String>,
    pub untracked_record_ids: Vec<String>,
    pub modules: HashMap<String, String>,
}

impl Snapshot {
    /// Parses a `skir-snapshot.json` payload. A parse failure alone is
    /// one of the two corruption conditions (§6); the caller decides
    /// what "corrupted" means for its own error reporting, this just
    /// surfaces the `serde_json::Error`.
    pub fn parse(contents: &str) -> serde_json::Result<Snapshot> {
        serde_json::from_str(contents)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Recompiles `self.modules` and reports whether the result is
    /// corrupted: a snapshot is corrupted if the modules it embeds no
    /// longer compile cleanly (§6). JSON-parse failure is the other
    /// half of that definition, caught earlier by `parse`.
    pub fn is_corrupted(&self) -> bool {
        !compile(&self.modules).is_ok()
    }

    /// Builds a snapshot from a freshly compiled `ModuleSet`, computing
    /// `trackedRecordIds`/`untrackedRecordIds` by walking every
    /// top-level record down through its `nested` map and joining
    /// names with `.` (§6 "DottedQualifiedName"), the same descent
    /// `finder::descend_nested` and `doc_refs::descend_field` use.
    pub fn from_module_set(
        read_me: Vec<String>,
        last_change: String,
        modules: HashMap<String, String>,
        set: &ModuleSet,
    ) -> Snapshot {
        let mut tracked = Vec::new();
        let mut untracked = Vec::new();

        let mut module_paths: Vec<&String> = modules.keys().collect();
        module_paths.sort();
        for module_path in module_paths {
            let Some(result) = set.module(module_path) else {
                continue;
            };
            for key in &result.records {
                let Some(record) = set.record(key) else {
                    continue;
                };
                // Only top-level records start a descent; nested ones
                // are reached through their parent's `nested` map so
                // as not to double-count them under two different ids.
                if !is_top_level(record, &result.records, &set.record_map) {
                    continue;
                }
                collect_ids(module_path, record.name.text.clone(), record, &set.record_map, &mut tracked, &mut untracked);
            }
        }

        tracked.sort();
        tracked.dedup();
        untracked.sort();
        untracked.dedup();

        Snapshot {
            read_me,
            last_change,
            tracked_record_ids: tracked,
            untracked_record_ids: untracked,
            modules,
        }
    }
}

fn is_top_level(record: &Record, _all: &[RecordKey], record_map: &HashMap<RecordKey, Record>) -> bool {
    !record_map
        .values()
        .any(|candidate| candidate.nested.values().any(|k| k == &record.key))
}

fn collect_ids(
    module_path: &str,
    dotted_name: String,
    record: &Record,
    record_map: &HashMap<RecordKey, Record>,
    tracked: &mut Vec<String>,
    untracked: &mut Vec<String>,
) {
    let id = format!("{module_path}:{dotted_name}");
    if record.number.is_some() {
        tracked.push(id);
    } else {
        untracked.push(id);
    }
    for (nested_name, nested_key) in &record.nested {
        if let Some(nested_record) = record_map.get(nested_key) {
            collect_ids(
                module_path,
                format!("{dotted_name}.{nested_name}"),
                nested_record,
                record_map,
                tracked,
                untracked,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_modules() -> HashMap<String, String> {
        let mut modules = HashMap::new();
        modules.insert(
            "a.skir".to_string(),
            "struct A(1) {\n  x: int32 = 1;\n  struct Inner {\n    y: int32 = 1;\n  }\n}\n".to_string(),
        );
        modules
    }

    #[test]
    fn round_trips_through_json() {
        let snapshot = Snapshot {
            read_me: vec!["do not edit by hand".to_string()],
            last_change: "2026-01-01T00:00:00Z".to_string(),
            tracked_record_ids: vec!["a.skir:A".to_string()],
            untracked_record_ids: vec![],
            modules: sample_modules(),
        };
        let json = snapshot.to_json().unwrap();
        let parsed = Snapshot::parse(&json).unwrap();
        assert_eq!(parsed.tracked_record_ids, snapshot.tracked_record_ids);
        assert!(!parsed.is_corrupted());
    }

    #[test]
    fn a_snapshot_whose_modules_no_longer_compile_is_corrupted() {
        let mut modules = HashMap::new();
        modules.insert("a.skir".to_string(), "struct A { x: NoSuchType = 1; }\n".to_string());
        let snapshot = Snapshot {
            read_me: vec![],
            last_change: "2026-01-01T00:00:00Z".to_string(),
            tracked_record_ids: vec![],
            untracked_record_ids: vec![],
            modules,
        };
        assert!(snapshot.is_corrupted());
    }

    #[test]
    fn malformed_json_fails_to_parse() {
        assert!(Snapshot::parse("{ not json").is_err());
    }

    #[test]
    fn from_module_set_splits_tracked_from_untracked_and_dots_nested_names() {
        let modules = sample_modules();
        let set = compile(&modules);
        assert!(set.is_ok(), "{:?}", set.all_errors());

        let snapshot = Snapshot::from_module_set(vec![], "2026-01-01T00:00:00Z".to_string(), modules, &set);
        assert_eq!(snapshot.tracked_record_ids, vec!["a.skir:A".to_string()]);
        assert_eq!(snapshot.untracked_record_ids, vec!["a.skir:A.Inner".to_string()]);
    }
}
