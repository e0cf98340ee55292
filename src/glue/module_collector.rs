//! Root-relative directory discovery (SPEC_FULL.md "Supplemented
//! features"), grounded in the teacher's `analysis::file_scanner`
//! `walkdir`-based traversal. Turns a [`FileReader`] into the
//! `HashMap<String, String>` that [`crate::module_set::compile`] takes
//! as input.

use std::collections::HashMap;

use anyhow::Result;
use rayon::prelude::*;

use super::file_reader::FileReader;

pub struct ModuleCollector;

impl ModuleCollector {
    /// Discovers every module `reader` knows about and reads its
    /// source, producing the `sources` map `module_set::compile`
    /// expects. Pure given a pure `reader`: no caching, no incremental
    /// recompilation (§1 Non-goals).
    ///
    /// Reads run in parallel across modules (grounded in the teacher's
    /// `core::context` scan, which does the same for source files): on
    /// a project with hundreds of modules the read is I/O-bound per
    /// file, not CPU-bound, so this is a straightforward win.
    pub fn collect(reader: &dyn FileReader) -> Result<HashMap<String, String>> {
        let module_paths = reader.list_modules()?;
        let sources: Result<Vec<(String, String)>> = module_paths
            .into_par_iter()
            .map(|module_path| {
                let source = reader.read(&module_path)?;
                Ok((module_path, source))
            })
            .collect();
        Ok(sources?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glue::file_reader::InMemoryFileReader;
    use crate::module_set::compile;

    #[test]
    fn collects_every_discovered_module_into_a_compilable_source_map() {
        let mut modules = HashMap::new();
        modules.insert("a.skir".to_string(), "struct A { x: int32; }\n".to_string());
        modules.insert(
            "b.skir".to_string(),
            "import A from \"a.skir\";\nstruct B { a: A; }\n".to_string(),
        );
        let reader = InMemoryFileReader::new(modules);

        let sources = ModuleCollector::collect(&reader).unwrap();
        assert_eq!(sources.len(), 2);

        let set = compile(&sources);
        assert!(set.is_ok(), "{:?}", set.all_errors());
    }
}
