//! File reader interface (§5: "a pure interface consulted during
//! discovery; a test fake is trivially substitutable").
//!
//! Grounded in the teacher's `analysis::file_scanner` traversal, but
//! reshaped as a trait object so `module_collector` can run against
//! either a real directory or an in-memory fixture without a feature
//! flag.

use std::collections::HashMap;

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// Discovers and reads `*.skir` module sources. `list_modules` returns
/// root-relative, forward-slash module paths (§6 "Module source");
/// `read` returns the UTF-8 contents of one such path.
///
/// `Sync` so `module_collector` can read modules in parallel across a
/// shared `&dyn FileReader`.
pub trait FileReader: Sync {
    fn list_modules(&self) -> Result<Vec<String>>;
    fn read(&self, module_path: &str) -> Result<String>;
}

/// Reads `*.skir` files under a real directory on disk.
pub struct DiskFileReader {
    root: std::path::PathBuf,
}

impl DiskFileReader {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        DiskFileReader { root: root.into() }
    }
}

impl FileReader for DiskFileReader {
    fn list_modules(&self) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = entry.with_context(|| format!("Cannot walk {}", self.root.display()))?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("skir") {
                continue;
            }
            let relative = path
                .strip_prefix(&self.root)
                .unwrap_or(path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            paths.push(relative);
        }
        paths.sort();
        Ok(paths)
    }

    fn read(&self, module_path: &str) -> Result<String> {
        let path = self.root.join(module_path);
        std::fs::read_to_string(&path).with_context(|| format!("Cannot read {}", path.display()))
    }
}

/// An in-memory fake used by tests and anywhere a `ModuleSet` needs to
/// be recompiled from a snapshot's embedded `modules` map (§6) without
/// touching disk.
pub struct InMemoryFileReader {
    modules: HashMap<String, String>,
}

impl InMemoryFileReader {
    pub fn new(modules: HashMap<String, String>) -> Self {
        InMemoryFileReader { modules }
    }
}

impl FileReader for InMemoryFileReader {
    fn list_modules(&self) -> Result<Vec<String>> {
        let mut paths: Vec<String> = self.modules.keys().cloned().collect();
        paths.sort();
        Ok(paths)
    }

    fn read(&self, module_path: &str) -> Result<String> {
        self.modules
            .get(module_path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No such module: {module_path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn disk_reader_lists_only_skir_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.skir"), "struct A {}\n").unwrap();
        fs::write(dir.path().join("readme.md"), "ignore me").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/b.skir"), "struct B {}\n").unwrap();

        let reader = DiskFileReader::new(dir.path());
        let mut modules = reader.list_modules().unwrap();
        modules.sort();
        assert_eq!(modules, vec!["a.skir".to_string(), "nested/b.skir".to_string()]);
        assert_eq!(reader.read("a.skir").unwrap(), "struct A {}\n");
    }

    #[test]
    fn in_memory_reader_round_trips() {
        let mut map = HashMap::new();
        map.insert("m.skir".to_string(), "struct M {}\n".to_string());
        let reader = InMemoryFileReader::new(map);
        assert_eq!(reader.list_modules().unwrap(), vec!["m.skir".to_string()]);
        assert_eq!(reader.read("m.skir").unwrap(), "struct M {}\n");
        assert!(reader.read("missing.skir").is_err());
    }
}
