//! Module-path normalization: package prefixing, relative-import
//! joining, and root-escape detection (spec.md §4.3 "Package
//! prefixing").

use regex::Regex;
use std::sync::OnceLock;

fn packaged_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^@([A-Za-z0-9-]+)/([A-Za-z0-9_.-]+)/").unwrap())
}

/// Returns `Some("@org/pkg/")` if `module_path` is packaged.
pub fn package_prefix(module_path: &str) -> Option<String> {
    packaged_re()
        .captures(module_path)
        .map(|caps| format!("@{}/{}/", &caps[1], &caps[2]))
}

pub fn package_of(module_path: &str) -> Option<String> {
    packaged_re()
        .captures(module_path)
        .map(|caps| format!("@{}/{}", &caps[1], &caps[2]))
}

#[derive(Debug, PartialEq, Eq)]
pub enum PathError {
    BackslashInPath,
    EscapesRoot,
}

/// Resolves an import's literal path string against the importing
/// module's own path, applying package prefixing for non-relative,
/// non-`@`-prefixed imports inside a packaged module (§4.3).
pub fn resolve_import_path(importing_module_path: &str, literal: &str) -> Result<String, PathError> {
    if literal.contains('\\') {
        return Err(PathError::BackslashInPath);
    }
    if literal.starts_with("./") || literal.starts_with("../") {
        let dir = parent_dir(importing_module_path);
        return normalize_relative(&dir, literal);
    }
    if literal.starts_with('@') {
        return Ok(literal.to_string());
    }
    if let Some(prefix) = package_prefix(importing_module_path) {
        return Ok(format!("{prefix}{literal}"));
    }
    Ok(literal.to_string())
}

fn parent_dir(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => path[..idx].to_string(),
        None => String::new(),
    }
}

/// Joins `dir` with relative `literal` (containing `./`/`../`
/// components) and normalizes `..` segments, failing if the result
/// would escape above the shared root.
fn normalize_relative(dir: &str, literal: &str) -> Result<String, PathError> {
    let mut segments: Vec<&str> = if dir.is_empty() {
        Vec::new()
    } else {
        dir.split('/').collect()
    };
    for part in literal.split('/') {
        match part {
            "." | "" => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(PathError::EscapesRoot);
                }
            }
            other => segments.push(other),
        }
    }
    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_absolute_import_inside_package() {
        let resolved = resolve_import_path("@org/pkg/a/m1.skir", "shared.skir").unwrap();
        assert_eq!(resolved, "@org/pkg/shared.skir");
    }

    #[test]
    fn leaves_at_import_untouched() {
        let resolved = resolve_import_path("@org/pkg/a/m1.skir", "@org/other/x.skir").unwrap();
        assert_eq!(resolved, "@org/other/x.skir");
    }

    #[test]
    fn joins_relative_import() {
        let resolved = resolve_import_path("a/b/m1.skir", "./sibling.skir").unwrap();
        assert_eq!(resolved, "a/b/sibling.skir");
    }

    #[test]
    fn normalizes_parent_relative_import() {
        let resolved = resolve_import_path("a/b/m1.skir", "../c.skir").unwrap();
        assert_eq!(resolved, "a/c.skir");
    }

    #[test]
    fn rejects_backslash() {
        assert_eq!(
            resolve_import_path("a/m1.skir", "b\\c.skir"),
            Err(PathError::BackslashInPath)
        );
    }

    #[test]
    fn rejects_escaping_root() {
        assert_eq!(
            resolve_import_path("m1.skir", "../outside.skir"),
            Err(PathError::EscapesRoot)
        );
    }

    #[test]
    fn unpackaged_module_leaves_path_unprefixed() {
        let resolved = resolve_import_path("plain/m1.skir", "shared.skir").unwrap();
        assert_eq!(resolved, "shared.skir");
    }
}
