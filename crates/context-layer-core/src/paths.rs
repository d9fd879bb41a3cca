//! Helpers for project-relative, `/`-separated paths.
//!
//! Diff output, manifest keys and scorer inputs all use this form; the
//! project root itself is never an ancestor.

use std::path::{Path, PathBuf};

/// Normalize a diff or user supplied path: `/` separators, no leading `./`,
/// no trailing `/`.
pub fn normalize(path: &str) -> String {
    let unified = path.trim().replace('\\', "/");
    let mut rest = unified.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    rest.trim_end_matches('/').to_string()
}

/// Directory part of a relative path, `None` at the project root.
pub fn parent(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(dir, _)| dir).filter(|d| !d.is_empty())
}

/// Ancestor directories of `path`, nearest first, excluding the root.
///
/// `a/b/c.ts` yields `["a/b", "a"]`.
pub fn ancestors(path: &str) -> Vec<&str> {
    let mut dirs = Vec::new();
    let mut current = parent(path);
    while let Some(dir) = current {
        dirs.push(dir);
        current = parent(dir);
    }
    dirs
}

/// Whether `ancestor` is a strict ancestor directory of `path`.
pub fn is_strict_ancestor(ancestor: &str, path: &str) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}

/// Last segment of a relative path.
pub fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}

/// Resolve a relative path against the project root.
pub fn resolve(root: &Path, rel: &str) -> PathBuf {
    rel.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .fold(root.to_path_buf(), |acc, seg| acc.join(seg))
}

/// Express `path` relative to `root` in `/` form; `None` outside the root.
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}
