//! Documentation file maintenance
//!
//! Installs a codemap block into a documentation-root file. The merge itself
//! is a pure function of (existing content, new block): re-running it with
//! the same block leaves the document byte-identical, and a different block
//! only changes the delimited span.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::codemap::{CODEMAP_END, CODEMAP_START};
use crate::paths;

/// Errors raised while reading or writing documentation files.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DocumentError>;

/// What `install_codemap` did to the target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The file did not exist and was synthesized
    Created,
    /// The file existed and its content changed
    Updated,
    /// The merge produced identical content; nothing was written
    Unchanged,
}

/// Merge `codemap` into `existing`.
///
/// 1. A complete marker pair is replaced, markers included.
/// 2. Otherwise the block goes after the first `# ` heading and the blank
///    lines that follow it.
/// 3. Otherwise the block is prepended.
///
/// A start marker without a matching end marker is not treated as a block.
pub fn merge_codemap(existing: &str, codemap: &str) -> String {
    if let Some((start, end)) = block_span(existing) {
        let mut merged = String::with_capacity(existing.len() + codemap.len());
        merged.push_str(&existing[..start]);
        merged.push_str(codemap);
        merged.push_str(&existing[end..]);
        return merged;
    }

    if existing.contains(CODEMAP_START) {
        warn!("Codemap start marker without end marker; inserting a fresh block");
    }

    let mut lines: Vec<&str> = existing.split('\n').collect();
    match lines.iter().position(|l| l.starts_with("# ")) {
        Some(title) => {
            let mut insert_at = title + 1;
            while insert_at < lines.len() && lines[insert_at].trim().is_empty() {
                insert_at += 1;
            }
            let mut block = Vec::with_capacity(3);
            if insert_at == title + 1 {
                block.push("");
            }
            block.push(codemap);
            block.push("");
            lines.splice(insert_at..insert_at, block);
            lines.join("\n")
        }
        None => format!("{codemap}\n\n{existing}"),
    }
}

/// Byte range of the delimited block, end marker included.
fn block_span(content: &str) -> Option<(usize, usize)> {
    let start = content.find(CODEMAP_START)?;
    let after_start = start + CODEMAP_START.len();
    let end = content[after_start..].find(CODEMAP_END)? + after_start;
    Some((start, end + CODEMAP_END.len()))
}

/// Extract the current codemap block, markers included.
pub fn existing_codemap(content: &str) -> Option<&str> {
    block_span(content).map(|(start, end)| &content[start..end])
}

/// Minimal document for a directory that has none yet.
pub fn new_document(title: &str, codemap: &str) -> String {
    format!(
        "# {title}\n\n{codemap}\n\n---\n\n## Ownership\n\n**Owns**: [TODO]\n\n**Does NOT own**: [TODO]\n\n## Invariants\n\n- [TODO]\n"
    )
}

/// Install `codemap` into the document at `doc_path`.
///
/// A missing document is synthesized with the directory name as its title,
/// and `alias` (if any) is created next to it as a best-effort symlink.
pub fn install_codemap(doc_path: &Path, codemap: &str, alias: Option<&str>) -> Result<InstallOutcome> {
    match std::fs::read_to_string(doc_path) {
        Ok(existing) => {
            let merged = merge_codemap(&existing, codemap);
            if merged == existing {
                debug!("Codemap unchanged in {:?}", doc_path);
                return Ok(InstallOutcome::Unchanged);
            }
            write(doc_path, &merged)?;
            info!("Updated codemap in {:?}", doc_path);
            Ok(InstallOutcome::Updated)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let title = doc_path
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Overview".to_string());
            write(doc_path, &new_document(&title, codemap))?;
            if let Some(alias) = alias {
                create_alias(doc_path, alias);
            }
            info!("Created {:?}", doc_path);
            Ok(InstallOutcome::Created)
        }
        Err(source) => Err(DocumentError::Read {
            path: doc_path.to_path_buf(),
            source,
        }),
    }
}

fn write(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|source| DocumentError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Point `alias` at the document in the same directory. Failures are logged
/// and otherwise ignored.
fn create_alias(doc_path: &Path, alias: &str) {
    let (Some(dir), Some(target)) = (doc_path.parent(), doc_path.file_name()) else {
        return;
    };
    let alias_path = dir.join(alias);
    if alias_path.symlink_metadata().is_ok() {
        return;
    }
    if let Err(e) = symlink(Path::new(target), &alias_path) {
        debug!("Alias {:?} not created: {}", alias_path, e);
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(not(any(unix, windows)))]
fn symlink(_target: &Path, _link: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        ErrorKind::Unsupported,
        "symlinks unsupported on this platform",
    ))
}

/// Directories (relative to `root`, nearest first) whose documentation-root
/// file covers `file`. The project root itself is not considered.
pub fn find_covering_documents(root: &Path, file: &str, root_file: &str) -> Vec<String> {
    paths::ancestors(file)
        .into_iter()
        .filter(|dir| paths::resolve(root, dir).join(root_file).is_file())
        .map(str::to_string)
        .collect()
}

/// Rough token estimate: one token per four characters, rounded up.
pub fn count_tokens(content: &str) -> usize {
    content.chars().count().div_ceil(4)
}
