//! Version-control diff reader
//!
//! Runs `git diff` against the previous commit (falling back to `HEAD` when
//! there is no previous commit) and parses its output. Every failure,
//! including a subprocess that outlives its timeout, degrades to an empty
//! result; callers never see a git error.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use context_layer_config::GitConfig;

use crate::paths;

/// Internal subprocess failures. Never returned from public methods.
#[derive(Debug, Error)]
enum GitError {
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git {args} timed out after {secs}s")]
    Timeout { args: String, secs: u64 },

    #[error("git {args} exited with {status}: {stderr}")]
    Failed {
        args: String,
        status: String,
        stderr: String,
    },

    #[error("git output reader thread panicked")]
    ReaderPanic,
}

/// Files grouped by diff status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Files that were added.
    pub added: Vec<String>,
    /// Files that were modified (content or type changed).
    pub modified: Vec<String>,
    /// Files that were deleted.
    pub deleted: Vec<String>,
}

impl ChangeSet {
    /// Create a new empty ChangeSet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if any changes were detected.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.modified.is_empty() || !self.deleted.is_empty()
    }

    /// Total number of changed files.
    pub fn total_changes(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }

    /// Every path in the set: added, then modified, then deleted.
    pub fn all_files(&self) -> Vec<String> {
        self.added
            .iter()
            .chain(&self.modified)
            .chain(&self.deleted)
            .cloned()
            .collect()
    }
}

/// Parse `git diff -z --name-only` output (NUL-terminated paths).
pub fn parse_name_only(output: &str) -> Vec<String> {
    output
        .split('\0')
        .map(paths::normalize)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Parse `git diff -z --name-status` output: a status field followed by
/// one path, or two for renames and copies, all NUL-terminated.
///
/// A rename counts as deleting the old path and adding the new one, a copy
/// as adding the new one. Unknown status letters are ignored.
pub fn parse_name_status(output: &str) -> ChangeSet {
    let mut changes = ChangeSet::new();
    let mut fields = output.split('\0').filter(|f| !f.is_empty());

    while let Some(status) = fields.next() {
        let Some(letter) = status.chars().next() else {
            continue;
        };
        let Some(first) = fields.next().map(paths::normalize) else {
            break;
        };
        match letter {
            'A' => changes.added.push(first),
            'M' | 'T' => changes.modified.push(first),
            'D' => changes.deleted.push(first),
            'R' | 'C' => {
                let Some(new) = fields.next().map(paths::normalize) else {
                    break;
                };
                if letter == 'R' {
                    changes.deleted.push(first);
                }
                changes.added.push(new);
            }
            _ => debug!("Ignoring diff status {:?} for {:?}", status, first),
        }
    }
    changes
}

/// Thin wrapper over the `git` binary for one working tree.
#[derive(Debug, Clone)]
pub struct GitClient {
    root: PathBuf,
    config: GitConfig,
}

impl GitClient {
    pub fn new(root: impl Into<PathBuf>, config: GitConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `root` is inside a git working tree.
    pub fn is_repo(&self) -> bool {
        self.run(&["rev-parse", "--git-dir"]).is_ok()
    }

    /// Top-level directory of the working tree.
    pub fn toplevel(&self) -> Option<PathBuf> {
        match self.run(&["rev-parse", "--show-toplevel"]) {
            Ok(out) => {
                let top = out.trim();
                (!top.is_empty()).then(|| PathBuf::from(top))
            }
            Err(e) => {
                debug!("No git toplevel for {:?}: {}", self.root, e);
                None
            }
        }
    }

    /// Paths changed by the last commit under `root`, relative to `root`.
    pub fn changed_files(&self) -> Vec<String> {
        self.diff("--name-only")
            .map(|out| parse_name_only(&out))
            .unwrap_or_default()
    }

    /// Status-tagged changes of the last commit under `root`.
    pub fn change_set(&self) -> ChangeSet {
        self.diff("--name-status")
            .map(|out| parse_name_status(&out))
            .unwrap_or_default()
    }

    fn diff(&self, mode: &str) -> Option<String> {
        let refs = [self.config.base_ref.as_str(), self.config.fallback_ref.as_str()];
        for (i, &rev) in refs.iter().enumerate() {
            // Paths are rebased onto `root`, which may sit below the
            // toplevel, and printed raw instead of C-quoted.
            let args = ["-c", "core.quotePath=false", "diff", "-z", "--relative", mode, rev];
            match self.run(&args) {
                Ok(out) => return Some(out),
                Err(e) if i == 0 => debug!("git diff {} {} failed, falling back: {}", mode, rev, e),
                Err(e) => debug!("git diff {} {} failed: {}", mode, rev, e),
            }
        }
        None
    }

    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let joined = args.join(" ");
        let mut child = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain both pipes while waiting so a large diff cannot fill the
        // pipe buffer and stall the child.
        let (stdout_tx, stdout_rx) = mpsc::channel();
        let (stderr_tx, stderr_rx) = mpsc::channel();
        let stdout_thread = child.stdout.take().map(|pipe| {
            std::thread::spawn(move || {
                let _ = stdout_tx.send(read_all(pipe));
            })
        });
        let stderr_thread = child.stderr.take().map(|pipe| {
            std::thread::spawn(move || {
                let _ = stderr_tx.send(read_all(pipe));
            })
        });

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let status = match child.wait_timeout(timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                warn!("git {} timed out after {}s", joined, timeout.as_secs());
                return Err(GitError::Timeout {
                    args: joined,
                    secs: timeout.as_secs(),
                });
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(GitError::Spawn(e));
            }
        };

        if let Some(thread) = stdout_thread {
            let _ = thread.join();
        }
        if let Some(thread) = stderr_thread {
            let _ = thread.join();
        }
        let stdout = stdout_rx.recv().map_err(|_| GitError::ReaderPanic)??;
        let stderr = stderr_rx.recv().unwrap_or_else(|_| Ok(String::new()))?;

        if !status.success() {
            return Err(GitError::Failed {
                args: joined,
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(stdout)
    }
}

fn read_all(mut pipe: impl Read) -> std::io::Result<String> {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_parse_name_only() {
        let out = "src/a.ts\0./src/b.ts\0\0";
        assert_eq!(parse_name_only(out), vec!["src/a.ts", "src/b.ts"]);
        assert!(parse_name_only("").is_empty());
    }

    #[test]
    fn test_parse_unquoted_non_ascii_paths() {
        let out = "src/café/index.ts\0docs/with space.md\0";
        assert_eq!(
            parse_name_only(out),
            vec!["src/café/index.ts", "docs/with space.md"]
        );

        let changes = parse_name_status("A\0src/café/index.ts\0M\0src/naïve.ts\0");
        assert_eq!(changes.added, vec!["src/café/index.ts"]);
        assert_eq!(changes.modified, vec!["src/naïve.ts"]);
    }

    #[test]
    fn test_parse_name_status() {
        let out = "A\0src/new.ts\0M\0src/changed.ts\0D\0src/AGENTS.md\0R087\0old/x.py\0new/x.py\0C100\0a.go\0b.go\0T\0link\0X\0weird\0";
        let changes = parse_name_status(out);

        assert_eq!(changes.added, vec!["src/new.ts", "new/x.py", "b.go"]);
        assert_eq!(changes.modified, vec!["src/changed.ts", "link"]);
        assert_eq!(changes.deleted, vec!["src/AGENTS.md", "old/x.py"]);
        assert_eq!(changes.total_changes(), 7);
        assert!(changes.has_changes());
    }

    #[test]
    fn test_change_set_all_files() {
        let changes = ChangeSet {
            added: vec!["a".into()],
            modified: vec!["m".into()],
            deleted: vec!["d".into()],
        };
        assert_eq!(changes.all_files(), vec!["a", "m", "d"]);
        assert!(!ChangeSet::new().has_changes());
    }

    #[test]
    fn test_not_a_repository_degrades_to_empty() {
        let temp = TempDir::new().unwrap();
        let client = GitClient::new(temp.path(), GitConfig::default());

        assert!(!client.is_repo());
        assert!(client.toplevel().is_none());
        assert!(client.changed_files().is_empty());
        assert_eq!(client.change_set(), ChangeSet::new());
    }

    #[test]
    fn test_missing_directory_degrades_to_empty() {
        let client = GitClient::new("/definitely/not/a/real/path", GitConfig::default());
        assert!(!client.is_repo());
        assert!(client.changed_files().is_empty());
    }
}
