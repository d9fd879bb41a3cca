//! Codemap generation
//!
//! Discovers the source files of a system directory, extracts their
//! signatures in parallel and renders the delimited "API Surface" block.
//!
//! Output is deterministic: files are visited in sorted path order, grouped
//! by directory in first-seen order, and only exported signatures are
//! rendered.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};
use walkdir::WalkDir;

use context_layer_config::CodemapConfig;

use crate::parser::{ParsingSession, SupportedLanguage};
use crate::paths;
use crate::signature::FileCodemap;

/// Opening marker of the generated block.
pub const CODEMAP_START: &str = "<!-- CODEMAP START - Auto-generated, do not edit -->";

/// Closing marker of the generated block.
pub const CODEMAP_END: &str = "<!-- CODEMAP END -->";

/// Heading emitted right after the start marker.
pub const CODEMAP_HEADING: &str = "## API Surface";

/// Builds codemaps for directories.
pub struct CodemapGenerator<'s> {
    session: &'s ParsingSession,
    config: CodemapConfig,
}

impl CodemapGenerator<'static> {
    /// Generator backed by the process-wide parsing session.
    pub fn new(config: CodemapConfig) -> Self {
        Self::with_session(ParsingSession::global(), config)
    }
}

impl<'s> CodemapGenerator<'s> {
    pub fn with_session(session: &'s ParsingSession, config: CodemapConfig) -> Self {
        Self { session, config }
    }

    /// Source files under `dir`, as `/`-separated paths relative to `dir`,
    /// sorted.
    ///
    /// Entries whose name contains an exclude pattern are skipped (and not
    /// descended into); unreadable entries are skipped.
    pub fn source_files(&self, dir: &Path) -> Vec<String> {
        let mut files: Vec<String> = WalkDir::new(dir)
            .max_depth(self.config.max_depth)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded(&e.file_name().to_string_lossy()))
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|e| e.file_type().is_file() && self.has_source_extension(e.path()))
            .filter_map(|e| paths::relative_to(dir, e.path()).filter(|p| !p.is_empty()))
            .collect();

        files.sort();
        files
    }

    /// Extract every source file under `dir`.
    ///
    /// Files with no signatures at all are dropped; files whose signatures
    /// are all unexported are kept and filtered at render time.
    pub fn collect(&self, dir: &Path) -> Vec<FileCodemap> {
        let files = self.source_files(dir);

        let codemaps: Vec<FileCodemap> = files
            .par_iter()
            .filter_map(|rel| {
                let full: PathBuf = dir.join(rel);
                match self.session.extract_file(&full, rel) {
                    Ok(Some(codemap)) if !codemap.signatures.is_empty() => Some(codemap),
                    Ok(_) => None,
                    Err(e) => {
                        debug!("Skipping {:?}: {}", full, e);
                        None
                    }
                }
            })
            .collect();

        debug!(
            "Extracted {} of {} file(s) under {:?}",
            codemaps.len(),
            files.len(),
            dir
        );
        codemaps
    }

    /// Generate the delimited codemap block for `dir`.
    pub fn generate(&self, dir: &Path) -> String {
        let codemaps = self.collect(dir);
        info!("Generated codemap for {:?} ({} file(s))", dir, codemaps.len());
        format_codemap(&codemaps)
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.config
            .exclude_patterns
            .iter()
            .any(|p| name.contains(p.as_str()))
    }

    fn has_source_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.config.extensions.iter().any(|e| e == ext)
            && SupportedLanguage::from_extension(ext).is_some()
    }
}

/// Render codemaps as the delimited markdown block.
///
/// ```text
/// <!-- CODEMAP START - Auto-generated, do not edit -->
/// ## API Surface
///
/// ### store.ts
/// - `class Store`
///
/// <!-- CODEMAP END -->
/// ```
pub fn format_codemap(codemaps: &[FileCodemap]) -> String {
    let mut groups: Vec<(&str, Vec<&FileCodemap>)> = Vec::new();
    for codemap in codemaps.iter().filter(|c| c.has_exported()) {
        let dir = parent_of(&codemap.path);
        match groups.iter_mut().find(|(d, _)| *d == dir) {
            Some((_, files)) => files.push(codemap),
            None => groups.push((dir, vec![codemap])),
        }
    }

    let mut lines = vec![CODEMAP_START.to_string(), CODEMAP_HEADING.to_string(), String::new()];
    for (_, files) in groups {
        for file in files {
            lines.push(format!("### {}", paths::file_name(&file.path)));
            lines.extend(file.exported().map(|s| format!("- `{}`", s.signature)));
            lines.push(String::new());
        }
    }
    lines.push(CODEMAP_END.to_string());

    lines.join("\n")
}

fn parent_of(path: &str) -> &str {
    paths::parent(path).unwrap_or(".")
}
