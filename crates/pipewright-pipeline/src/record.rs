//! File records flowing between pipeline stages.
//!
//! Every stage takes an ordered `Vec<FileRecord>` and returns another one,
//! so stages compose as plain function calls and can be rerun freely.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Group holding first-party and vendored scripts.
pub const SCRIPTS_GROUP: &str = "scripts.js";

/// Group holding template registrations.
pub const TEMPLATES_GROUP: &str = "templates.js";

/// Bundle ordering: plain scripts first, template registrations last.
pub const BUNDLE_ORDER: [&str; 2] = [SCRIPTS_GROUP, TEMPLATES_GROUP];

/// A file travelling through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path relative to the source root it was discovered under
    pub path: PathBuf,

    /// File contents
    pub contents: String,

    /// Synthetic group the record belongs to
    pub group: String,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>, group: &str) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
            group: group.to_string(),
        }
    }
}

/// List files under `root` whose extension is in `extensions` (all files when
/// empty), recursively, sorted by path. A missing root yields no files.
pub fn discover(root: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    if !root.exists() {
        tracing::debug!("Source directory not found: {}", root.display());
        return Vec::new();
    }

    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| {
            extensions.is_empty()
                || path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|ext| extensions.contains(&ext))
        })
        .collect()
}

/// Files read from one source root.
#[derive(Debug, Default)]
pub struct Sources {
    /// One record per readable file, in discovery order
    pub records: Vec<FileRecord>,

    /// Files that could not be read as UTF-8 text, relative to the root
    pub unreadable: Vec<String>,
}

/// Read discovered files into records of `group`, paths relative to `root`.
///
/// A file that can't be read is logged and skipped; the rest are still read.
pub fn read_records(root: &Path, extensions: &[&str], group: &str) -> Sources {
    let mut sources = Sources::default();

    for path in discover(root, extensions) {
        let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        match fs::read_to_string(&path) {
            Ok(contents) => sources.records.push(FileRecord::new(relative, contents, group)),
            Err(e) => {
                tracing::error!("Failed to read {}: {}", path.display(), e);
                sources.unreadable.push(relative.display().to_string());
            }
        }
    }

    sources
}

/// Stable-sort records by the position of their group in `order`. Groups not
/// listed keep their relative order after all listed groups.
pub fn order_groups(mut records: Vec<FileRecord>, order: &[&str]) -> Vec<FileRecord> {
    records.sort_by_key(|r| {
        order
            .iter()
            .position(|g| *g == r.group)
            .unwrap_or(order.len())
    });
    records
}

/// Concatenate records into one, separated by newlines.
pub fn concat(records: &[FileRecord], name: &str) -> FileRecord {
    let contents = records
        .iter()
        .map(|r| r.contents.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    FileRecord::new(name, contents, SCRIPTS_GROUP)
}
