//! Repository snapshot collection.
//!
//! Walks the tree, reads text files under a size ceiling, and gathers git
//! metadata, dependency manifests and CI workflows into one
//! [`RepositorySnapshot`]. Only a missing root is fatal; everything else
//! fails soft.

pub mod git;
pub mod manifests;

use crate::error::CollectionError;
use crate::models::snapshot::{EntryKind, FileContent, RepositorySnapshot, SkipReason};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Directories never descended into.
const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".repolens",
    "node_modules",
    "target",
    "__pycache__",
    "dist",
    "build",
    "vendor",
    ".venv",
];

/// Bytes inspected for NUL when sniffing binary content.
const BINARY_SNIFF_LEN: usize = 8000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectOptions {
    pub max_file_bytes: u64,
    pub recent_commit_limit: usize,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            max_file_bytes: 256 * 1024,
            recent_commit_limit: 5,
        }
    }
}

pub fn collect(root: &Path, options: &CollectOptions) -> Result<RepositorySnapshot, CollectionError> {
    if !root.exists() {
        return Err(CollectionError::RootMissing(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(CollectionError::NotADirectory(root.to_path_buf()));
    }
    // `.` and relative roots would otherwise name the repository ".".
    let root = root.canonicalize().map_err(|e| CollectionError::Walk {
        path: root.to_path_buf(),
        message: e.to_string(),
    })?;
    let root = root.as_path();

    let start = std::time::Instant::now();
    let mut structure = BTreeMap::new();
    let mut file_contents = BTreeMap::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_excluded(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(CollectionError::Walk {
                    path: root.to_path_buf(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                warn!("Skipping unreadable entry: {e}");
                continue;
            }
        };

        let relative_path = to_relative_path(root, entry.path());
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            structure.insert(relative_path, EntryKind::Symlink);
        } else if file_type.is_dir() {
            structure.insert(relative_path, EntryKind::Directory);
        } else if file_type.is_file() {
            match read_content(entry.path(), options.max_file_bytes) {
                Ok(content) => {
                    file_contents.insert(relative_path.clone(), content);
                }
                Err(e) => warn!("Could not read {}: {e}", entry.path().display()),
            }
            structure.insert(relative_path, EntryKind::File);
        }
    }

    let git_info = git::collect_git_info(root, options.recent_commit_limit);
    let dependencies = manifests::collect_dependencies(root);
    let workflows = find_workflows(root);

    let snapshot = RepositorySnapshot {
        root: root.to_string_lossy().to_string(),
        collected_at: chrono::Utc::now(),
        structure,
        file_contents,
        git_info,
        dependencies,
        workflows,
    };

    info!(
        "Collected {} files ({} dependencies, {} workflows) from {} in {}ms",
        snapshot.file_count(),
        snapshot.dependency_count(),
        snapshot.workflows.len(),
        root.display(),
        start.elapsed().as_millis()
    );

    Ok(snapshot)
}

fn is_excluded(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| EXCLUDED_DIRS.contains(&name))
            .unwrap_or(false)
}

fn read_content(path: &Path, max_file_bytes: u64) -> std::io::Result<FileContent> {
    let size = fs::metadata(path)?.len();
    if size > max_file_bytes {
        debug!("{} exceeds {max_file_bytes} bytes, skipping", path.display());
        return Ok(FileContent::Skipped {
            reason: SkipReason::TooLarge,
            size,
        });
    }

    let bytes = fs::read(path)?;
    if bytes.iter().take(BINARY_SNIFF_LEN).any(|b| *b == 0) {
        return Ok(FileContent::Skipped {
            reason: SkipReason::Binary,
            size,
        });
    }

    Ok(match String::from_utf8(bytes) {
        Ok(text) => FileContent::Text { text },
        Err(_) => FileContent::Skipped {
            reason: SkipReason::Binary,
            size,
        },
    })
}

fn find_workflows(root: &Path) -> Vec<String> {
    let base = glob::Pattern::escape(&root.join(".github").join("workflows").to_string_lossy());
    let mut workflows = Vec::new();

    for pattern in [format!("{base}/*.yml"), format!("{base}/*.yaml")] {
        let Ok(paths) = glob::glob(&pattern) else {
            continue;
        };
        for path in paths.flatten() {
            workflows.push(to_relative_path(root, &path));
        }
    }

    workflows.sort();
    workflows
}

pub(crate) fn to_relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
