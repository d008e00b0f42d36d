use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Binary,
    TooLarge,
}

/// Contents of one collected file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileContent {
    Text { text: String },
    Skipped { reason: SkipReason, size: u64 },
}

impl FileContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FileContent::Text { text } => Some(text),
            FileContent::Skipped { .. } => None,
        }
    }

    /// Human-readable marker used in prompts, e.g. "skipped: binary".
    pub fn describe(&self) -> String {
        match self {
            FileContent::Text { text } => format!("{} chars", text.chars().count()),
            FileContent::Skipped { reason: SkipReason::Binary, .. } => "skipped: binary".to_string(),
            FileContent::Skipped { reason: SkipReason::TooLarge, size } => {
                format!("skipped: too large ({size} bytes)")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRemote {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitBranch {
    pub name: String,
    pub is_head: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitCommit {
    pub id: String,
    pub summary: String,
    pub author: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitInfo {
    pub remotes: Vec<GitRemote>,
    pub branches: Vec<GitBranch>,
    pub recent_commits: Vec<GitCommit>,
}

impl GitInfo {
    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty() && self.branches.is_empty() && self.recent_commits.is_empty()
    }

    pub fn current_branch(&self) -> Option<&str> {
        self.branches
            .iter()
            .find(|b| b.is_head)
            .map(|b| b.name.as_str())
    }
}

/// ecosystem ("npm", "python") → package name → version requirement
pub type Dependencies = BTreeMap<String, BTreeMap<String, String>>;

/// Immutable view of a repository collected for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    pub root: String,
    pub collected_at: chrono::DateTime<chrono::Utc>,
    pub structure: BTreeMap<String, EntryKind>,
    pub file_contents: BTreeMap<String, FileContent>,
    pub git_info: GitInfo,
    pub dependencies: Dependencies,
    pub workflows: Vec<String>,
}

impl RepositorySnapshot {
    pub fn file_count(&self) -> usize {
        self.structure
            .values()
            .filter(|kind| **kind == EntryKind::File)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.file_count() == 0
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.structure
            .iter()
            .filter(|(_, kind)| **kind == EntryKind::File)
            .map(|(path, _)| path.as_str())
    }

    pub fn text(&self, path: &str) -> Option<&str> {
        self.file_contents.get(path).and_then(FileContent::as_text)
    }

    pub fn dependency_count(&self) -> usize {
        self.dependencies.values().map(|deps| deps.len()).sum()
    }

    /// Indented tree rendering of `structure`, capped at `max_lines`.
    pub fn render_tree(&self, max_lines: usize) -> String {
        let mut lines = Vec::new();
        for (path, kind) in &self.structure {
            if lines.len() >= max_lines {
                lines.push(format!("... ({} more entries)", self.structure.len() - max_lines));
                break;
            }
            let depth = path.matches('/').count();
            let name = path.rsplit('/').next().unwrap_or(path);
            let suffix = if *kind == EntryKind::Directory { "/" } else { "" };
            lines.push(format!("{}{}{}", "  ".repeat(depth), name, suffix));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with(paths: &[(&str, EntryKind)]) -> RepositorySnapshot {
        RepositorySnapshot {
            root: "/tmp/repo".to_string(),
            collected_at: chrono::Utc::now(),
            structure: paths
                .iter()
                .map(|(p, k)| (p.to_string(), *k))
                .collect(),
            file_contents: BTreeMap::new(),
            git_info: GitInfo::default(),
            dependencies: Dependencies::new(),
            workflows: vec![],
        }
    }

    #[test]
    fn directories_do_not_count_as_files() {
        let snapshot = snapshot_with(&[
            ("src", EntryKind::Directory),
            ("src/main.rs", EntryKind::File),
        ]);
        assert_eq!(snapshot.file_count(), 1);
        assert!(!snapshot.is_empty());
        assert!(snapshot_with(&[("docs", EntryKind::Directory)]).is_empty());
    }

    #[test]
    fn renders_nested_tree_with_cap() {
        let snapshot = snapshot_with(&[
            ("README.md", EntryKind::File),
            ("src", EntryKind::Directory),
            ("src/lib.rs", EntryKind::File),
        ]);
        assert_eq!(snapshot.render_tree(10), "README.md\nsrc/\n  lib.rs");
        assert!(snapshot.render_tree(1).ends_with("(2 more entries)"));
    }

    #[test]
    fn skipped_binary_is_described_for_prompts() {
        let content = FileContent::Skipped {
            reason: SkipReason::Binary,
            size: 12,
        };
        assert_eq!(content.describe(), "skipped: binary");
        assert!(content.as_text().is_none());
    }
}
