use crate::models::snapshot::{GitBranch, GitCommit, GitInfo, GitRemote};
use git2::{BranchType, Repository};
use log::warn;
use std::path::Path;

/// Gather remotes, local branches and recent commits. Any git failure
/// (not a repository, unborn HEAD, corrupt objects) yields what could be
/// read, or an empty `GitInfo`.
pub fn collect_git_info(root: &Path, commit_limit: usize) -> GitInfo {
    let repo = match Repository::open(root) {
        Ok(repo) => repo,
        Err(e) => {
            warn!("Git metadata unavailable for {}: {}", root.display(), e.message());
            return GitInfo::default();
        }
    };

    GitInfo {
        remotes: read_remotes(&repo).unwrap_or_default(),
        branches: read_branches(&repo).unwrap_or_default(),
        recent_commits: read_recent_commits(&repo, commit_limit).unwrap_or_default(),
    }
}

fn read_remotes(repo: &Repository) -> Result<Vec<GitRemote>, git2::Error> {
    let names = repo.remotes()?;
    let mut remotes = Vec::new();

    for name in names.iter().flatten() {
        if let Ok(remote) = repo.find_remote(name) {
            remotes.push(GitRemote {
                name: name.to_string(),
                url: remote.url().unwrap_or_default().to_string(),
            });
        }
    }

    Ok(remotes)
}

fn read_branches(repo: &Repository) -> Result<Vec<GitBranch>, git2::Error> {
    let mut branches = Vec::new();

    for (branch, _) in repo.branches(Some(BranchType::Local))?.flatten() {
        let Some(name) = branch.name().ok().flatten().map(str::to_string) else {
            continue;
        };
        branches.push(GitBranch {
            name,
            is_head: branch.is_head(),
        });
    }

    branches.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(branches)
}

fn read_recent_commits(repo: &Repository, limit: usize) -> Result<Vec<GitCommit>, git2::Error> {
    let mut revwalk = repo.revwalk()?;
    // Unborn HEAD: no commits yet.
    if revwalk.push_head().is_err() {
        return Ok(Vec::new());
    }
    revwalk.set_sorting(git2::Sort::TIME)?;

    let mut commits = Vec::with_capacity(limit);
    for oid in revwalk.flatten().take(limit) {
        let commit = match repo.find_commit(oid) {
            Ok(c) => c,
            Err(_) => continue,
        };

        let id = oid.to_string();
        commits.push(GitCommit {
            id: id.chars().take(7).collect(),
            summary: commit.summary().unwrap_or_default().to_string(),
            author: commit.author().name().unwrap_or("unknown").to_string(),
            timestamp: commit.time().seconds(),
        });
    }

    Ok(commits)
}
