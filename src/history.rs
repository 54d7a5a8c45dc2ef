//! First-parent history walks.
//!
//! Merge topology is not followed: every walk moves from a commit to its
//! first parent only.

use std::collections::HashMap;

use git2::{Oid, Repository};

use crate::error::{Error, Result};
use crate::tree;
use crate::types::Commit;

/// Object id of the entry at `path` in `commit`'s tree.
fn entry_oid(repo: &Repository, commit: &git2::Commit<'_>, path: &str) -> Result<Option<Oid>> {
    Ok(tree::entry_at_path(repo, commit.tree_id(), path)?.map(|e| e.oid))
}

/// `true` if `commit` changed the entry at `path` relative to its first
/// parent. A root commit changes every path it contains.
pub fn changed_path(repo: &Repository, commit: &git2::Commit<'_>, path: &str) -> Result<bool> {
    let this = entry_oid(repo, commit, path)?;
    let prev = match commit.parent(0) {
        Ok(parent) => entry_oid(repo, &parent, path)?,
        Err(_) => None,
    };
    Ok(this != prev)
}

/// Commits reachable from `start` by first parent that changed `path`,
/// most recent first.
pub fn path_history(repo: &Repository, start: Oid, path: &str, limit: Option<usize>) -> Result<Vec<Commit>> {
    let limit = limit.unwrap_or(usize::MAX);
    let mut results = Vec::new();
    let mut current = Some(repo.find_commit(start).map_err(Error::git)?);

    while let Some(commit) = current {
        if results.len() >= limit {
            break;
        }
        if changed_path(repo, &commit, path)? {
            results.push(Commit::from_git(&commit));
        }
        current = commit.parent(0).ok();
    }
    Ok(results)
}

/// For each of `paths` present at `start`, the most recent first-parent
/// commit that changed it. Paths absent at `start` are left out.
///
/// One walk serves all paths, so listing a directory costs a single pass
/// over history.
pub fn last_changes(repo: &Repository, start: Oid, paths: &[String]) -> Result<HashMap<String, Oid>> {
    let head = repo.find_commit(start).map_err(Error::git)?;

    let mut pending: Vec<&str> = Vec::new();
    for path in paths {
        if entry_oid(repo, &head, path)?.is_some() {
            pending.push(path);
        }
    }

    let mut found = HashMap::new();
    let mut current = Some(head);
    while let Some(commit) = current {
        if pending.is_empty() {
            break;
        }
        let mut still_pending = Vec::with_capacity(pending.len());
        for path in pending {
            if changed_path(repo, &commit, path)? {
                found.insert(path.to_string(), commit.id());
            } else {
                still_pending.push(path);
            }
        }
        pending = still_pending;
        current = commit.parent(0).ok();
    }
    Ok(found)
}

/// The most recent first-parent commit from `start` that changed `path`.
pub fn last_change(repo: &Repository, start: Oid, path: &str) -> Result<Option<Oid>> {
    let paths = [path.to_string()];
    Ok(last_changes(repo, start, &paths)?.remove(path))
}
