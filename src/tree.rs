use std::collections::BTreeMap;

use git2::{Oid, Repository};

use crate::error::{Error, Result};
use crate::types::MODE_TREE;

/// Result of looking up a single tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeEntryResult {
    pub oid: Oid,
    pub mode: u32,
}

impl TreeEntryResult {
    pub fn is_tree(&self) -> bool {
        self.mode == MODE_TREE
    }
}

/// An immediate child of a tree.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    pub name: String,
    pub oid: Oid,
    pub mode: u32,
}

impl WalkEntry {
    pub fn is_tree(&self) -> bool {
        self.mode == MODE_TREE
    }
}

/// A pending blob write within a tree rebuild.
#[derive(Debug, Clone, Copy)]
pub struct TreeWrite {
    pub oid: Oid,
    pub mode: u32,
}

/// Return the `(oid, mode)` of the entry at `path`, or `None` if missing.
///
/// Walks the tree from `tree_oid` through each path segment. Returns `None`
/// when any segment is not found or an intermediate entry is not a tree.
///
/// # Arguments
/// * `repo` - The git repository.
/// * `tree_oid` - Root tree to search from.
/// * `path` - Normalized forward-slash path (e.g. `"dir/file.md"`).
pub fn entry_at_path(repo: &Repository, tree_oid: Oid, path: &str) -> Result<Option<TreeEntryResult>> {
    if path.is_empty() {
        return Ok(Some(TreeEntryResult {
            oid: tree_oid,
            mode: MODE_TREE,
        }));
    }

    let segments: Vec<&str> = path.split('/').collect();
    let mut current_oid = tree_oid;

    for (i, segment) in segments.iter().enumerate() {
        let tree = repo.find_tree(current_oid).map_err(Error::git)?;
        let Some(entry) = tree.get_name(segment) else {
            return Ok(None);
        };
        let found = TreeEntryResult {
            oid: entry.id(),
            mode: entry.filemode() as u32,
        };

        if i == segments.len() - 1 {
            return Ok(Some(found));
        }
        // Intermediate segments must be trees
        if !found.is_tree() {
            return Ok(None);
        }
        current_oid = found.oid;
    }

    Ok(None)
}

/// Find the first proper prefix of `path` that names a non-tree entry.
///
/// Used to refuse writes that would turn an existing page into a directory.
pub fn blocking_prefix(repo: &Repository, tree_oid: Oid, path: &str) -> Result<Option<String>> {
    let segments: Vec<&str> = path.split('/').collect();
    for i in 1..segments.len() {
        let prefix = segments[..i].join("/");
        match entry_at_path(repo, tree_oid, &prefix)? {
            Some(entry) if !entry.is_tree() => return Ok(Some(prefix)),
            Some(_) => {}
            None => return Ok(None),
        }
    }
    Ok(None)
}

/// Read the raw bytes of a blob.
pub fn read_blob(repo: &Repository, oid: Oid) -> Result<Vec<u8>> {
    let blob = repo.find_blob(oid).map_err(Error::git)?;
    Ok(blob.content().to_vec())
}

/// List the immediate children of a tree, in tree order.
pub fn list_tree(repo: &Repository, tree_oid: Oid) -> Result<Vec<WalkEntry>> {
    let tree = repo.find_tree(tree_oid).map_err(Error::git)?;
    Ok(tree
        .iter()
        .map(|e| WalkEntry {
            name: String::from_utf8_lossy(e.name_bytes()).into_owned(),
            oid: e.id(),
            mode: e.filemode() as u32,
        })
        .collect())
}

/// Recursively walk a tree, returning all non-tree entries with full paths.
///
/// Each element is a `(full_path, WalkEntry)` pair where `full_path` is
/// the slash-separated path from the tree root (e.g. `"dir/sub/file.md"`).
pub fn walk_tree(repo: &Repository, tree_oid: Oid) -> Result<Vec<(String, WalkEntry)>> {
    let mut results = Vec::new();
    walk_tree_recursive(repo, tree_oid, "", &mut results)?;
    Ok(results)
}

fn walk_tree_recursive(
    repo: &Repository,
    tree_oid: Oid,
    prefix: &str,
    results: &mut Vec<(String, WalkEntry)>,
) -> Result<()> {
    for entry in list_tree(repo, tree_oid)? {
        let full_path = crate::paths::join(prefix, &entry.name);
        if entry.is_tree() {
            walk_tree_recursive(repo, entry.oid, &full_path, results)?;
        } else {
            results.push((full_path, entry));
        }
    }
    Ok(())
}

/// Rebuild a tree by applying blob writes.
///
/// Only the ancestor chain from changed leaves to root is rebuilt;
/// sibling subtrees are shared by hash reference.
///
/// # Arguments
/// * `repo` - The git repository.
/// * `base_tree` - OID of the existing tree, `None` for an empty tree.
/// * `writes` - Slice of `(path, TreeWrite)` pairs with normalized paths.
///
/// # Returns
/// OID of the new root tree.
pub fn rebuild_tree(repo: &Repository, base_tree: Option<Oid>, writes: &[(String, TreeWrite)]) -> Result<Oid> {
    // Group writes by first path segment
    let mut leaf_writes: BTreeMap<&str, TreeWrite> = BTreeMap::new();
    let mut sub_writes: BTreeMap<&str, Vec<(String, TreeWrite)>> = BTreeMap::new();

    for (path, tw) in writes {
        match path.split_once('/') {
            Some((dir, rest)) => sub_writes
                .entry(dir)
                .or_default()
                .push((rest.to_string(), *tw)),
            None => {
                leaf_writes.insert(path.as_str(), *tw);
            }
        }
    }

    let base = match base_tree {
        Some(oid) => Some(repo.find_tree(oid).map_err(Error::git)?),
        None => None,
    };
    let mut builder = repo.treebuilder(base.as_ref()).map_err(Error::git)?;

    for (name, tw) in &leaf_writes {
        builder
            .insert(*name, tw.oid, tw.mode as i32)
            .map_err(Error::git)?;
    }

    // Recurse into subdirectories
    for (dir, sub_changes) in &sub_writes {
        let existing_subtree = builder
            .get(*dir)
            .map_err(Error::git)?
            .filter(|e| e.filemode() as u32 == MODE_TREE)
            .map(|e| e.id());

        let new_subtree = rebuild_tree(repo, existing_subtree, sub_changes)?;
        builder
            .insert(*dir, new_subtree, MODE_TREE as i32)
            .map_err(Error::git)?;
    }

    builder.write().map_err(Error::git)
}
