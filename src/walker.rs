use crate::document::{Document, Tree};
use crate::error::Result;

/// One row of a directory listing.
#[derive(Debug, Clone)]
pub struct WalkItem {
    pub depth: usize,
    pub document: Document,
    /// `true` for the trees on the requested path; only those are expanded.
    pub is_open: bool,
}

/// Expands a tree into a flat, depth-annotated listing where only the
/// branch along a requested path is opened.
pub struct TreeWalker;

impl TreeWalker {
    /// Walk `tree` toward `requested`.
    ///
    /// Every child of an expanded tree is listed in tree order. A child is
    /// open when it is a tree whose path equals the first `depth + 1`
    /// requested segments below `tree`; open children are expanded directly
    /// below themselves. `requested` is always the full path from the root,
    /// also when `tree` is a subtree.
    pub fn walk<S: AsRef<str>>(tree: &Tree, requested: &[S]) -> Result<Vec<WalkItem>> {
        let requested: Vec<&str> = requested.iter().map(|s| s.as_ref()).collect();
        let base = crate::paths::segments(tree.path()).len();
        let mut out = Vec::new();
        walk_level(tree, &requested, base, 0, &mut out)?;
        Ok(out)
    }
}

fn walk_level(
    tree: &Tree,
    requested: &[&str],
    base: usize,
    depth: usize,
    out: &mut Vec<WalkItem>,
) -> Result<()> {
    let level = base + depth;
    let prefix = requested[..requested.len().min(level + 1)].join("/");

    for child in tree.children()? {
        let is_open = match &child {
            Document::Tree(t) => level < requested.len() && t.path() == prefix,
            Document::Page(_) => false,
        };

        let subtree = match (&child, is_open) {
            (Document::Tree(t), true) => Some(t.clone()),
            _ => None,
        };
        out.push(WalkItem {
            depth,
            document: child,
            is_open,
        });
        if let Some(t) = subtree {
            walk_level(&t, requested, base, depth + 1, out)?;
        }
    }
    Ok(())
}
