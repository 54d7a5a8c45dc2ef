//! The operations a request-handling layer calls.
//!
//! [`Wiki`] ties a [`VersionStore`] to a [`PathResolver`] and an
//! [`ArchiveExporter`]: request strings are classified and checked against
//! reserved routes before they reach the store.

use std::path::{Path, PathBuf};

use log::debug;

use crate::archive::{ArchiveExporter, ArchiveFormat};
use crate::document::{Document, Page};
use crate::error::{Error, Result};
use crate::paths;
use crate::resolver::{PathResolver, RequestTarget};
use crate::revision::Revision;
use crate::store::VersionStore;
use crate::types::{Commit, OpenOptions};
use crate::walker::{TreeWalker, WalkItem};

/// A wiki over one store.
///
/// Cheap to clone; clones share the underlying store.
#[derive(Debug, Clone)]
pub struct Wiki {
    store: VersionStore,
    resolver: PathResolver,
    exporter: ArchiveExporter,
}

impl Wiki {
    /// Open (or create) the repository at `path` with the default routes.
    pub fn open(path: impl AsRef<Path>, options: OpenOptions) -> Result<Self> {
        Ok(Self::new(VersionStore::open(path, options)?))
    }

    pub fn new(store: VersionStore) -> Self {
        Self::with_resolver(store, PathResolver::wiki_default())
    }

    pub fn with_resolver(store: VersionStore, resolver: PathResolver) -> Self {
        let exporter = ArchiveExporter::for_store(&store);
        Self {
            store,
            resolver,
            exporter,
        }
    }

    pub fn store(&self) -> &VersionStore {
        &self.store
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn exporter(&self) -> &ArchiveExporter {
        &self.exporter
    }

    // -- Read ---------------------------------------------------------------

    pub fn resolve(&self, path: &str, revision: Option<&Revision>) -> Result<Document> {
        self.store.resolve(path, revision)
    }

    /// Resolve a raw request string such as `docs/Guide/3f2a9c1`.
    ///
    /// The resolver's candidate readings are tried in order and the first
    /// that resolves wins. When none does, the error for the first reading
    /// is returned.
    pub fn resolve_request(&self, raw: &str) -> Result<(RequestTarget, Document)> {
        let mut first_err = None;
        for target in self.resolver.candidates(raw)? {
            match self.store.resolve(&target.path, target.revision.as_ref()) {
                Ok(doc) => return Ok((target, doc)),
                Err(e) if e.is_not_found() => {
                    debug!("request {:?}: no match for {:?}", raw, target);
                    first_err.get_or_insert(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(first_err.unwrap_or_else(|| Error::not_found(raw)))
    }

    /// `true` if `path` collides with a system route.
    pub fn is_reserved_path(&self, path: &str) -> bool {
        self.resolver.is_reserved_path(path)
    }

    /// Listing of the root tree at `revision`, expanded along `requested`.
    pub fn walk(&self, requested: &str, revision: Option<&Revision>) -> Result<Vec<WalkItem>> {
        let requested = paths::normalize_path(requested)?;
        let root = self.store.resolve_tree("", revision)?;
        TreeWalker::walk(&root, paths::segments(&requested).as_slice())
    }

    // -- Write --------------------------------------------------------------

    /// Commit `content` at `path` after checking it against reserved routes.
    ///
    /// See [`VersionStore::write`] for the baseline rules.
    ///
    /// # Errors
    /// Returns [`Error::Forbidden`] for reserved paths, otherwise whatever
    /// the store reports.
    pub fn write(
        &self,
        path: &str,
        content: &[u8],
        baseline: Option<&Revision>,
        message: &str,
        author: &str,
    ) -> Result<Commit> {
        let path = self.resolver.check_path(path)?;
        self.store.write(&path, content, baseline, message, author)
    }

    /// Save new content for `page`, using its baseline.
    ///
    /// Without a `message`, `Created <path>` or `Updated <path>` is used
    /// depending on whether the page was new.
    pub fn save_page(
        &self,
        page: &Page,
        content: &[u8],
        message: Option<&str>,
        author: &str,
    ) -> Result<Commit> {
        let message = paths::format_commit_message(page.is_new(), page.path(), message);
        self.write(page.path(), content, page.baseline_revision(), &message, author)
    }

    /// Store an uploaded file at `path`, creating or replacing it at head.
    pub fn upload(&self, path: &str, content: &[u8], author: &str) -> Result<Commit> {
        let page = self.store.find_or_new(path)?;
        let message = if page.is_new() {
            format!("File {} uploaded", page.path())
        } else {
            "File uploaded".to_string()
        };
        self.write(page.path(), content, page.baseline_revision(), &message, author)
    }

    /// Replace a byte range of the page at head and commit the result.
    ///
    /// `pos` and `len` are clamped as described for
    /// [`splice`](crate::document::splice); `len = None` replaces the rest
    /// of the page. `baseline` is checked as for any edit, so a stale
    /// baseline fails with [`Error::Conflict`].
    #[allow(clippy::too_many_arguments)]
    pub fn edit_range(
        &self,
        path: &str,
        baseline: &Revision,
        pos: i64,
        len: Option<i64>,
        fragment: &[u8],
        message: &str,
        author: &str,
    ) -> Result<Commit> {
        let path = self.resolver.check_path(path)?;
        let page = self.store.resolve_page(&path, None)?;
        let content = page.splice(pos, len, fragment);
        self.store.write(&path, &content, Some(baseline), message, author)
    }

    // -- History ------------------------------------------------------------

    pub fn history(&self, path: &str) -> Result<Vec<Commit>> {
        self.store.history(path)
    }

    pub fn diff(&self, path: Option<&str>, from: &Revision, to: &Revision) -> Result<String> {
        self.store.diff(path, from, to)
    }

    pub fn show(&self, revision: &Revision) -> Result<(Commit, String)> {
        self.store.show(revision)
    }

    // -- Archive ------------------------------------------------------------

    /// Export the tree at `path` (root when empty) and return the artifact.
    pub fn archive(
        &self,
        path: &str,
        revision: Option<&Revision>,
        format: ArchiveFormat,
    ) -> Result<PathBuf> {
        let tree = self.store.resolve_tree(path, revision)?;
        self.exporter.archive(&tree, format)
    }
}
