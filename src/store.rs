use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use git2::{ErrorCode, Oid, Repository};
use log::{debug, info, warn};

use crate::document::{Document, MimeKind, Page, Tree};
use crate::error::{Error, Result};
use crate::history;
use crate::lock::with_repo_lock;
use crate::paths;
use crate::revision::Revision;
use crate::tree::{self, TreeWrite};
use crate::types::{Author, Commit, OpenOptions, MODE_BLOB, MODE_COMMIT};

/// Text of the page committed when a repository is created with a main page.
pub const MAIN_PAGE_TEXT: &str = "This is the main page of the wiki.";

/// Internal state shared via `Arc`.
pub(crate) struct StoreInner {
    pub(crate) path: PathBuf,
    pub(crate) branch: String,
    pub(crate) refname: String,
    pub(crate) extension: Option<String>,
    pub(crate) archive_dir: PathBuf,
    pub(crate) signature: Author,
    pub(crate) write_lock: Mutex<()>,
}

/// The versioned document store: one branch of a bare git repository.
///
/// Cheap to clone (`Arc` internally). Reads work on immutable commits and
/// never wait for writers; writes are serialized by a store-wide lock.
#[derive(Clone)]
pub struct VersionStore {
    pub(crate) inner: Arc<StoreInner>,
}

impl VersionStore {
    /// Open (or create) a bare git repository at `path`.
    pub fn open(path: impl AsRef<Path>, options: OpenOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let branch = options.branch.unwrap_or_else(|| "master".into());
        paths::validate_branch_name(&branch)?;

        let signature = {
            let default = Author::default();
            Author::new(
                options.author.unwrap_or(default.name),
                options.email.unwrap_or(default.email),
            )
        };
        let refname = format!("refs/heads/{}", branch);

        let created = if path.exists() {
            Repository::open_bare(&path).map_err(Error::git)?;
            false
        } else if options.create {
            std::fs::create_dir_all(&path).map_err(|e| Error::io(&path, e))?;
            let repo = Repository::init_bare(&path).map_err(Error::git)?;
            repo.set_head(&refname).map_err(Error::git)?;
            info!("initialized repository at {} on branch {}", path.display(), branch);
            true
        } else {
            return Err(Error::not_found(format!(
                "repository not found: {}",
                path.display()
            )));
        };

        let archive_dir = options
            .archive_dir
            .unwrap_or_else(|| path.join("archives"));

        let store = VersionStore {
            inner: Arc::new(StoreInner {
                path,
                branch,
                refname,
                extension: options.extension.filter(|e| !e.is_empty()),
                archive_dir,
                signature,
                write_lock: Mutex::new(()),
            }),
        };

        if created {
            if let Some(main_page) = options.main_page {
                let author = store.inner.signature.to_string();
                store.write(&main_page, MAIN_PAGE_TEXT.as_bytes(), None, "Initialize Repository", &author)?;
            }
        }

        Ok(store)
    }

    /// Path to the bare repository on disk.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Branch holding the wiki.
    pub fn branch(&self) -> &str {
        &self.inner.branch
    }

    /// Page extension, if configured.
    pub fn extension(&self) -> Option<&str> {
        self.inner.extension.as_deref()
    }

    /// Directory holding cached archives.
    pub fn archive_dir(&self) -> &Path {
        &self.inner.archive_dir
    }

    /// The identity used for commits the store makes on its own.
    pub fn signature(&self) -> &Author {
        &self.inner.signature
    }

    /// Open a repository handle and call `f` with it.
    ///
    /// Each call gets its own handle, so readers never queue behind a
    /// writer holding the write lock.
    pub(crate) fn with_repo<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Repository) -> Result<T>,
    {
        let repo = Repository::open_bare(&self.inner.path).map_err(Error::git)?;
        f(&repo)
    }

    // -- Revisions ----------------------------------------------------------

    fn head_oid(&self, repo: &Repository) -> Result<Option<Oid>> {
        match repo.find_reference(&self.inner.refname) {
            Ok(reference) => Ok(reference.target()),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(Error::git(e)),
        }
    }

    /// Find the commit named by `revision`, or the head when `None`.
    ///
    /// `path` is only used to describe a failed lookup.
    fn find_commit<'r>(
        &self,
        repo: &'r Repository,
        revision: Option<&Revision>,
        path: &str,
    ) -> Result<git2::Commit<'r>> {
        let not_found = || Error::not_found_at(path, revision.map(Revision::as_str));

        let Some(rev) = revision else {
            let oid = self.head_oid(repo)?.ok_or_else(not_found)?;
            return repo.find_commit(oid).map_err(Error::git);
        };

        let found = if rev.is_strict() {
            repo.find_commit(rev.to_oid()?)
        } else {
            repo.revparse_single(rev.as_str())
                .and_then(|obj| obj.peel_to_commit())
        };

        match found {
            Ok(commit) => Ok(commit),
            Err(e) => match e.code() {
                ErrorCode::NotFound | ErrorCode::InvalidSpec | ErrorCode::Peel => Err(not_found()),
                ErrorCode::Ambiguous => Err(Error::invalid_revision(format!(
                    "{} is ambiguous",
                    rev
                ))),
                _ => Err(Error::git(e)),
            },
        }
    }

    /// The current head commit, `None` for an empty repository.
    pub fn head(&self) -> Result<Option<Commit>> {
        self.with_repo(|repo| match self.head_oid(repo)? {
            Some(oid) => {
                let commit = repo.find_commit(oid).map_err(Error::git)?;
                Ok(Some(Commit::from_git(&commit)))
            }
            None => Ok(None),
        })
    }

    /// Look up a commit by strict or abbreviated revision.
    pub fn commit(&self, revision: &Revision) -> Result<Commit> {
        self.with_repo(|repo| {
            let commit = self.find_commit(repo, Some(revision), "")?;
            Ok(Commit::from_git(&commit))
        })
    }

    // -- Read ---------------------------------------------------------------

    /// Resolve `path` at `revision` (head when `None`) to a page or tree.
    ///
    /// With an extension configured, `path + extension` is tried first, so a
    /// page and a directory of the same name resolve to the page.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if nothing exists at `path`.
    pub fn resolve(&self, path: &str, revision: Option<&Revision>) -> Result<Document> {
        let path = paths::normalize_path(path)?;
        self.with_repo(|repo| {
            let commit = self.find_commit(repo, revision, &path)?;
            let doc = self.document_at(repo, &commit, &path)?.ok_or_else(|| {
                Error::not_found_at(&path, revision.map(Revision::as_str))
            })?;
            debug!(
                "resolved {:?} at {} to {}",
                path,
                commit.id(),
                if doc.is_tree() { "tree" } else { "page" }
            );
            Ok(doc)
        })
    }

    /// Resolve `path` and require a tree.
    pub fn resolve_tree(&self, path: &str, revision: Option<&Revision>) -> Result<Tree> {
        match self.resolve(path, revision)? {
            Document::Tree(tree) => Ok(tree),
            Document::Page(page) => Err(Error::not_a_directory(page.path)),
        }
    }

    /// Resolve `path` at head and require a page.
    pub fn resolve_page(&self, path: &str, revision: Option<&Revision>) -> Result<Page> {
        match self.resolve(path, revision)? {
            Document::Page(page) => Ok(page),
            Document::Tree(tree) => Err(Error::is_a_directory(tree.path)),
        }
    }

    /// A "believed new" page for `path`, without consulting history.
    pub fn new_page(&self, path: &str) -> Result<Page> {
        let path = paths::normalize_path(path)?;
        if path.is_empty() {
            return Err(Error::invalid_path("the root is not a page"));
        }
        let blob_path = paths::physical_path(&path, self.extension());
        Ok(Page::placeholder(path, blob_path))
    }

    /// The page at `path` at head, or a new page if there is none yet.
    pub fn find_or_new(&self, path: &str) -> Result<Page> {
        match self.resolve_page(path, None) {
            Ok(page) => Ok(page),
            Err(e) if e.is_not_found() => self.new_page(path),
            Err(e) => Err(e),
        }
    }

    /// Build the document at `path` in `commit`, or `None` if absent.
    fn document_at(
        &self,
        repo: &Repository,
        commit: &git2::Commit<'_>,
        path: &str,
    ) -> Result<Option<Document>> {
        let tree_oid = commit.tree_id();

        if path.is_empty() {
            return Ok(Some(Document::Tree(self.make_tree(path.to_string(), tree_oid, commit))));
        }

        let blob_path = paths::physical_path(path, self.extension());
        let mut candidates = vec![blob_path];
        if candidates[0] != path {
            candidates.push(path.to_string());
        }

        for candidate in candidates {
            let Some(entry) = tree::entry_at_path(repo, tree_oid, &candidate)? else {
                continue;
            };
            if entry.is_tree() {
                if candidate == path {
                    return Ok(Some(Document::Tree(self.make_tree(path.to_string(), entry.oid, commit))));
                }
                continue;
            }

            let content = tree::read_blob(repo, entry.oid)?;
            let last = history::last_change(repo, commit.id(), &candidate)?;
            let last = match last {
                Some(oid) => Some(Commit::from_git(&repo.find_commit(oid).map_err(Error::git)?)),
                None => None,
            };
            return Ok(Some(Document::Page(Page {
                path: path.to_string(),
                mime: MimeKind::detect(&candidate, &content),
                blob_path: candidate,
                content,
                oid: Some(entry.oid),
                commit: last,
            })));
        }
        Ok(None)
    }

    fn make_tree(&self, path: String, oid: Oid, commit: &git2::Commit<'_>) -> Tree {
        Tree {
            store: self.clone(),
            path,
            oid,
            commit: Commit::from_git(commit),
        }
    }

    /// Immediate children of `tree`, in tree order.
    pub(crate) fn tree_children(&self, tree: &Tree) -> Result<Vec<Document>> {
        self.with_repo(|repo| {
            let commit_oid = tree.commit.sha.to_oid()?;
            let entries = tree::list_tree(repo, tree.oid)?;

            let blob_paths: Vec<String> = entries
                .iter()
                .filter(|e| !e.is_tree())
                .map(|e| paths::join(&tree.path, &e.name))
                .collect();
            let last = history::last_changes(repo, commit_oid, &blob_paths)?;
            let mut commits: HashMap<Oid, Commit> = HashMap::new();

            let mut children = Vec::with_capacity(entries.len());
            for entry in entries {
                let blob_path = paths::join(&tree.path, &entry.name);
                if entry.is_tree() {
                    children.push(Document::Tree(Tree {
                        store: self.clone(),
                        path: blob_path,
                        oid: entry.oid,
                        commit: tree.commit.clone(),
                    }));
                    continue;
                }
                if entry.mode == MODE_COMMIT {
                    continue;
                }

                let commit = match last.get(&blob_path) {
                    Some(oid) => {
                        if !commits.contains_key(oid) {
                            let c = repo.find_commit(*oid).map_err(Error::git)?;
                            commits.insert(*oid, Commit::from_git(&c));
                        }
                        commits.get(oid).cloned()
                    }
                    None => None,
                };
                let content = tree::read_blob(repo, entry.oid)?;
                let name = paths::logical_name(&entry.name, self.extension());
                children.push(Document::Page(Page {
                    path: paths::join(&tree.path, name),
                    mime: MimeKind::detect(&entry.name, &content),
                    blob_path,
                    content,
                    oid: Some(entry.oid),
                    commit,
                }));
            }
            Ok(children)
        })
    }

    // -- Write --------------------------------------------------------------

    /// Commit `content` at `path`.
    ///
    /// `baseline` is the revision the caller last observed for this path:
    /// `None` means the caller believes the path is new. Checks run in this
    /// order, before anything is staged:
    ///
    /// 1. `message` must be non-blank and `author` must read `Name <email>`
    ///    ([`Error::Validation`]); a baseline must be a strict revision.
    /// 2. No baseline but the path already has content: [`Error::Duplicate`].
    /// 3. Baseline differs from the path's last change: [`Error::Conflict`].
    /// 4. Content identical to head: nothing is committed and the path's
    ///    last commit is returned.
    ///
    /// Otherwise one commit is created on top of the current head.
    pub fn write(
        &self,
        path: &str,
        content: &[u8],
        baseline: Option<&Revision>,
        message: &str,
        author: &str,
    ) -> Result<Commit> {
        if message.trim().is_empty() {
            return Err(Error::validation("commit message is empty"));
        }
        let author = Author::parse(author)?;
        if let Some(rev) = baseline {
            if !rev.is_strict() {
                return Err(Error::validation(format!(
                    "baseline revision {} is abbreviated",
                    rev
                )));
            }
        }

        let path = paths::normalize_path(path)?;
        if path.is_empty() {
            return Err(Error::invalid_path("cannot write to the root"));
        }
        let blob_path = paths::physical_path(&path, self.extension());

        self.with_repo(|repo| {
            with_repo_lock(&self.inner.path, &self.inner.write_lock, || {
                let head = match self.head_oid(repo)? {
                    Some(oid) => Some(repo.find_commit(oid).map_err(Error::git)?),
                    None => None,
                };

                let (existing, last) = match &head {
                    Some(commit) => {
                        if let Some(prefix) = tree::blocking_prefix(repo, commit.tree_id(), &blob_path)? {
                            return Err(Error::not_a_directory(prefix));
                        }
                        if let Some(prefix) = self.page_prefix(repo, commit.tree_id(), &path)? {
                            return Err(Error::not_a_directory(prefix));
                        }
                        if blob_path != path
                            && tree::entry_at_path(repo, commit.tree_id(), &path)?.is_some_and(|e| e.is_tree())
                        {
                            return Err(Error::is_a_directory(&path));
                        }
                        (
                            tree::entry_at_path(repo, commit.tree_id(), &blob_path)?,
                            history::last_change(repo, commit.id(), &blob_path)?,
                        )
                    }
                    None => (None, None),
                };
                if existing.is_some_and(|e| e.is_tree()) {
                    return Err(Error::is_a_directory(&path));
                }

                match baseline {
                    None if existing.is_some() => {
                        warn!("rejected write to {}: page already exists", path);
                        return Err(Error::duplicate(format!("{} already exists", path)));
                    }
                    None => {}
                    Some(rev) => {
                        if last.map(Revision::from_oid).as_ref() != Some(rev) {
                            warn!("rejected write to {}: baseline {} is stale", path, rev.short());
                            return Err(Error::conflict(format!(
                                "{} was changed since {}",
                                path,
                                rev.short()
                            )));
                        }
                    }
                }

                let blob_oid = Oid::hash_object(git2::ObjectType::Blob, content).map_err(Error::git)?;
                if let (Some(entry), Some(last)) = (existing, last) {
                    if entry.oid == blob_oid {
                        debug!("write to {} is a no-op", path);
                        return Ok(Commit::from_git(&repo.find_commit(last).map_err(Error::git)?));
                    }
                }

                let written = repo.blob(content).map_err(Error::git)?;
                let mode = existing.map(|e| e.mode).unwrap_or(MODE_BLOB);
                let new_tree = tree::rebuild_tree(
                    repo,
                    head.as_ref().map(|c| c.tree_id()),
                    &[(blob_path.clone(), TreeWrite { oid: written, mode })],
                )?;
                let new_tree = repo.find_tree(new_tree).map_err(Error::git)?;

                let sig = author.to_signature()?;
                let parents: Vec<&git2::Commit<'_>> = head.iter().collect();
                let oid = repo
                    .commit(Some(self.inner.refname.as_str()), &sig, &sig, message, &new_tree, &parents)
                    .map_err(|e| match e.code() {
                        ErrorCode::Modified => Error::conflict(format!(
                            "branch {} moved during commit",
                            self.inner.branch
                        )),
                        _ => Error::git(e),
                    })?;

                info!("committed {} to {} by {}", oid, blob_path, author);
                Ok(Commit::from_git(&repo.find_commit(oid).map_err(Error::git)?))
            })
        })
    }

    /// The first proper prefix of `path` stored as a page blob. A page and a
    /// directory never share one logical path.
    fn page_prefix(&self, repo: &Repository, tree_oid: Oid, path: &str) -> Result<Option<String>> {
        if self.extension().map_or(true, str::is_empty) {
            return Ok(None);
        }
        let segs = paths::segments(path);
        let mut prefix = String::new();
        for seg in &segs[..segs.len().saturating_sub(1)] {
            prefix = paths::join(&prefix, seg);
            let blob_path = paths::physical_path(&prefix, self.extension());
            if let Some(entry) = tree::entry_at_path(repo, tree_oid, &blob_path)? {
                if !entry.is_tree() {
                    return Ok(Some(prefix));
                }
            }
        }
        Ok(None)
    }

    // -- History ------------------------------------------------------------

    /// Commits that changed `path`, most recent first. The empty path
    /// yields every commit that changed anything.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if `path` does not exist at head.
    pub fn history(&self, path: &str) -> Result<Vec<Commit>> {
        self.history_limit(path, None)
    }

    /// Like [`history`](Self::history), stopping after `limit` commits.
    pub fn history_limit(&self, path: &str, limit: Option<usize>) -> Result<Vec<Commit>> {
        let path = paths::normalize_path(path)?;
        self.with_repo(|repo| {
            let head = self.head_oid(repo)?.ok_or_else(|| Error::not_found(&path))?;
            let commit = repo.find_commit(head).map_err(Error::git)?;
            let target = self
                .stored_path(repo, commit.tree_id(), &path)?
                .ok_or_else(|| Error::not_found(&path))?;
            history::path_history(repo, head, &target, limit)
        })
    }

    /// The name `path` is stored under in `tree_oid`: the page blob if one
    /// exists, else the raw path.
    fn stored_path(&self, repo: &Repository, tree_oid: Oid, path: &str) -> Result<Option<String>> {
        let blob_path = paths::physical_path(path, self.extension());
        if blob_path != path {
            if let Some(entry) = tree::entry_at_path(repo, tree_oid, &blob_path)? {
                if !entry.is_tree() {
                    return Ok(Some(blob_path));
                }
            }
        }
        Ok(tree::entry_at_path(repo, tree_oid, path)?.map(|_| path.to_string()))
    }

    // -- Diff ---------------------------------------------------------------

    /// Unified diff between two revisions, limited to `path` when given.
    pub fn diff(&self, path: Option<&str>, from: &Revision, to: &Revision) -> Result<String> {
        let path = path.map(paths::normalize_path).transpose()?;
        self.with_repo(|repo| {
            let scope = path.as_deref().unwrap_or("");
            let old = self.find_commit(repo, Some(from), scope)?;
            let new = self.find_commit(repo, Some(to), scope)?;
            let old_tree = old.tree().map_err(Error::git)?;
            let new_tree = new.tree().map_err(Error::git)?;

            let mut opts = git2::DiffOptions::new();
            if let Some(p) = path.as_deref().filter(|p| !p.is_empty()) {
                // Page names may contain glob characters.
                opts.disable_pathspec_match(true);
                opts.pathspec(p);
                let blob_path = paths::physical_path(p, self.extension());
                if blob_path != p {
                    opts.pathspec(blob_path);
                }
            }
            let diff = repo
                .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut opts))
                .map_err(Error::git)?;
            render_patch(&diff)
        })
    }

    /// A commit and its diff against its first parent (the whole tree for
    /// a root commit).
    pub fn show(&self, revision: &Revision) -> Result<(Commit, String)> {
        self.with_repo(|repo| {
            let commit = self.find_commit(repo, Some(revision), "")?;
            let tree = commit.tree().map_err(Error::git)?;
            let parent_tree = match commit.parent(0) {
                Ok(parent) => Some(parent.tree().map_err(Error::git)?),
                Err(_) => None,
            };
            let diff = repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
                .map_err(Error::git)?;
            Ok((Commit::from_git(&commit), render_patch(&diff)?))
        })
    }
}

/// Render a diff as unified patch text.
fn render_patch(diff: &git2::Diff<'_>) -> Result<String> {
    let mut out = String::new();
    diff.print(git2::DiffFormat::Patch, |_delta, _hunk, line| {
        if matches!(line.origin(), '+' | '-' | ' ') {
            out.push(line.origin());
        }
        out.push_str(&String::from_utf8_lossy(line.content()));
        true
    })
    .map_err(Error::git)?;
    Ok(out)
}

impl fmt::Debug for VersionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionStore")
            .field("path", &self.inner.path)
            .field("branch", &self.inner.branch)
            .field("extension", &self.inner.extension)
            .finish()
    }
}
