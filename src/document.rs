//! Page and tree snapshots.
//!
//! Documents are built per request from [`VersionStore`] reads (or as
//! placeholders for pages that do not exist yet) and are never mutated in
//! place: a committed revision always yields the same content.

use std::fmt;

use git2::Oid;

use crate::error::Result;
use crate::paths;
use crate::revision::Revision;
use crate::store::VersionStore;
use crate::types::Commit;

// ---------------------------------------------------------------------------
// MimeKind
// ---------------------------------------------------------------------------

/// Coarse content type of a page, used by renderers to pick an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MimeKind {
    Markdown,
    Textile,
    Sass,
    Css,
    Html,
    PlainText,
    Png,
    Jpeg,
    Gif,
    Svg,
    Binary,
}

impl MimeKind {
    /// Detect from the blob name, falling back to sniffing `content`.
    pub fn detect(name: &str, content: &[u8]) -> Self {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "md" | "markdown" | "mdown" | "mkd" => Self::Markdown,
            "textile" => Self::Textile,
            "sass" => Self::Sass,
            "css" => Self::Css,
            "html" | "htm" => Self::Html,
            "txt" | "text" => Self::PlainText,
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "gif" => Self::Gif,
            "svg" => Self::Svg,
            _ if looks_binary(content) => Self::Binary,
            _ => Self::PlainText,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Markdown => "text/x-markdown",
            Self::Textile => "text/x-textile",
            Self::Sass => "text/x-sass",
            Self::Css => "text/css",
            Self::Html => "text/html",
            Self::PlainText => "text/plain",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Svg => "image/svg+xml",
            Self::Binary => "application/octet-stream",
        }
    }

    pub fn is_text(self) -> bool {
        self.mime_type().starts_with("text/")
    }

    pub fn is_image(self) -> bool {
        self.mime_type().starts_with("image/")
    }
}

impl fmt::Display for MimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

fn looks_binary(content: &[u8]) -> bool {
    content.iter().take(8000).any(|&b| b == 0)
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// A single document at one point in history.
#[derive(Debug, Clone)]
pub struct Page {
    pub(crate) path: String,
    pub(crate) blob_path: String,
    pub(crate) mime: MimeKind,
    pub(crate) content: Vec<u8>,
    pub(crate) oid: Option<Oid>,
    pub(crate) commit: Option<Commit>,
}

impl Page {
    /// A page that has never been committed.
    pub(crate) fn placeholder(path: String, blob_path: String) -> Self {
        let mime = MimeKind::detect(&blob_path, &[]);
        Self {
            path,
            blob_path,
            mime,
            content: Vec::new(),
            oid: None,
            commit: None,
        }
    }

    /// Logical path, without the page extension.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Name of the blob holding the page.
    pub fn blob_path(&self) -> &str {
        &self.blob_path
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Display title: the full logical path.
    pub fn title(&self) -> &str {
        &self.path
    }

    pub fn mime(&self) -> MimeKind {
        self.mime
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Content as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    /// Blob object id, `None` for a new page.
    pub fn object_hash(&self) -> Option<String> {
        self.oid.map(|o| o.to_string())
    }

    /// The most recent commit that changed this page, as of the revision it
    /// was read at.
    pub fn commit(&self) -> Option<&Commit> {
        self.commit.as_ref()
    }

    /// The revision a writer must present to edit this page.
    pub fn baseline_revision(&self) -> Option<&Revision> {
        self.commit.as_ref().map(|c| &c.sha)
    }

    /// `true` if no commit had touched this path when the page was built.
    pub fn is_new(&self) -> bool {
        self.commit.is_none()
    }

    /// Replace a byte range of the content with `fragment`.
    ///
    /// See [`splice`] for the clamping rules.
    pub fn splice(&self, pos: i64, len: Option<i64>, fragment: &[u8]) -> Vec<u8> {
        splice(&self.content, pos, len, fragment)
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// `content[..p] + fragment + content[p + l..]` where `p` is `pos` clamped
/// to `0..=content.len()` and `l` is `len` clamped to `0..=content.len() - p`,
/// defaulting to the rest of the content.
pub fn splice(content: &[u8], pos: i64, len: Option<i64>, fragment: &[u8]) -> Vec<u8> {
    let total = content.len();
    let pos = pos.clamp(0, total as i64) as usize;
    let rest = total - pos;
    let len = match len {
        Some(l) => (l.max(0) as usize).min(rest),
        None => rest,
    };

    let mut out = Vec::with_capacity(total - len + fragment.len());
    out.extend_from_slice(&content[..pos]);
    out.extend_from_slice(fragment);
    out.extend_from_slice(&content[pos + len..]);
    out
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// A directory of documents as of one revision.
///
/// Children are read on demand through the store; since the tree object is
/// immutable, repeated calls yield the same listing.
#[derive(Clone)]
pub struct Tree {
    pub(crate) store: VersionStore,
    pub(crate) path: String,
    pub(crate) oid: Oid,
    pub(crate) commit: Commit,
}

impl Tree {
    /// Path of the directory; empty for the root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment, or `""` for the root.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }

    /// The revision this snapshot was read at.
    pub fn revision(&self) -> &Revision {
        &self.commit.sha
    }

    /// The commit this snapshot was read at.
    pub fn commit(&self) -> &Commit {
        &self.commit
    }

    /// Tree object id (hex); identical trees share it across revisions.
    pub fn tree_hash(&self) -> String {
        self.oid.to_string()
    }

    /// File-name-safe form of the path.
    pub fn safe_name(&self) -> String {
        paths::safe_name(&self.path)
    }

    /// Immediate children, in tree order.
    pub fn children(&self) -> Result<Vec<Document>> {
        self.store.tree_children(self)
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("path", &self.path)
            .field("oid", &self.oid)
            .field("revision", &self.commit.sha)
            .finish()
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Either kind of object a path can resolve to.
#[derive(Debug, Clone)]
pub enum Document {
    Page(Page),
    Tree(Tree),
}

impl Document {
    pub fn path(&self) -> &str {
        match self {
            Document::Page(p) => p.path(),
            Document::Tree(t) => t.path(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Document::Page(p) => p.name(),
            Document::Tree(t) => t.name(),
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, Document::Tree(_))
    }

    pub fn as_page(&self) -> Option<&Page> {
        match self {
            Document::Page(p) => Some(p),
            Document::Tree(_) => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Document::Tree(t) => Some(t),
            Document::Page(_) => None,
        }
    }

    pub fn into_page(self) -> Option<Page> {
        match self {
            Document::Page(p) => Some(p),
            Document::Tree(_) => None,
        }
    }

    pub fn into_tree(self) -> Option<Tree> {
        match self {
            Document::Tree(t) => Some(t),
            Document::Page(_) => None,
        }
    }

    /// The most recent commit relevant to this document: the last change of
    /// a page, or the revision a tree was read at.
    pub fn commit(&self) -> Option<&Commit> {
        match self {
            Document::Page(p) => p.commit(),
            Document::Tree(t) => Some(t.commit()),
        }
    }
}
