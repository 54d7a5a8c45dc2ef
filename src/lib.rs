//! A versioned wiki document store on a bare git repository.
//!
//! `gitwiki` keeps wiki pages as blobs on one branch of a bare git
//! repository. Every successful write is exactly one commit, reads address
//! any past revision, and concurrent edits are caught by comparing the
//! caller's baseline revision with the page's last change.
//!
//! # Key types
//!
//! - [`VersionStore`]: opens (or creates) the repository; resolves paths
//!   to [`Document`]s and commits new page content.
//! - [`PathResolver`]: splits revision qualifiers off request strings and
//!   guards page names against system routes.
//! - [`TreeWalker`]: flattens a [`Tree`] into a depth-annotated listing
//!   expanded along one path.
//! - [`ArchiveExporter`]: cached compressed exports of a tree snapshot.
//! - [`Wiki`]: the above behind one handle.
//!
//! # Quick example
//!
//! ```rust,no_run
//! use gitwiki::{OpenOptions, Wiki};
//!
//! let wiki = Wiki::open("/tmp/wiki.git", OpenOptions {
//!     create: true,
//!     extension: Some(".md".into()),
//!     ..Default::default()
//! }).unwrap();
//!
//! let page = wiki.store().find_or_new("Home").unwrap();
//! let commit = wiki.save_page(&page, b"# Welcome", None, "Ada <ada@example.org>").unwrap();
//! assert_eq!(commit.message, "Created Home");
//!
//! let page = wiki.store().resolve_page("Home", None).unwrap();
//! assert_eq!(page.text(), "# Welcome");
//! ```

pub mod archive;
pub mod document;
pub mod error;
pub mod history;
pub mod lock;
pub mod paths;
pub mod resolver;
pub mod revision;
pub mod route;
pub mod store;
pub mod tree;
pub mod types;
pub mod walker;
pub mod wiki;

// Re-export primary public types at crate root.
pub use archive::{ArchiveExporter, ArchiveFormat};
pub use document::{Document, MimeKind, Page, Tree};
pub use error::{Error, Result};
pub use resolver::{PathResolver, RequestTarget};
pub use revision::Revision;
pub use route::{Method, RoutePattern, RouteTable};
pub use store::VersionStore;
pub use types::*;
pub use walker::{TreeWalker, WalkItem};
pub use wiki::Wiki;
