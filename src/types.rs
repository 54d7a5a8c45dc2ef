use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::revision::Revision;

// ---------------------------------------------------------------------------
// Mode constants
// ---------------------------------------------------------------------------

pub const MODE_BLOB: u32 = 0o100644;
pub const MODE_BLOB_EXEC: u32 = 0o100755;
pub const MODE_LINK: u32 = 0o120000;
pub const MODE_TREE: u32 = 0o040000;
/// Submodule (gitlink) entries; never treated as pages.
pub const MODE_COMMIT: u32 = 0o160000;

// ---------------------------------------------------------------------------
// Author
// ---------------------------------------------------------------------------

/// Author/committer identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Parse a `"Name <email>"` string.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] when the angle brackets are missing or
    /// misplaced, or when the name or email is empty.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || Error::validation(format!("author {:?} is not of the form 'Name <email>'", s));

        let s = s.trim();
        let open = s.find('<').ok_or_else(invalid)?;
        let close = s.rfind('>').ok_or_else(invalid)?;
        if close != s.len() - 1 || close < open {
            return Err(invalid());
        }

        let name = s[..open].trim();
        let email = s[open + 1..close].trim();
        if name.is_empty() || email.is_empty() || email.contains(['<', '>']) || name.contains('>') {
            return Err(invalid());
        }
        Ok(Self::new(name, email))
    }

    pub(crate) fn to_signature(&self) -> Result<git2::Signature<'static>> {
        git2::Signature::now(&self.name, &self.email).map_err(Error::git)
    }

    pub(crate) fn from_signature(sig: &git2::Signature<'_>) -> Self {
        Self {
            name: String::from_utf8_lossy(sig.name_bytes()).into_owned(),
            email: String::from_utf8_lossy(sig.email_bytes()).into_owned(),
        }
    }
}

impl Default for Author {
    fn default() -> Self {
        Self {
            name: "gitwiki".into(),
            email: "gitwiki@localhost".into(),
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

impl std::str::FromStr for Author {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// One immutable entry of the commit history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub sha: Revision,
    /// Commit message (trailing newline stripped).
    pub message: String,
    pub author: Author,
    /// Author time, seconds since the Unix epoch.
    pub time: i64,
    /// First parent; `None` for the root commit.
    pub parent: Option<Revision>,
}

impl Commit {
    pub(crate) fn from_git(commit: &git2::Commit<'_>) -> Self {
        let message = String::from_utf8_lossy(commit.message_bytes());
        Self {
            sha: Revision::from_oid(commit.id()),
            message: message.trim_end_matches('\n').to_string(),
            author: Author::from_signature(&commit.author()),
            time: commit.author().when().seconds(),
            parent: commit.parent_ids().next().map(Revision::from_oid),
        }
    }
}

// ---------------------------------------------------------------------------
// OpenOptions
// ---------------------------------------------------------------------------

/// Options for opening or creating a [`VersionStore`](crate::VersionStore).
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Create the repository if it doesn't exist.
    pub create: bool,
    /// Branch holding the wiki (default `master`).
    pub branch: Option<String>,
    /// Suffix appended to page blob names, e.g. `".md"`.
    pub extension: Option<String>,
    /// Page committed when a repository is created.
    pub main_page: Option<String>,
    /// Directory for cached archives (default `<repo>/archives`).
    pub archive_dir: Option<PathBuf>,
    /// Default author name for store-initiated commits.
    pub author: Option<String>,
    /// Default author email for store-initiated commits.
    pub email: Option<String>,
}
