use std::path::PathBuf;

/// All errors produced by gitwiki.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {}", describe_target(.path, .revision.as_deref()))]
    NotFound {
        path: String,
        revision: Option<String>,
    },

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("path is not allowed: {0}")]
    Forbidden(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid revision: {0}")]
    InvalidRevision(String),

    #[error("git error: {0}")]
    Git(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn describe_target(path: &str, revision: Option<&str>) -> String {
    let path = if path.is_empty() { "/" } else { path };
    match revision {
        Some(rev) => format!("{} at {}", path, rev),
        None => path.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Convenience constructors
// ---------------------------------------------------------------------------

impl Error {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound {
            path: path.into(),
            revision: None,
        }
    }

    pub fn not_found_at(path: impl Into<String>, revision: Option<&str>) -> Self {
        Self::NotFound {
            path: path.into(),
            revision: revision.map(str::to_string),
        }
    }

    pub fn duplicate(msg: impl Into<String>) -> Self {
        Self::Duplicate(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(path: impl Into<String>) -> Self {
        Self::Forbidden(path.into())
    }

    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    pub fn invalid_revision(rev: impl Into<String>) -> Self {
        Self::InvalidRevision(rev.into())
    }

    pub fn git(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Git(Box::new(err))
    }

    pub fn git_msg(msg: impl Into<String>) -> Self {
        Self::Git(msg.into().into())
    }

    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {}", path.into().display(), err),
        ))
    }

    /// `true` for errors that leave the store untouched and can be fixed by
    /// the caller; `false` for backend and filesystem failures.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Git(_) | Self::Io(_))
    }

    /// `true` for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
