use std::fmt;

use crate::error::{Error, Result};

/// Length of a full ("strict") revision identifier.
pub const STRICT_LEN: usize = 40;

/// Shortest abbreviated identifier accepted for reads.
pub const MIN_ABBREV_LEN: usize = 5;

/// `true` if `s` is a full-length hexadecimal commit id.
pub fn is_strict_sha(s: &str) -> bool {
    s.len() == STRICT_LEN && is_hex(s)
}

/// `true` if `s` looks like a (possibly abbreviated) commit id.
pub fn is_sha(s: &str) -> bool {
    (MIN_ABBREV_LEN..=STRICT_LEN).contains(&s.len()) && is_hex(s)
}

fn is_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// An immutable commit identifier in lowercase hex.
///
/// May hold an abbreviated prefix; [`Revision::is_strict`] tells whether it
/// is safe for unambiguous machine addressing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Revision(String);

impl Revision {
    /// Parse a strict or abbreviated identifier.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRevision`] for non-hex input or a length
    /// outside `MIN_ABBREV_LEN..=STRICT_LEN`.
    pub fn parse(s: &str) -> Result<Self> {
        if !is_sha(s) {
            return Err(Error::invalid_revision(s));
        }
        Ok(Self(s.to_string()))
    }

    /// Parse a full-length identifier, rejecting abbreviations.
    pub fn parse_strict(s: &str) -> Result<Self> {
        if !is_strict_sha(s) {
            return Err(Error::validation(format!(
                "revision '{}' is not a full {}-character id",
                s, STRICT_LEN
            )));
        }
        Ok(Self(s.to_string()))
    }

    pub(crate) fn from_oid(oid: git2::Oid) -> Self {
        Self(oid.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_strict(&self) -> bool {
        self.0.len() == STRICT_LEN
    }

    /// Seven-character display form.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(7)]
    }

    /// `true` if `other` is this revision or an abbreviation of it (or the
    /// reverse).
    pub fn matches(&self, other: &Revision) -> bool {
        self.0.starts_with(&other.0) || other.0.starts_with(&self.0)
    }

    pub(crate) fn to_oid(&self) -> Result<git2::Oid> {
        if !self.is_strict() {
            return Err(Error::invalid_revision(self.0.clone()));
        }
        git2::Oid::from_str(&self.0).map_err(Error::git)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Revision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for Revision {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
