use log::debug;

use crate::error::{Error, Result};
use crate::paths;
use crate::revision::{self, Revision};
use crate::route::{RoutePattern, RouteTable};

/// Templates that exist to serve arbitrary content paths. They never count
/// as collisions.
const CONTENT_TEMPLATES: &[&str] = &["/:path", "/:path/:sha", "/:sha"];

/// Machine-address templates that must stay reachable, so content paths
/// matching them are reserved.
const STRICT_TEMPLATES: &[&str] = &["/:strict_sha", "/:path/:strict_sha"];

/// One way of reading a raw request: a content path and an optional
/// revision qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub path: String,
    pub revision: Option<Revision>,
}

impl RequestTarget {
    pub fn new(path: impl Into<String>, revision: Option<Revision>) -> Self {
        Self {
            path: path.into(),
            revision,
        }
    }
}

/// Classifies request strings and guards content paths against collisions
/// with system routes.
#[derive(Debug, Clone)]
pub struct PathResolver {
    routes: RouteTable,
    reserved: Vec<RoutePattern>,
}

impl PathResolver {
    pub fn new(routes: RouteTable) -> Self {
        let reserved = reserved_patterns(&routes);
        Self { routes, reserved }
    }

    /// Resolver over [`RouteTable::wiki_default`].
    pub fn wiki_default() -> Self {
        Self::new(RouteTable::wiki_default())
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Candidate readings of `raw`, most preferred first.
    ///
    /// A trailing strict-length hash is always a revision. A trailing
    /// abbreviated hash is read as content first and, when a registered
    /// path-plus-revision route claims it, as a revision second. Anything
    /// else is plain content at head.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPath`] if `raw` does not normalize.
    pub fn candidates(&self, raw: &str) -> Result<Vec<RequestTarget>> {
        let path = paths::normalize_path(raw)?;
        let (parent, last) = match path.rfind('/') {
            Some(i) => (&path[..i], &path[i + 1..]),
            None => ("", path.as_str()),
        };

        if last.is_empty() {
            return Ok(vec![RequestTarget::new("", None)]);
        }

        if revision::is_strict_sha(last) {
            let rev = Revision::parse(last)?;
            debug!("request {:?} addresses {} at revision {}", raw, parent, rev);
            return Ok(vec![RequestTarget::new(parent, Some(rev))]);
        }

        let mut out = vec![RequestTarget::new(path.clone(), None)];
        if revision::is_sha(last) && self.claims_abbreviation(parent) {
            out.push(RequestTarget::new(parent, Some(Revision::parse(last)?)));
        }
        Ok(out)
    }

    fn claims_abbreviation(&self, parent: &str) -> bool {
        let template = if parent.is_empty() { "/:sha" } else { "/:path/:sha" };
        self.routes.contains(template)
    }

    /// `true` if `path` would collide with a non-content route.
    ///
    /// Paths that fail to normalize are not collisions; they are rejected by
    /// path validation instead.
    pub fn is_reserved_path(&self, path: &str) -> bool {
        match paths::normalize_path(path) {
            Ok(norm) => {
                let url = paths::urlpath(&norm);
                self.reserved.iter().any(|p| p.matches(&url))
            }
            Err(_) => false,
        }
    }

    /// Normalize `path` and reject it if it is reserved.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPath`] or [`Error::Forbidden`].
    pub fn check_path(&self, path: &str) -> Result<String> {
        let norm = paths::normalize_path(path)?;
        if self.is_reserved_path(&norm) {
            return Err(Error::forbidden(paths::urlpath(&norm)));
        }
        Ok(norm)
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::wiki_default()
    }
}

fn reserved_patterns(routes: &RouteTable) -> Vec<RoutePattern> {
    let content: Vec<RoutePattern> = CONTENT_TEMPLATES
        .iter()
        .filter_map(|t| RoutePattern::parse(t).ok())
        .collect();

    let mut out: Vec<RoutePattern> = routes
        .patterns()
        .into_iter()
        .filter(|p| !content.contains(p))
        .collect();

    for t in STRICT_TEMPLATES {
        if let Ok(p) = RoutePattern::parse(t) {
            if !out.contains(&p) {
                out.push(p);
            }
        }
    }
    out
}
