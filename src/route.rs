//! Access-pattern templates for the wiki's boundary layer.
//!
//! A template is written the way web routers spell routes: literal
//! characters, `:name` parameters and a `?` suffix making the previous
//! character or parameter optional (`"/?:path?/archive"`). The parameter
//! name selects what it matches:
//!
//! | name         | matches                                        |
//! |--------------|------------------------------------------------|
//! | `path`       | one or more non-empty segments joined by `/`   |
//! | `sha`        | a strict or abbreviated revision id            |
//! | `strict_sha` | a full-length revision id only                 |
//! | anything else| a single segment                               |

use std::fmt;

use crate::error::{Error, Result};
use crate::revision;

/// What a template parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Path,
    Sha,
    StrictSha,
    Segment,
}

impl ParamKind {
    fn from_name(name: &str) -> Self {
        match name {
            "path" => Self::Path,
            "sha" => Self::Sha,
            "strict_sha" => Self::StrictSha,
            _ => Self::Segment,
        }
    }

    fn accepts(self, s: &str) -> bool {
        match self {
            Self::Path => {
                !s.is_empty()
                    && !s.starts_with('/')
                    && !s.ends_with('/')
                    && !s.contains("//")
                    && !s.contains(['?', '#'])
            }
            Self::Sha => revision::is_sha(s),
            Self::StrictSha => revision::is_strict_sha(s),
            Self::Segment => !s.is_empty() && !s.contains(['/', '?', '#']),
        }
    }

    /// Byte length of the longest prefix of `s` this kind could accept.
    fn reach(self, s: &str) -> usize {
        match self {
            Self::Path => {
                if s.starts_with('/') {
                    return 0;
                }
                let double = s.find("//").map(|i| i + 1);
                let special = s.find(['?', '#']);
                double.into_iter().chain(special).min().unwrap_or(s.len())
            }
            Self::Sha | Self::StrictSha => s
                .bytes()
                .take(revision::STRICT_LEN)
                .take_while(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
                .count(),
            Self::Segment => s.find(['/', '?', '#']).unwrap_or(s.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal { ch: char, optional: bool },
    Param { kind: ParamKind, optional: bool },
}

/// A compiled route template.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    template: String,
    tokens: Vec<Token>,
}

impl RoutePattern {
    /// Compile a template such as `"/:path/edit"`.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] for an empty template, a template not
    /// starting with `/`, a `:` without a name or a dangling `?`.
    pub fn parse(template: &str) -> Result<Self> {
        if !template.starts_with('/') {
            return Err(Error::validation(format!(
                "route template {:?} must start with '/'",
                template
            )));
        }

        let chars: Vec<char> = template.chars().collect();
        let mut tokens = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                ':' => {
                    let start = i + 1;
                    let mut end = start;
                    while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
                        end += 1;
                    }
                    if end == start {
                        return Err(Error::validation(format!(
                            "route template {:?} has an unnamed parameter",
                            template
                        )));
                    }
                    let name: String = chars[start..end].iter().collect();
                    tokens.push(Token::Param {
                        kind: ParamKind::from_name(&name),
                        optional: false,
                    });
                    i = end;
                }
                '?' => {
                    match tokens.last_mut() {
                        Some(Token::Literal { optional, .. }) | Some(Token::Param { optional, .. })
                            if !*optional =>
                        {
                            *optional = true;
                        }
                        _ => {
                            return Err(Error::validation(format!(
                                "route template {:?} has a dangling '?'",
                                template
                            )));
                        }
                    }
                    i += 1;
                }
                ch => {
                    tokens.push(Token::Literal { ch, optional: false });
                    i += 1;
                }
            }
        }

        Ok(Self {
            template: template.to_string(),
            tokens,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// `true` if the whole of `url` matches this pattern.
    pub fn matches(&self, url: &str) -> bool {
        match_from(&self.tokens, url)
    }
}

impl PartialEq for RoutePattern {
    fn eq(&self, other: &Self) -> bool {
        self.tokens == other.tokens
    }
}

impl Eq for RoutePattern {}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// Backtracking match of `tokens` against the whole of `input`.
fn match_from(tokens: &[Token], input: &str) -> bool {
    let Some((first, rest)) = tokens.split_first() else {
        return input.is_empty();
    };

    match *first {
        Token::Literal { ch, optional } => {
            if let Some(tail) = input.strip_prefix(ch) {
                if match_from(rest, tail) {
                    return true;
                }
            }
            optional && match_from(rest, input)
        }
        Token::Param { kind, optional } => {
            if let Some(suffix) = fixed_suffix(rest) {
                // Only one split can work.
                if let Some(head) = input.strip_suffix(suffix.as_str()) {
                    if kind.accepts(head) {
                        return true;
                    }
                }
                return optional && match_from(rest, input);
            }

            let next = match rest.first() {
                Some(Token::Literal { ch, optional: false }) => Some(*ch),
                _ => None,
            };
            let reach = kind.reach(input);
            let fits = |head: &str| match kind {
                // Within reach, a path only has to be non-empty and not end in '/'.
                ParamKind::Path => !head.is_empty() && !head.ends_with('/'),
                _ => kind.accepts(head),
            };
            // Longest candidate first.
            let ends: Vec<usize> = input[..reach]
                .char_indices()
                .map(|(i, c)| i + c.len_utf8())
                .filter(|&end| next.map_or(true, |ch| input[end..].starts_with(ch)))
                .collect();
            for &end in ends.iter().rev() {
                if fits(&input[..end]) && match_from(rest, &input[end..]) {
                    return true;
                }
            }
            optional && match_from(rest, input)
        }
    }
}

/// The literal text `tokens` spell when none of them is optional or a
/// parameter.
fn fixed_suffix(tokens: &[Token]) -> Option<String> {
    tokens
        .iter()
        .map(|t| match *t {
            Token::Literal { ch, optional: false } => Some(ch),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// RouteTable
// ---------------------------------------------------------------------------

/// Request method a route is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
}

/// A registered access pattern.
#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    pub pattern: RoutePattern,
}

/// The set of access patterns registered by the boundary layer.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route.
    pub fn add(&mut self, method: Method, template: &str) -> Result<&mut Self> {
        self.routes.push(Route {
            method,
            pattern: RoutePattern::parse(template)?,
        });
        Ok(self)
    }

    /// The routes of the wiki's HTTP layer.
    pub fn wiki_default() -> Self {
        use Method::{Get, Post, Put};

        const ROUTES: &[(Method, &str)] = &[
            (Get, "/sys/fragments/user"),
            (Get, "/sys/fragments/sidebar"),
            (Get, "/"),
            (Get, "/login"),
            (Get, "/signup"),
            (Post, "/login"),
            (Post, "/signup"),
            (Get, "/logout"),
            (Get, "/profile"),
            (Post, "/profile"),
            (Get, "/:style.css"),
            (Get, "/commit/:sha"),
            (Get, "/?:path?/archive"),
            (Get, "/?:path?/history"),
            (Get, "/?:path?/diff"),
            (Get, "/:path/edit"),
            (Get, "/:path/upload"),
            (Get, "/new"),
            (Get, "/upload"),
            (Get, "/:path/new"),
            (Get, "/:sha"),
            (Get, "/:path/:sha"),
            (Get, "/:path"),
            (Put, "/:path"),
            (Post, "/"),
            (Post, "/:path"),
        ];

        let mut table = Self::new();
        for (method, template) in ROUTES {
            table.routes.push(Route {
                method: *method,
                // Every template above is well-formed.
                pattern: RoutePattern::parse(template).unwrap_or_else(|_| unreachable!()),
            });
        }
        table
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Distinct patterns across all methods, in registration order.
    pub fn patterns(&self) -> Vec<RoutePattern> {
        let mut out: Vec<RoutePattern> = Vec::new();
        for route in &self.routes {
            if !out.contains(&route.pattern) {
                out.push(route.pattern.clone());
            }
        }
        out
    }

    /// `true` if a route with exactly this template is registered.
    pub fn contains(&self, template: &str) -> bool {
        match RoutePattern::parse(template) {
            Ok(p) => self.routes.iter().any(|r| r.pattern == p),
            Err(_) => false,
        }
    }
}
