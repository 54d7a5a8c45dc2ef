use crate::error::{Error, Result};

/// Normalize a content path: strip leading/trailing slashes, reject `.`/`..`
/// segments, and collapse repeated slashes.
///
/// An empty input returns an empty string (root).
///
/// # Arguments
/// * `path` - The raw path string to normalize.
///
/// # Errors
/// Returns [`Error::InvalidPath`] if the path contains `.` or `..` segments
/// or control characters.
pub fn normalize_path(path: &str) -> Result<String> {
    if path.is_empty() {
        return Ok(String::new());
    }

    let mut segments: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        if seg.is_empty() {
            // skip empty segments (from leading/trailing/double slashes)
            continue;
        }
        if seg == ".." || seg == "." {
            return Err(Error::invalid_path(format!(
                "path segment '{}' is not allowed",
                seg,
            )));
        }
        if seg.chars().any(char::is_control) {
            return Err(Error::invalid_path(format!(
                "path segment {:?} contains control characters",
                seg,
            )));
        }
        segments.push(seg);
    }

    Ok(segments.join("/"))
}

/// Split a normalized path into its segments. The root has none.
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Join a parent path and a child name.
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Returns `true` when the path refers to the root of the tree
/// (empty string or only slashes).
pub fn is_root_path(path: &str) -> bool {
    path.is_empty() || path.chars().all(|c| c == '/')
}

/// The URL form of a content path (`"a/b"` becomes `"/a/b"`).
pub fn urlpath(path: &str) -> String {
    format!("/{}", path.trim_matches('/'))
}

/// Map a logical page path onto its blob name by appending the configured
/// extension, unless the path already carries it.
pub fn physical_path(path: &str, extension: Option<&str>) -> String {
    match extension {
        Some(ext) if !ext.is_empty() && !path.ends_with(ext) => format!("{}{}", path, ext),
        _ => path.to_string(),
    }
}

/// Strip the configured extension from a blob name.
pub fn logical_name<'a>(name: &'a str, extension: Option<&str>) -> &'a str {
    match extension {
        Some(ext) if !ext.is_empty() && name.len() > ext.len() => {
            name.strip_suffix(ext).unwrap_or(name)
        }
        _ => name,
    }
}

/// File-name-safe rendering of a path, used for archive names.
pub fn safe_name(path: &str) -> String {
    if is_root_path(path) {
        return "root".to_string();
    }
    path.trim_matches('/')
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | ' ' => '_',
            c => c,
        })
        .collect()
}

/// Format a commit message from an optional user message.
///
/// If `message` is `Some`, it is used directly; otherwise a
/// `Created <path>` / `Updated <path>` message is synthesized.
pub fn format_commit_message(is_new: bool, path: &str, message: Option<&str>) -> String {
    match message {
        Some(msg) => msg.to_string(),
        None if is_new => format!("Created {}", path),
        None => format!("Updated {}", path),
    }
}

/// Validate a git branch name.
///
/// Rejects spaces, tabs, control characters, `..`, `@{`, trailing `.`, and
/// `.lock` suffix per git's `check-ref-format` rules.
///
/// # Errors
/// Returns [`Error::Validation`] if the name violates any rule.
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation("branch name must not be empty"));
    }

    for ch in name.chars() {
        match ch {
            ':' | ' ' | '\t' | '\n' | '\r' | '\\' | '^' | '~' | '?' | '*' | '[' => {
                return Err(Error::validation(format!(
                    "branch name contains invalid character: {:?}",
                    ch,
                )));
            }
            _ => {}
        }
    }

    if name.contains("..") {
        return Err(Error::validation("branch name must not contain '..'"));
    }

    if name.contains("@{") {
        return Err(Error::validation("branch name must not contain '@{'"));
    }

    if name.ends_with('.') || name.ends_with(".lock") {
        return Err(Error::validation(format!(
            "branch name must not end with '{}'",
            if name.ends_with('.') { "." } else { ".lock" }
        )));
    }

    Ok(())
}
