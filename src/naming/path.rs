use crate::error::{ArborError, Result};

pub const ROOT: &str = "/";

/// Normalize a client-supplied path into the canonical absolute form.
///
/// Whitespace is trimmed, repeated and trailing slashes are collapsed, and
/// `.`/`..` segments are resolved. A path that cleans down to nothing is the
/// root. Relative paths and `..` that climbs above the root are rejected.
pub fn sanitize_path(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ArborError::InvalidArgument(
            "Path cannot be empty".to_string(),
        ));
    }
    if trimmed == "." {
        return Ok(ROOT.to_string());
    }
    if !trimmed.starts_with('/') {
        return Err(ArborError::InvalidArgument(format!(
            "Path '{}' must be absolute",
            trimmed
        )));
    }

    let mut parts: Vec<&str> = Vec::new();
    for part in trimmed.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(ArborError::InvalidArgument(format!(
                        "Path '{}' escapes the root directory",
                        trimmed
                    )));
                }
            }
            _ => parts.push(part),
        }
    }

    if parts.is_empty() {
        Ok(ROOT.to_string())
    } else {
        Ok(format!("/{}", parts.join("/")))
    }
}

pub fn is_root(path: &str) -> bool {
    path == ROOT
}

/// Split a sanitized path into its segments, root excluded.
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Parent of a sanitized path. The root is its own parent.
pub fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => ROOT,
        Some(idx) => &path[..idx],
    }
}

/// Last segment of a sanitized path, `None` for the root.
pub fn file_name(path: &str) -> Option<&str> {
    segments(path).last().copied()
}
