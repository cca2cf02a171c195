//! Helpers for slash separated coordination-service paths.

/// Joins a parent path and a child name with exactly one separator
pub fn join_path(
    parent: &str,
    child: &str,
) -> String {
    let parent = parent.trim_end_matches('/');
    let child = child.trim_start_matches('/');
    if parent.is_empty() {
        format!("/{child}")
    } else {
        format!("{parent}/{child}")
    }
}

/// Last segment of `path`, or `None` for the root or an empty path
pub fn last_segment(path: &str) -> Option<&str> {
    path.trim_end_matches('/').rsplit('/').next().filter(|s| !s.is_empty())
}

/// Parent of `path`; the root is its own parent
pub fn parent_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &trimmed[..idx],
    }
}
