//! String-level path helpers for paths that are kept relative and must not be
//! touched by the filesystem.

/// Normalize a relative filter root: forward slashes, no leading `./`, no
/// surrounding separators. `.` normalizes to the empty string (matches all).
pub fn normalize_filter_path(raw: &str) -> String {
    let mut value = raw.trim().replace('\\', "/");
    while value.starts_with("./") {
        value = value[2..].to_string();
    }
    let value = value.trim_matches('/');
    if value == "." {
        return String::new();
    }
    value.to_string()
}

/// `true` when `path` equals `prefix` or lies below it on a `/` boundary.
/// An empty prefix matches every path.
pub fn path_prefix_matches(prefix: &str, path: &str) -> bool {
    let prefix = normalize_filter_path(prefix);
    let path = path.replace('\\', "/");
    path_prefix_matches_normalized(&prefix, &path)
}

fn path_prefix_matches_normalized(prefix: &str, path: &str) -> bool {
    if prefix.is_empty() || path == prefix {
        return true;
    }

    if !path.starts_with(prefix) {
        return false;
    }

    path.as_bytes().get(prefix.len()) == Some(&b'/')
}

/// Strip `root` from `path` when `path` lies below it. The root is normalized
/// the same way as for [`path_prefix_matches`], so `./runtime` and `runtime`
/// agree. The sentinel root `.` (or an empty root) leaves the path untouched.
pub fn strip_root_prefix<'a>(path: &'a str, root: &str) -> &'a str {
    let root = normalize_filter_path(root);
    if root.is_empty() {
        return path;
    }
    match path.strip_prefix(root.as_str()) {
        Some(rest) if rest.starts_with(['/', '\\']) => &rest[1..],
        _ => path,
    }
}

/// Remove a literal string prefix plus one following separator.
pub fn strip_literal_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    Some(rest.strip_prefix(['/', '\\']).unwrap_or(rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_match_respects_component_boundary() {
        assert!(path_prefix_matches("src", "src/lib.c"));
        assert!(path_prefix_matches("src/", "src/nested/lib.c"));
        assert!(!path_prefix_matches("src", "src2/lib.c"));
        assert!(!path_prefix_matches("src", "docs/README.md"));
    }

    #[test]
    fn dot_and_empty_prefixes_match_everything() {
        for root in ["", ".", "./", "/"] {
            assert!(path_prefix_matches(root, "src/lib.c"), "root={root:?}");
        }
    }

    #[test]
    fn strip_root_prefix_handles_sentinel_and_mismatch() {
        assert_eq!(strip_root_prefix("runtime/a.c", "."), "runtime/a.c");
        assert_eq!(strip_root_prefix("runtime/a.c", "runtime"), "a.c");
        assert_eq!(strip_root_prefix("runtime/a.c", "runtime/"), "a.c");
        assert_eq!(strip_root_prefix("runtimes/a.c", "runtime"), "runtimes/a.c");
        assert_eq!(strip_root_prefix("kernels/b.c", "runtime"), "kernels/b.c");
    }

    #[test]
    fn strip_root_prefix_agrees_with_prefix_match_on_dotted_roots() {
        for root in ["./runtime", "./runtime/", "runtime\\"] {
            assert!(path_prefix_matches(root, "runtime/core/a.c"), "root={root:?}");
            assert_eq!(strip_root_prefix("runtime/core/a.c", root), "core/a.c", "root={root:?}");
        }
        assert_eq!(strip_root_prefix("runtime/a.c", "./"), "runtime/a.c");
    }

    #[test]
    fn strip_literal_prefix_removes_one_separator() {
        assert_eq!(
            strip_literal_prefix("/workspace/executorch/runtime/a.c", "/workspace/executorch"),
            Some("runtime/a.c")
        );
        assert_eq!(
            strip_literal_prefix("/workspace/executorch/runtime/a.c", "/workspace/executorch/"),
            Some("runtime/a.c")
        );
        assert_eq!(strip_literal_prefix("/other/a.c", "/workspace"), None);
    }
}
