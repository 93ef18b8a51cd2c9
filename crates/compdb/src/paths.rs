//! Canonical source paths.
//!
//! A record's `file` either matches one of the caller's strip prefixes, in
//! which case it is kept relative and never touches the filesystem, or it is
//! resolved against the record's `directory` and canonicalized. Paths that do
//! not exist on this machine (a database generated in a container, say) are
//! kept in lexically cleaned form and reported as a [`PathWarning`].

use layerkit_protocol::path_filters::{strip_literal_prefix, strip_root_prefix};
use serde::Serialize;
use std::env;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourcePath {
    /// Absolute path, canonicalized when the file exists.
    Resolved(PathBuf),
    /// Relative path left after removing a strip prefix.
    Stripped(PathBuf),
}

impl SourcePath {
    pub fn as_path(&self) -> &Path {
        match self {
            Self::Resolved(path) | Self::Stripped(path) => path,
        }
    }

    pub fn is_stripped(&self) -> bool {
        matches!(self, Self::Stripped(_))
    }

    /// The string used for matching and display.
    pub fn to_string_lossy(&self) -> String {
        self.as_path().to_string_lossy().into_owned()
    }

    /// File suffix with its leading dot, e.g. `.cpp`.
    pub fn suffix(&self) -> Option<String> {
        self.as_path()
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
    }

    /// Path relative to `root`.
    ///
    /// Stripped paths lose `root` as a plain string prefix (`.` is a no-op).
    /// Resolved paths are made relative when they lie under `root` (resolved
    /// first when relative) and are returned unchanged otherwise.
    pub fn relative_to(&self, root: &Path) -> String {
        match self {
            Self::Stripped(path) => {
                let path = path.to_string_lossy();
                let root = root.to_string_lossy();
                strip_root_prefix(&path, &root).to_string()
            }
            Self::Resolved(path) => {
                let resolved_root;
                let root = if root.is_absolute() {
                    root
                } else {
                    resolved_root = resolve_best_effort(root);
                    resolved_root.as_path()
                };
                match path.strip_prefix(root) {
                    Ok(relative) => relative.to_string_lossy().into_owned(),
                    Err(_) => path.to_string_lossy().into_owned(),
                }
            }
        }
    }
}

impl std::fmt::Display for SourcePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_path().display())
    }
}

/// A source path that could not be resolved on this filesystem. Loading goes
/// on with the best-effort path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathWarning {
    /// Position of the record in the input array
    pub record: usize,
    pub path: PathBuf,
    pub reason: String,
}

/// Result of normalizing one record's `file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPath {
    pub path: SourcePath,
    /// Set when canonicalization failed
    pub unresolved: Option<String>,
}

pub fn normalize_source_path(file: &str, directory: &Path, strip_prefixes: &[String]) -> NormalizedPath {
    for prefix in strip_prefixes.iter().filter(|p| !p.is_empty()) {
        if let Some(rest) = strip_literal_prefix(file, prefix) {
            return NormalizedPath {
                path: SourcePath::Stripped(PathBuf::from(rest)),
                unresolved: None,
            };
        }
    }

    let path = Path::new(file);
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        directory.join(path)
    };

    match joined.canonicalize() {
        Ok(canonical) => NormalizedPath {
            path: SourcePath::Resolved(canonical),
            unresolved: None,
        },
        Err(err) => NormalizedPath {
            path: SourcePath::Resolved(lexical_clean(&absolutize(&joined))),
            unresolved: Some(err.to_string()),
        },
    }
}

/// Canonicalize when possible, otherwise make absolute and clean lexically.
pub fn resolve_best_effort(path: &Path) -> PathBuf {
    path.canonicalize()
        .unwrap_or_else(|_| lexical_clean(&absolutize(path)))
}

/// Join a relative path onto the process working directory.
pub fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// Remove `.` components and fold `..` into the preceding component without
/// consulting the filesystem.
pub fn lexical_clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match cleaned.components().next_back() {
                Some(Component::Normal(_)) => {
                    cleaned.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => cleaned.push(".."),
            },
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strip_prefix_keeps_path_relative() {
        let normalized = normalize_source_path(
            "/workspace/executorch/runtime/core/a.cpp",
            Path::new("/build"),
            &["/nope".to_string(), "/workspace/executorch".to_string()],
        );
        assert_eq!(
            normalized.path,
            SourcePath::Stripped(PathBuf::from("runtime/core/a.cpp"))
        );
        assert_eq!(normalized.unresolved, None);
    }

    #[test]
    fn first_matching_prefix_wins() {
        let normalized = normalize_source_path(
            "/ws/a/b/c.c",
            Path::new("/build"),
            &["/ws".to_string(), "/ws/a".to_string()],
        );
        assert_eq!(normalized.path.as_path(), Path::new("a/b/c.c"));
    }

    #[test]
    fn missing_relative_file_is_joined_and_cleaned() {
        let normalized = normalize_source_path(
            "../src/./missing.c",
            Path::new("/definitely/not/here/build"),
            &[],
        );
        assert_eq!(
            normalized.path,
            SourcePath::Resolved(PathBuf::from("/definitely/not/here/src/missing.c"))
        );
        assert!(normalized.unresolved.is_some());
    }

    #[test]
    fn existing_file_is_canonicalized() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a.c"), "int a;").unwrap();

        let normalized = normalize_source_path("src/../src/a.c", dir.path(), &[]);
        let expected = dir.path().join("src/a.c").canonicalize().unwrap();
        assert_eq!(normalized.path, SourcePath::Resolved(expected));
        assert_eq!(normalized.unresolved, None);
    }

    #[test]
    fn lexical_clean_does_not_climb_above_root() {
        assert_eq!(lexical_clean(Path::new("/a/../../b")), PathBuf::from("/b"));
        assert_eq!(lexical_clean(Path::new("../x/./y")), PathBuf::from("../x/y"));
    }

    #[test]
    fn relative_to_for_both_kinds() {
        let stripped = SourcePath::Stripped(PathBuf::from("runtime/core/a.c"));
        assert_eq!(stripped.relative_to(Path::new(".")), "runtime/core/a.c");
        assert_eq!(stripped.relative_to(Path::new("runtime")), "core/a.c");
        assert_eq!(stripped.relative_to(Path::new("kernels")), "runtime/core/a.c");

        let resolved = SourcePath::Resolved(PathBuf::from("/repo/runtime/a.c"));
        assert_eq!(resolved.relative_to(Path::new("/repo")), "runtime/a.c");
        assert_eq!(resolved.relative_to(Path::new("/elsewhere")), "/repo/runtime/a.c");
    }

    #[test]
    fn suffix_includes_leading_dot() {
        let path = SourcePath::Stripped(PathBuf::from("a/b.cpp"));
        assert_eq!(path.suffix().as_deref(), Some(".cpp"));
        let path = SourcePath::Stripped(PathBuf::from("a/Makefile"));
        assert_eq!(path.suffix(), None);
    }
}
