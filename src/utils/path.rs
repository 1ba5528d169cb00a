//! Path normalization utilities.

use std::path::{Component, Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Lexically resolve `.` and `..` without touching the filesystem.
///
/// Used for paths that may not exist yet (output files, module specifiers).
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Render a path with forward slashes (source map `sources`, remote paths).
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Path of `path` relative to `base`, or `path` itself when outside `base`.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Relative URL from directory `from` to `to`, with `..` segments as needed.
///
/// Both paths must be absolute (or both relative to the same base).
pub fn relative_url(from: &Path, to: &Path) -> String {
    let from: Vec<_> = clean_path(from).components().map(|c| c.as_os_str().to_owned()).collect();
    let to: Vec<_> = clean_path(to).components().map(|c| c.as_os_str().to_owned()).collect();
    let shared = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<String> = vec!["..".to_string(); from.len() - shared];
    parts.extend(to[shared..].iter().map(|c| c.to_string_lossy().into_owned()));
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_relative() {
        let normalized = normalize_path(Path::new("relative/path/file.txt"));
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(
            clean_path(Path::new("/src/js/./lib/../util.js")),
            PathBuf::from("/src/js/util.js")
        );
        assert_eq!(clean_path(Path::new("../a/b")), PathBuf::from("../a/b"));
    }

    #[test]
    fn test_to_slash() {
        assert_eq!(to_slash(Path::new("src/js/app.js")), "src/js/app.js");
        assert_eq!(to_slash(Path::new("./src/../lib/x.js")), "src/../lib/x.js");
    }

    #[test]
    fn test_relative_url() {
        assert_eq!(
            relative_url(Path::new("/p/build/css"), Path::new("/p/src/scss/app.scss")),
            "../../src/scss/app.scss"
        );
        assert_eq!(
            relative_url(Path::new("/p/build/js/"), Path::new("/p/build/js/vendor/a.js")),
            "vendor/a.js"
        );
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(
            relative_to(Path::new("/p/src/img/a.png"), Path::new("/p")),
            PathBuf::from("src/img/a.png")
        );
        assert_eq!(
            relative_to(Path::new("/elsewhere/a.png"), Path::new("/p")),
            PathBuf::from("/elsewhere/a.png")
        );
    }
}
