//! Glob expansion and matching for the path table.
//!
//! Patterns in `brisk.toml` are relative to the project root. A pattern
//! without glob characters is a literal path and must exist.

use anyhow::{Context, Result, bail};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Check if a pattern contains glob metacharacters.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Join a root-relative pattern onto the (escaped) root directory.
fn absolute_pattern(root: &Path, pattern: &str) -> String {
    let root = Pattern::escape(&root.to_string_lossy());
    let pattern = pattern.trim_start_matches("./");
    format!("{}/{}", root.trim_end_matches('/'), pattern)
}

/// Expand patterns into a sorted, deduplicated list of files.
pub fn expand(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for pattern in patterns {
        if is_glob(pattern) {
            let full = absolute_pattern(root, pattern);
            let paths = glob::glob_with(&full, MATCH_OPTIONS)
                .with_context(|| format!("Invalid glob pattern: {pattern}"))?;
            for path in paths {
                let path =
                    path.with_context(|| format!("Failed to read glob match for: {pattern}"))?;
                if path.is_file() {
                    files.push(path);
                }
            }
        } else {
            let path = root.join(pattern);
            if !path.is_file() {
                bail!("File not found: {pattern}");
            }
            files.push(path);
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Directory portion of a pattern before its first glob component.
///
/// Outputs keep their path relative to this base:
/// `src/img/**/*.*` has base `src/img`, and `src/js/app.js` has base `src/js`.
pub fn base_dir(root: &Path, pattern: &str) -> PathBuf {
    let pattern = pattern.trim_start_matches("./");
    let mut base = root.to_path_buf();
    let components: Vec<&str> = pattern.split('/').filter(|c| !c.is_empty()).collect();
    let literal = if is_glob(pattern) {
        components.iter().take_while(|c| !is_glob(c)).count()
    } else {
        components.len().saturating_sub(1)
    };
    for component in &components[..literal] {
        base.push(component);
    }
    base
}

/// Check whether an absolute path matches any of the root-relative patterns.
pub fn matches_any(root: &Path, patterns: &[String], path: &Path) -> bool {
    patterns.iter().any(|pattern| {
        if is_glob(pattern) {
            Pattern::new(&absolute_pattern(root, pattern))
                .map(|p| p.matches_path_with(path, MATCH_OPTIONS))
                .unwrap_or(false)
        } else {
            root.join(pattern.trim_start_matches("./")) == path
        }
    })
}
