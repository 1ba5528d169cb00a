//! Module specifier resolution (relative paths and `node_modules`).

use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::path::normalize_path;

/// Extensions tried for extensionless specifiers, in order.
const EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "tsx", "json"];

/// `package.json` fields consulted for a package's entry, in order.
const ENTRY_FIELDS: &[&str] = &["browser", "module", "main"];

/// Resolve `specifier` as imported from the file `from`.
///
/// Returns a canonical path so the same module reached through different
/// specifiers is bundled once.
pub fn resolve(specifier: &str, from: &Path) -> Option<PathBuf> {
    let dir = from.parent()?;

    let resolved = if is_relative(specifier) {
        resolve_path(&dir.join(specifier))
    } else if specifier.starts_with('/') {
        resolve_path(Path::new(specifier))
    } else {
        resolve_bare(specifier, dir)
    }?;

    Some(normalize_path(&resolved))
}

fn is_relative(specifier: &str) -> bool {
    specifier == "." || specifier == ".." || specifier.starts_with("./") || specifier.starts_with("../")
}

/// File first, then directory.
fn resolve_path(path: &Path) -> Option<PathBuf> {
    resolve_file(path).or_else(|| resolve_dir(path))
}

fn resolve_file(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    let name = path.file_name()?.to_string_lossy();
    EXTENSIONS
        .iter()
        .map(|ext| path.with_file_name(format!("{name}.{ext}")))
        .find(|candidate| candidate.is_file())
}

/// Directory: `package.json` entry, then `index.<ext>`.
fn resolve_dir(dir: &Path) -> Option<PathBuf> {
    if !dir.is_dir() {
        return None;
    }
    package_entry(dir).or_else(|| resolve_file(&dir.join("index")))
}

fn package_entry(dir: &Path) -> Option<PathBuf> {
    let manifest = fs::read_to_string(dir.join("package.json")).ok()?;
    let manifest: serde_json::Value = serde_json::from_str(&manifest).ok()?;

    ENTRY_FIELDS
        .iter()
        .filter_map(|field| manifest.get(*field)?.as_str())
        .find_map(|entry| {
            let target = dir.join(entry);
            resolve_file(&target).or_else(|| {
                // `"main": "."` or `"main": "lib"` point at a directory
                target.is_dir().then(|| resolve_file(&target.join("index"))).flatten()
            })
        })
}

/// Split `@scope/pkg/sub/path` into (`@scope/pkg`, `sub/path`).
fn split_package(specifier: &str) -> (&str, &str) {
    let mut slashes = specifier.match_indices('/').map(|(i, _)| i);
    let cut = if specifier.starts_with('@') {
        slashes.nth(1)
    } else {
        slashes.next()
    };
    match cut {
        Some(i) => (&specifier[..i], &specifier[i + 1..]),
        None => (specifier, ""),
    }
}

/// Walk up from `dir` looking in each `node_modules`.
fn resolve_bare(specifier: &str, dir: &Path) -> Option<PathBuf> {
    let (package, subpath) = split_package(specifier);

    dir.ancestors()
        .map(|ancestor| ancestor.join("node_modules").join(package))
        .filter(|package_dir| package_dir.is_dir())
        .find_map(|package_dir| {
            if subpath.is_empty() {
                resolve_dir(&package_dir)
            } else {
                resolve_path(&package_dir.join(subpath))
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        normalize_path(&path)
    }

    #[test]
    fn test_relative_with_and_without_extension() {
        let dir = TempDir::new().unwrap();
        let app = write(dir.path(), "src/js/app.js", "");
        let util = write(dir.path(), "src/js/lib/util.js", "");
        let data = write(dir.path(), "src/js/data.json", "{}");

        assert_eq!(resolve("./lib/util", &app), Some(util.clone()));
        assert_eq!(resolve("./lib/util.js", &app), Some(util));
        assert_eq!(resolve("./data.json", &app), Some(data));
        assert_eq!(resolve("./missing", &app), None);
    }

    #[test]
    fn test_directory_index() {
        let dir = TempDir::new().unwrap();
        let app = write(dir.path(), "src/js/app.js", "");
        let index = write(dir.path(), "src/js/widgets/index.js", "");
        assert_eq!(resolve("./widgets", &app), Some(index));
    }

    #[test]
    fn test_node_modules_entry_fields() {
        let dir = TempDir::new().unwrap();
        let app = write(dir.path(), "src/js/app.js", "");
        write(
            dir.path(),
            "node_modules/tiny/package.json",
            r#"{"main": "dist/tiny.cjs.js", "module": "dist/tiny.esm.js"}"#,
        );
        let esm = write(dir.path(), "node_modules/tiny/dist/tiny.esm.js", "");
        write(dir.path(), "node_modules/tiny/dist/tiny.cjs.js", "");

        // `module` wins over `main`
        assert_eq!(resolve("tiny", &app), Some(esm));
    }

    #[test]
    fn test_scoped_package_subpath() {
        let dir = TempDir::new().unwrap();
        let app = write(dir.path(), "src/js/app.js", "");
        let helper = write(
            dir.path(),
            "node_modules/@oxc-project/runtime/helpers/asyncToGenerator.js",
            "",
        );
        assert_eq!(
            resolve("@oxc-project/runtime/helpers/asyncToGenerator", &app),
            Some(helper)
        );
    }

    #[test]
    fn test_split_package() {
        assert_eq!(split_package("lodash"), ("lodash", ""));
        assert_eq!(split_package("lodash/fp/map"), ("lodash", "fp/map"));
        assert_eq!(split_package("@scope/pkg"), ("@scope/pkg", ""));
        assert_eq!(split_package("@scope/pkg/a/b"), ("@scope/pkg", "a/b"));
    }
}
