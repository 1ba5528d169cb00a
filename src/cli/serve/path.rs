//! URL to filesystem path resolution.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Where a request URL leads inside the document root.
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution {
    File(PathBuf),
    /// Directory requested without its trailing slash; relative links in
    /// its index page only work once the browser is redirected.
    Redirect(String),
    NotFound,
}

/// Resolve URL to a file under `serve_root`, handling `index.html`.
///
/// Paths escaping the root (`..`, symlinks) resolve to `NotFound`.
pub fn resolve(url: &str, serve_root: &Path) -> Resolution {
    let (path, query) = split_query(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(path));
    let clean = decoded.trim_matches('/');

    if clean.split('/').any(|segment| segment == "..") {
        return Resolution::NotFound;
    }

    let Ok(root) = serve_root.canonicalize() else {
        return Resolution::NotFound;
    };
    let Ok(canonical) = root.join(clean).canonicalize() else {
        return Resolution::NotFound;
    };
    if !canonical.starts_with(&root) {
        return Resolution::NotFound;
    }

    if canonical.is_file() {
        return Resolution::File(canonical);
    }

    let index = canonical.join("index.html");
    if canonical.is_dir() && index.is_file() {
        if !path.ends_with('/') {
            let location = match query {
                Some(q) => format!("{path}/?{q}"),
                None => format!("{path}/"),
            };
            return Resolution::Redirect(location);
        }
        return Resolution::File(index);
    }

    Resolution::NotFound
}

fn split_query(url: &str) -> (&str, Option<&str>) {
    let url = url.split('#').next().unwrap_or(url);
    match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    }
}
