//! Content types for the dev server.

use std::path::Path;

/// Types the server sets explicitly.
pub mod types {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Extension table, lowercase. Covers what a front-end build tree holds.
const BY_EXTENSION: &[(&[&str], &str)] = &[
    (&["html", "htm"], types::HTML),
    (&["css"], "text/css; charset=utf-8"),
    (&["js", "mjs", "cjs"], types::JAVASCRIPT),
    // source maps are JSON documents
    (&["json", "map"], "application/json"),
    (&["txt"], types::PLAIN),
    (&["xml"], "application/xml"),
    (&["wasm"], "application/wasm"),
    (&["svg"], "image/svg+xml"),
    (&["png"], "image/png"),
    (&["jpg", "jpeg"], "image/jpeg"),
    (&["gif"], "image/gif"),
    (&["webp"], "image/webp"),
    (&["avif"], "image/avif"),
    (&["ico"], "image/x-icon"),
    (&["mp4", "m4v"], "video/mp4"),
    (&["webm"], "video/webm"),
    (&["woff"], "font/woff"),
    (&["woff2"], "font/woff2"),
    (&["ttf"], "font/ttf"),
    (&["otf"], "font/otf"),
    (&["eot"], "application/vnd.ms-fontobject"),
];

/// Content type for `path`, by extension (case-insensitive).
pub fn from_path(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return types::OCTET_STREAM;
    };
    let ext = ext.to_ascii_lowercase();
    BY_EXTENSION
        .iter()
        .find(|(exts, _)| exts.contains(&ext.as_str()))
        .map_or(types::OCTET_STREAM, |&(_, mime)| mime)
}

/// HTML responses get the live-reload client.
pub fn is_html(mime: &str) -> bool {
    mime == types::HTML
}
