//! HTTP response handlers.
//!
//! Every response carries the CORS headers when `[serve] cors` is on.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use super::ServeState;
use super::inject::inject_livereload;
use crate::utils::mime::{self, types};

/// Respond with a static file, injecting the live-reload client into HTML.
pub fn respond_file(request: Request, path: &Path, state: &ServeState) -> Result<()> {
    let content_type = mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, 200, content_type, state);
    }

    if let Some(range) = get_range_header(&request) {
        return respond_range(request, path, content_type, &range, state);
    }

    let body = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let body = if mime::is_html(content_type) {
        inject_livereload(&body)
    } else {
        body
    };

    send_body(request, 200, content_type, body, state)
}

/// Handle Range request for media files (video/audio seeking).
fn respond_range(
    request: Request,
    path: &Path,
    content_type: &'static str,
    range: &str,
    state: &ServeState,
) -> Result<()> {
    let file_size = fs::metadata(path)?.len();
    if file_size == 0 {
        return send_body(request, 200, content_type, Vec::new(), state);
    }

    let range = range.strip_prefix("bytes=").unwrap_or(range);
    let (start, end) = parse_range(range, file_size);
    if start > end {
        return send_status(request, 416, state);
    }
    let length = end - start + 1;

    let mut file = fs::File::open(path)?;
    file.seek(SeekFrom::Start(start))?;
    let reader = file.take(length);

    let content_range = format!("bytes {start}-{end}/{file_size}");
    let mut headers = common_headers(content_type, state);
    headers.extend(header("Content-Range", &content_range));
    headers.extend(header("Accept-Ranges", "bytes"));

    let response = Response::new(
        StatusCode(206),
        headers,
        reader,
        usize::try_from(length).ok(),
        None,
    );
    request.respond(response)?;
    Ok(())
}

/// Parse a `start-end` range into inclusive byte offsets.
fn parse_range(range: &str, file_size: u64) -> (u64, u64) {
    let last = file_size - 1;
    match range.trim().split_once('-') {
        // "-500": last 500 bytes
        Some(("", suffix)) => {
            let suffix: u64 = suffix.trim().parse().unwrap_or(0);
            (file_size.saturating_sub(suffix), last)
        }
        // "0-" or "0-499"
        Some((start, end)) => {
            let start: u64 = start.trim().parse().unwrap_or(0);
            let end: u64 = end.trim().parse().unwrap_or(last);
            (start, end.min(last))
        }
        None => (0, last),
    }
}

fn get_range_header(request: &Request) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Range"))
        .map(|h| h.value.to_string())
}

/// 404, using `404.html` from the document root when present.
pub fn respond_not_found(request: Request, state: &ServeState) -> Result<()> {
    let custom = state.root.join("404.html");

    if is_head_request(&request) {
        return send_head(request, 404, types::PLAIN, state);
    }

    if let Ok(body) = fs::read(&custom) {
        return send_body(request, 404, types::HTML, inject_livereload(&body), state);
    }

    send_body(request, 404, types::PLAIN, b"404 Not Found".to_vec(), state)
}

/// 301 to the slash-terminated directory URL.
pub fn respond_redirect(request: Request, location: &str, state: &ServeState) -> Result<()> {
    let mut response = Response::empty(StatusCode(301));
    for h in common_headers(types::PLAIN, state)
        .into_iter()
        .chain(header("Location", location))
    {
        response.add_header(h);
    }
    request.respond(response)?;
    Ok(())
}

/// Answer a CORS preflight.
pub fn respond_preflight(request: Request, state: &ServeState) -> Result<()> {
    let mut response = Response::empty(StatusCode(204));
    for h in cors_headers(state) {
        response.add_header(h);
    }
    request.respond(response)?;
    Ok(())
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request, state: &ServeState) -> Result<()> {
    send_status(request, 503, state)
}

/// Respond with the live-reload client from memory.
pub fn respond_livereload_js(request: Request, state: &ServeState) -> Result<()> {
    let body = crate::embed::serve::livereload_js(state.ws_port);
    send_body(request, 200, types::JAVASCRIPT, body.into_bytes(), state)
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(
    request: Request,
    status: u16,
    content_type: &'static str,
    state: &ServeState,
) -> Result<()> {
    let mut response = Response::empty(StatusCode(status));
    for h in common_headers(content_type, state) {
        response.add_header(h);
    }
    request.respond(response)?;
    Ok(())
}

fn send_status(request: Request, status: u16, state: &ServeState) -> Result<()> {
    let reason = StatusCode(status).default_reason_phrase();
    let body = format!("{status} {reason}").into_bytes();
    send_body(request, status, types::PLAIN, body, state)
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
    state: &ServeState,
) -> Result<()> {
    let mut response = Response::from_data(body).with_status_code(StatusCode(status));
    for h in common_headers(content_type, state) {
        response.add_header(h);
    }
    request.respond(response)?;
    Ok(())
}

/// Content type, no caching, and CORS.
fn common_headers(content_type: &str, state: &ServeState) -> Vec<Header> {
    let mut headers: Vec<Header> = header("Content-Type", content_type)
        .into_iter()
        .chain(header("Cache-Control", "no-store"))
        .collect();
    headers.extend(cors_headers(state));
    headers
}

fn cors_headers(state: &ServeState) -> Vec<Header> {
    if !state.cors {
        return Vec::new();
    }
    [
        ("Access-Control-Allow-Origin", "*"),
        ("Access-Control-Allow-Methods", "GET, HEAD, OPTIONS"),
        ("Access-Control-Allow-Headers", "*"),
    ]
    .into_iter()
    .filter_map(|(k, v)| header(k, v))
    .collect()
}

fn header(key: &str, value: &str) -> Option<Header> {
    Header::from_bytes(key.as_bytes(), value.as_bytes()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("0-99", 1000), (0, 99));
        assert_eq!(parse_range("900-", 1000), (900, 999));
        assert_eq!(parse_range("-100", 1000), (900, 999));
        assert_eq!(parse_range("0-5000", 1000), (0, 999));
    }
}
