//! Development server with live reload support.
//!
//! ```text
//! bind HTTP (port retry) → bind WebSocket → open browser → request loop
//!                                              ↑
//!                          actor thread: watch → rebuild → notify
//! ```

mod browser;
mod inject;
mod lifecycle;
mod path;
mod response;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam::channel;
use tiny_http::{Method, Request, Server};

use crate::actor::Coordinator;
use crate::core::{is_shutdown, register_server, register_shutdown};
use crate::embed::serve::LIVERELOAD_URL;
use crate::pipeline::BuildContext;
use crate::{debug, log};
use path::Resolution;

/// Request handler threads.
const REQUEST_THREADS: usize = 4;

/// What the request handlers need to know.
#[derive(Debug, Clone)]
pub struct ServeState {
    /// Canonical document root
    pub root: PathBuf,
    pub cors: bool,
    /// Port the live-reload client connects to
    pub ws_port: u16,
}

/// Serve `[serve] root`, watch sources and push reloads until Ctrl+C.
pub fn serve(ctx: BuildContext) -> Result<()> {
    let config = Arc::clone(&ctx.config);
    let serve_config = &config.serve;
    let root = serve_config
        .root
        .clone()
        .context("`[serve] root` is not configured")?;

    let (server, addr) = lifecycle::bind_with_retry(serve_config.interface, serve_config.port)?;
    let server = Arc::new(server);

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    register_shutdown(shutdown_tx);
    register_server(Arc::clone(&server));

    let mut coordinator =
        Coordinator::new(Arc::clone(&config), Arc::new(ctx)).with_shutdown_signal(shutdown_rx);
    let ws_port = coordinator.listen(serve_config.interface, serve_config.ws_port)?;

    let state = Arc::new(ServeState {
        root: crate::utils::path::normalize_path(&root),
        cors: serve_config.cors,
        ws_port,
    });

    let url = browser_url(addr);
    log!("serve"; "{} → {}", url, config.root_relative(&state.root).display());

    let actors = lifecycle::spawn_actors(coordinator);

    if serve_config.open {
        browser::open(&url);
    }

    run_request_loop(&server, &state)?;
    lifecycle::wait_for_shutdown(actors);
    Ok(())
}

/// `0.0.0.0` is not something a browser can open.
fn browser_url(addr: SocketAddr) -> String {
    let host = match addr.ip() {
        ip if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        ip => ip,
    };
    format!("http://{}", SocketAddr::new(host, addr.port()))
}

fn run_request_loop(server: &Server, state: &Arc<ServeState>) -> Result<()> {
    // a slow client must not stall the live-reload script for the others
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_THREADS)
        .build()
        .context("Failed to create request thread pool")?;

    for request in server.incoming_requests() {
        let state = Arc::clone(state);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &state) {
                log!("serve"; "request error: {e}");
            }
        });
    }

    debug!("serve"; "request loop stopped");
    Ok(())
}

/// Handle a single HTTP request
fn handle_request(request: Request, state: &ServeState) -> Result<()> {
    if is_shutdown() {
        return response::respond_unavailable(request, state);
    }

    if request.method() == &Method::Options {
        return response::respond_preflight(request, state);
    }

    if request.url().split('?').next() == Some(LIVERELOAD_URL) {
        return response::respond_livereload_js(request, state);
    }

    match path::resolve(request.url(), &state.root) {
        Resolution::File(path) => response::respond_file(request, &path, state),
        Resolution::Redirect(location) => response::respond_redirect(request, &location, state),
        Resolution::NotFound => {
            debug!("serve"; "404 {}", request.url());
            response::respond_not_found(request, state)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use tempfile::TempDir;

    /// Serve one request against `state` and return the raw HTTP response.
    fn roundtrip(state: ServeState, raw_request: &str) -> String {
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();

        let handle = std::thread::spawn(move || {
            let request = server.recv().unwrap();
            handle_request(request, &state).unwrap();
        });

        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        stream.write_all(raw_request.as_bytes()).unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        handle.join().unwrap();
        response
    }

    fn get(path: &str) -> String {
        format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
    }

    fn site(cors: bool) -> (TempDir, ServeState) {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("index.html"),
            "<html><body><h1>hi</h1></body></html>",
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("build/css")).unwrap();
        fs::write(dir.path().join("build/css/app.min.css"), "a{color:red}").unwrap();

        let state = ServeState {
            root: dir.path().canonicalize().unwrap(),
            cors,
            ws_port: 40123,
        };
        (dir, state)
    }

    #[test]
    fn test_html_gets_client_and_cors() {
        let (_dir, state) = site(true);
        let response = roundtrip(state, &get("/"));

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("Access-Control-Allow-Origin: *"));
        assert!(response.contains(&format!("{}</body>", crate::embed::serve::script_tag())));
    }

    #[test]
    fn test_css_is_served_untouched() {
        let (_dir, state) = site(true);
        let response = roundtrip(state, &get("/build/css/app.min.css?_brisk=1"));

        assert!(response.contains("text/css"));
        assert!(response.ends_with("a{color:red}"));
    }

    #[test]
    fn test_cors_can_be_disabled() {
        let (_dir, state) = site(false);
        let response = roundtrip(state, &get("/"));
        assert!(!response.contains("Access-Control-Allow-Origin"));
    }

    #[test]
    fn test_livereload_client_uses_ws_port() {
        let (_dir, state) = site(true);
        let response = roundtrip(state, &get(LIVERELOAD_URL));

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("text/javascript"));
        assert!(response.contains("40123"));
    }

    #[test]
    fn test_missing_file_is_404() {
        let (_dir, state) = site(true);
        let response = roundtrip(state, &get("/nope.js"));
        assert!(response.starts_with("HTTP/1.1 404"));
        assert!(response.contains("Access-Control-Allow-Origin: *"));
    }

    #[test]
    fn test_preflight() {
        let (_dir, state) = site(true);
        let response = roundtrip(
            state,
            "OPTIONS /build/css/app.min.css HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        );
        assert!(response.starts_with("HTTP/1.1 204"));
        assert!(response.contains("Access-Control-Allow-Methods"));
    }

    #[test]
    fn test_browser_url_for_unspecified_interface() {
        let addr: SocketAddr = "0.0.0.0:3000".parse().unwrap();
        assert_eq!(browser_url(addr), "http://127.0.0.1:3000");
    }
}
