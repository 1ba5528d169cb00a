//! `[serve]` section configuration.
//!
//! Contains development server settings.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! root = "build"              # Document root (required for `brisk serve`)
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 3000                 # HTTP port number
//! open = true                 # Open a browser on start
//! cors = true                 # Send Access-Control-Allow-Origin: *
//! ws_port = 35729             # Live-reload WebSocket port
//! ```
//!
//! Use `interface = "0.0.0.0"` to make the server accessible from LAN.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Development server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Directory served over HTTP, relative to the project root.
    ///
    /// No default: `serve` refuses to start until it is configured.
    pub root: Option<PathBuf>,

    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// Open the default browser once the server is listening.
    pub open: bool,

    /// Allow cross-origin requests.
    pub cors: bool,

    /// First port tried for the live-reload WebSocket.
    pub ws_port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            root: None,
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 3000,
            open: true,
            cors: true,
            ws_port: 35729,
        }
    }
}

impl ServeConfig {
    pub const ROOT: FieldPath = FieldPath::new("serve.root");

    /// Checks that only matter when the dev server is about to start.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        match &self.root {
            None => diag.error_with_hint(
                Self::ROOT,
                "document root is not configured",
                "add `root = \"build\"` (or your HTML directory) under [serve] in brisk.toml",
            ),
            Some(root) if !root.is_dir() => diag.error(
                Self::ROOT,
                format!("document root is not a directory: {}", root.display()),
            ),
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use crate::config::{ConfigDiagnostics, test_parse_config};

    #[test]
    fn test_serve_config() {
        let config = test_parse_config(
            "[serve]\nroot = \"public\"\ninterface = \"0.0.0.0\"\nport = 8080\nopen = false",
        );

        assert_eq!(
            config.serve.interface,
            IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0))
        );
        assert_eq!(config.serve.port, 8080);
        assert!(!config.serve.open);
        assert!(config.serve.cors);
        assert_eq!(config.serve.root.as_deref(), Some(std::path::Path::new("public")));
    }

    #[test]
    fn test_serve_config_defaults() {
        let config = test_parse_config("");

        assert_eq!(config.serve.port, 3000);
        assert_eq!(config.serve.ws_port, 35729);
        assert!(config.serve.open);
        assert!(config.serve.root.is_none());
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let config = test_parse_config("");
        let mut diag = ConfigDiagnostics::new();
        config.serve.validate(&mut diag);
        assert_eq!(diag.len(), 1);
        assert_eq!(diag.errors()[0].field.as_str(), "serve.root");
    }
}
