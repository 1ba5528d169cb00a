//! `[styles]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [styles]
//! browsers = ["last 10 versions"]     # browserslist queries for prefixing
//! load_paths = ["node_modules"]       # extra Sass @use/@import roots
//! source_map = true                   # write <name>.min.css.map
//! ```

use std::path::PathBuf;

use lightningcss::targets::Browsers;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Style pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StylesConfig {
    /// Browser range vendor prefixes are generated for.
    pub browsers: Vec<String>,

    /// Additional Sass load paths, relative to the project root.
    pub load_paths: Vec<PathBuf>,

    /// Write a source map next to each stylesheet.
    pub source_map: bool,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            browsers: vec!["last 10 versions".to_string()],
            load_paths: Vec::new(),
            source_map: true,
        }
    }
}

impl StylesConfig {
    pub const BROWSERS: FieldPath = FieldPath::new("styles.browsers");

    /// Resolve the browserslist queries.
    pub fn targets(&self) -> Result<Option<Browsers>, String> {
        Browsers::from_browserslist(&self.browsers).map_err(|e| e.to_string())
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if let Err(e) = self.targets() {
            diag.error(Self::BROWSERS, format!("invalid browserslist query: {e}"));
        }
    }
}
