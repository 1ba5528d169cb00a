//! `[scripts]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [scripts]
//! target = "es2015"       # syntax level the bundle is lowered to
//! source_map = true       # write <name>.min.js.map
//! ```

use oxc::transformer::TransformOptions;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Script pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Downleveling preset (`es2015`, `es2020`, `chrome80,firefox78`, ...).
    ///
    /// `es2015` is both the default and the floor: there is no ES5 preset,
    /// even when `[styles] browsers` reaches older engines.
    pub target: String,

    /// Write a source map next to each bundle.
    pub source_map: bool,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            target: "es2015".to_string(),
            source_map: true,
        }
    }
}

impl ScriptsConfig {
    pub const TARGET: FieldPath = FieldPath::new("scripts.target");

    /// Transformer options for the configured target.
    pub fn transform_options(&self) -> Result<TransformOptions, String> {
        TransformOptions::from_target(&self.target)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if let Err(e) = self.transform_options() {
            diag.error_with_hint(
                Self::TARGET,
                format!("unsupported target `{}`: {e}", self.target),
                "use an ES version from \"es2015\" up or an engine list such as \"chrome80\"",
            );
        }
    }
}
