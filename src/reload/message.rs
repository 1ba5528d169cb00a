//! Live Reload Message Protocol
//!
//! JSON messages sent over the WebSocket to the embedded client.
//!
//! - `reload`: full page reload
//! - `css`: re-fetch stylesheets in place (the client reloads when the page
//!   has no stylesheet link)
//! - `error` / `clear_error`: show or hide the build error overlay

use serde::{Deserialize, Serialize};

use crate::core::AssetCategory;

/// Message sent to browser clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Full page reload
    Reload {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Stylesheet hot swap
    Css {
        /// Rewritten stylesheet file names
        files: Vec<String>,
    },

    /// Connection established
    Connected { version: String },

    /// Build error (display overlay, no reload)
    Error {
        /// Pipeline that failed
        source: String,
        error: String,
    },

    /// Clear error overlay
    ClearError,
}

impl ReloadMessage {
    /// Message announcing a successful run of `category`.
    pub fn rebuilt(category: AssetCategory, files: Vec<String>) -> Self {
        if category.hot_swappable() {
            Self::Css { files }
        } else {
            Self::Reload {
                reason: Some(format!("{category} rebuilt")),
            }
        }
    }

    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn error(category: AssetCategory, error: impl Into<String>) -> Self {
        Self::Error {
            source: category.name().to_string(),
            error: error.into(),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_styles_hot_swap_others_reload() {
        let css = ReloadMessage::rebuilt(AssetCategory::Styles, vec!["app.min.css".into()]);
        assert_eq!(css.to_json(), r#"{"type":"css","files":["app.min.css"]}"#);

        for category in [
            AssetCategory::Scripts,
            AssetCategory::Images,
            AssetCategory::Fonts,
        ] {
            let json = ReloadMessage::rebuilt(category, Vec::new()).to_json();
            assert!(json.starts_with(r#"{"type":"reload""#), "{json}");
        }
    }

    #[test]
    fn test_error_shape_matches_client() {
        let json = ReloadMessage::error(AssetCategory::Scripts, "cannot resolve './x'").to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["source"], "scripts");
        assert_eq!(value["error"], "cannot resolve './x'");

        assert_eq!(ReloadMessage::ClearError.to_json(), r#"{"type":"clear_error"}"#);
    }

    #[test]
    fn test_reload_without_reason() {
        let msg = ReloadMessage::Reload { reason: None };
        assert_eq!(msg.to_json(), r#"{"type":"reload"}"#);
    }
}
