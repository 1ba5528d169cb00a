//! `[remote]` section configuration.
//!
//! Transport policy for `--deploy`. Connection details live in `.sftpconfig`.
//!
//! # Example
//!
//! ```toml
//! [remote]
//! ignore_errors = true    # a failed upload does not fail the pipeline
//! timeout_secs = 20       # TCP connect + SSH handshake timeout
//! ```

use serde::{Deserialize, Serialize};

/// Remote mirroring policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Log transport failures at debug level instead of failing the task.
    pub ignore_errors: bool,

    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            ignore_errors: true,
            timeout_secs: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_lenient_by_default() {
        let config = test_parse_config("");
        assert!(config.remote.ignore_errors);
    }

    #[test]
    fn test_strict_mode() {
        let config = test_parse_config("[remote]\nignore_errors = false");
        assert!(!config.remote.ignore_errors);
        assert_eq!(config.remote.timeout_secs, 20);
    }
}
