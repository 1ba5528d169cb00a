//! Project configuration management for `brisk.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # [serve] [styles] [scripts] [images] [remote]
//! ├── types/         # ConfigError, ConfigDiagnostics, FieldPath
//! ├── deploy.rs      # .sftpconfig (JSON, only read with --deploy)
//! ├── paths.rs       # [paths.<category>] path table
//! └── mod.rs         # ProjectConfig (this file)
//! ```
//!
//! `brisk.toml` is optional: without one, the defaults describe the
//! `src/{js,scss,img,fonts}` → `build/{js,css,img,fonts}` layout and the
//! current directory is the project root.

mod deploy;
mod paths;
pub mod section;
pub mod types;
mod util;

pub use deploy::{ConnectProfile, DeployConfig};
pub use paths::{CategoryPaths, PathTable};
pub use section::{
    ImagesConfig, JpegConfig, PngConfig, RemoteConfig, ScriptsConfig, ServeConfig, StylesConfig,
};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath};

use crate::{
    cli::{Cli, Commands},
    core::AssetCategory,
    log,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use util::find_config_file;

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing brisk.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Absolute path to the config file, if one was found (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Project root directory - parent of config file, or cwd (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Path table
    #[serde(default)]
    pub paths: PathTable,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Style pipeline settings
    #[serde(default)]
    pub styles: StylesConfig,

    /// Script pipeline settings
    #[serde(default)]
    pub scripts: ScriptsConfig,

    /// Image pipeline settings
    #[serde(default)]
    pub images: ImagesConfig,

    /// Remote upload policy
    #[serde(default)]
    pub remote: RemoteConfig,
}

impl ProjectConfig {
    /// Load configuration for the given CLI invocation.
    ///
    /// Searches upward from cwd for the config file. The project root is the
    /// config file's parent directory, or cwd when no file exists.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cli.config, &cwd) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.root = path
                    .parent()
                    .map(crate::utils::path::normalize_path)
                    .unwrap_or_else(|| cwd.clone());
                config.config_path = Some(path);
                config
            }
            None => {
                crate::debug!("config"; "{} not found, using defaults", cli.config.display());
                Self {
                    root: cwd,
                    ..Self::default()
                }
            }
        };

        config.apply_command_options(cli);
        config.normalize_paths();
        config.validate(&cli.selected())?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Join a path with the root directory.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Get path relative to the project root
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        crate::utils::path::relative_to(path.as_ref(), &self.root)
    }

    /// Absolute destination directory of a category.
    pub fn dest_dir(&self, category: AssetCategory) -> PathBuf {
        self.root_join(&self.paths.get(category).dest)
    }

    /// Absolute path of the image cache manifest.
    pub fn image_cache_path(&self) -> PathBuf {
        self.root_join(&self.images.cache_dir).join("images.json")
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, cli: &Cli) {
        if let Commands::Serve {
            interface,
            port,
            no_open,
        } = cli.selected()
        {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
            if no_open {
                self.serve.open = false;
            }
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Resolve directory settings against the project root.
    ///
    /// Path-table patterns stay root-relative; they are joined at expansion.
    fn normalize_paths(&mut self) {
        let root = self.root.clone();
        if let Some(serve_root) = self.serve.root.take() {
            self.serve.root = Some(crate::utils::path::normalize_path(&root.join(serve_root)));
        }
        self.styles.load_paths = self
            .styles
            .load_paths
            .iter()
            .map(|p| crate::utils::path::normalize_path(&root.join(p)))
            .collect();
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration for the current command.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self, command: &Commands) -> Result<()> {
        let mut diag = ConfigDiagnostics::for_file(self.config_path.as_deref());

        self.paths.validate(&mut diag);
        self.styles.validate(&mut diag);
        self.scripts.validate(&mut diag);
        self.images.validate(&mut diag);

        if matches!(command, Commands::Serve { .. }) {
            self.serve.validate(&mut diag);
        }

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> ProjectConfig {
    let (parsed, ignored) = ProjectConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// Default config rooted at `root`, as if loaded from `root/brisk.toml`.
#[cfg(test)]
pub fn test_config_at(root: &Path, content: &str) -> ProjectConfig {
    let mut config = test_parse_config(content);
    config.root = root.to_path_buf();
    config.normalize_paths();
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_unknown_fields_are_collected() {
        let (_, ignored) =
            ProjectConfig::parse_with_ignored("[serve]\nprot = 80\n[stlyes]\n").unwrap();
        assert_eq!(ignored.len(), 2);
    }

    #[test]
    fn test_serve_cli_overrides() {
        let cli = Cli::parse_from(["brisk", "serve", "-i", "0.0.0.0", "-p", "9000", "--no-open"]);
        let mut config = ProjectConfig::default();
        config.apply_command_options(&cli);
        assert_eq!(config.serve.port, 9000);
        assert_eq!(config.serve.interface, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert!(!config.serve.open);
    }

    #[test]
    fn test_serve_requires_root_only_for_serve() {
        let config = test_parse_config("");
        assert!(config.validate(&Commands::Build).is_ok());
        let err = config
            .validate(&Commands::Serve {
                interface: None,
                port: None,
                no_open: false,
            })
            .unwrap_err();
        assert!(err.to_string().contains("serve.root"));
    }

    #[test]
    fn test_dest_dir_is_root_relative() {
        let config = test_config_at(Path::new("/project"), "");
        assert_eq!(
            config.dest_dir(AssetCategory::Styles),
            PathBuf::from("/project/build/css/")
        );
        assert_eq!(
            config.image_cache_path(),
            PathBuf::from("/project/.brisk-cache/images.json")
        );
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(ProjectConfig::from_str("[serve\nport = 1").is_err());
    }
}
