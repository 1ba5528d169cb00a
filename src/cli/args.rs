//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::core::AssetCategory;

/// Front-end asset pipeline: Sass, JS bundling, image compression and live reload
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: brisk.toml, searched upward from cwd)
    #[arg(short = 'C', long, global = true, default_value = "brisk.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Also upload style and script output to the host in the deployment config
    #[arg(long, global = true)]
    pub deploy: bool,

    /// Deployment config path, relative to the project root
    #[arg(long = "sftp-config", global = true, default_value = ".sftpconfig", value_hint = clap::ValueHint::FilePath)]
    pub sftp_config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands (default: watch)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Compile Sass to minified, prefixed CSS
    Styles,

    /// Bundle, downlevel and minify JavaScript
    #[command(visible_alias = "scripts")]
    Js,

    /// Compress images (cached by content)
    #[command(visible_alias = "image")]
    Images,

    /// Copy changed font files
    Fonts,

    /// Run every pipeline once
    #[command(visible_alias = "b")]
    Build,

    /// Serve the document root with live reload and watch sources
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Don't open a browser on start
        #[arg(long)]
        no_open: bool,
    },

    /// Watch sources and rerun the matching pipeline on change
    #[command(visible_alias = "w")]
    Watch,
}

impl Cli {
    /// Selected command; `watch` when none is given.
    pub fn selected(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Watch)
    }
}

impl Commands {
    /// Pipelines a one-shot command runs. Empty for long-running commands.
    pub fn categories(&self) -> &'static [AssetCategory] {
        match self {
            Self::Styles => &[AssetCategory::Styles],
            Self::Js => &[AssetCategory::Scripts],
            Self::Images => &[AssetCategory::Images],
            Self::Fonts => &[AssetCategory::Fonts],
            Self::Build => &AssetCategory::ALL,
            Self::Serve { .. } | Self::Watch => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_watch() {
        let cli = Cli::parse_from(["brisk"]);
        assert_eq!(cli.selected(), Commands::Watch);
        assert!(!cli.deploy);
    }

    #[test]
    fn test_deploy_flag_is_global() {
        let cli = Cli::parse_from(["brisk", "styles", "--deploy"]);
        assert_eq!(cli.selected(), Commands::Styles);
        assert!(cli.deploy);
    }

    #[test]
    fn test_aliases() {
        assert_eq!(Cli::parse_from(["brisk", "scripts"]).selected(), Commands::Js);
        assert_eq!(Cli::parse_from(["brisk", "image"]).selected(), Commands::Images);
    }

    #[test]
    fn test_serve_options() {
        let cli = Cli::parse_from(["brisk", "serve", "-p", "8080", "--no-open"]);
        match cli.selected() {
            Commands::Serve { port, no_open, .. } => {
                assert_eq!(port, Some(8080));
                assert!(no_open);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_build_runs_every_category() {
        assert_eq!(Commands::Build.categories().len(), 4);
        assert!(Commands::Watch.categories().is_empty());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
