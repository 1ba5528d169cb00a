//! Brisk - Sass, JavaScript, image and font pipelines with a live-reload dev server.

mod actor;
mod cli;
mod config;
mod core;
mod embed;
mod freshness;
mod logger;
mod pipeline;
mod reload;
mod remote;
mod utils;

use std::sync::Arc;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::ProjectConfig;
use pipeline::BuildContext;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = Arc::new(ProjectConfig::load(&cli)?);
    let ctx = BuildContext::from_cli(config, &cli)?;

    match cli.selected() {
        Commands::Serve { .. } => cli::serve::serve(ctx),
        Commands::Watch => cli::watch::watch(ctx),
        command => cli::build::run_tasks(&ctx, command.categories()),
    }
}
