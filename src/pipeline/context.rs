//! Build context shared by every pipeline run.
//!
//! Constructed once at startup from the project config and the CLI flags,
//! then passed by reference. Pipelines never consult global state to decide
//! whether to deploy.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::cli::Cli;
use crate::config::{DeployConfig, ProjectConfig};
use crate::log;
use crate::remote::{RemoteSink, SftpSink};

/// Remote mirroring target, present only with `--deploy`.
#[derive(Clone)]
pub struct Deployment {
    /// Remote base path from the deployment config.
    pub base: String,
    pub sink: Arc<dyn RemoteSink>,
    pub ignore_errors: bool,
}

/// Immutable inputs of a pipeline run.
#[derive(Clone)]
pub struct BuildContext {
    pub config: Arc<ProjectConfig>,
    pub deploy: Option<Deployment>,
}

impl BuildContext {
    /// Context that only writes local output.
    pub fn local(config: Arc<ProjectConfig>) -> Self {
        Self {
            config,
            deploy: None,
        }
    }

    pub fn with_deployment(mut self, deployment: Deployment) -> Self {
        self.deploy = Some(deployment);
        self
    }

    /// Build the context for a CLI invocation.
    ///
    /// With `--deploy`, the deployment config must exist and parse; otherwise
    /// this fails before any pipeline starts.
    pub fn from_cli(config: Arc<ProjectConfig>, cli: &Cli) -> Result<Self> {
        if !cli.deploy {
            return Ok(Self::local(config));
        }

        let deploy = DeployConfig::load(&config.root_join(&cli.sftp_config))?;
        log!(
            "remote";
            "mirroring to {}@{}:{}",
            deploy.connect.username,
            deploy.connect.host,
            deploy.path
        );

        let timeout = Duration::from_secs(config.remote.timeout_secs);
        let deployment = Deployment {
            base: deploy.path,
            sink: Arc::new(SftpSink::new(deploy.connect, timeout)),
            ignore_errors: config.remote.ignore_errors,
        };
        Ok(Self::local(config).with_deployment(deployment))
    }
}
