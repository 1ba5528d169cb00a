//! Actor Coordinator - wires up the watch-mode actor system
//!
//! The Coordinator is a thin orchestrator that:
//! - Creates communication channels
//! - Wires up actors
//! - Runs them concurrently

mod runtime;
mod watch_paths;

use std::net::IpAddr;
use std::sync::Arc;

use anyhow::Result;
use crossbeam::channel::Receiver;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;

use super::fs::FsActor;
use super::messages::{RebuildMsg, WsMsg};
use super::rebuild::RebuildActor;
use super::ws::WsActor;
use crate::config::ProjectConfig;
use crate::core::AssetCategory;
use crate::pipeline::Rebuild;

const CHANNEL_BUFFER: usize = 32;

/// Coordinator - wires up and runs the actor system.
pub struct Coordinator<R: Rebuild> {
    config: Arc<ProjectConfig>,
    builder: Arc<R>,
    ws: Option<(mpsc::Sender<WsMsg>, mpsc::Receiver<WsMsg>)>,
    shutdown_rx: Option<Receiver<()>>,
}

impl<R: Rebuild> Coordinator<R> {
    pub fn new(config: Arc<ProjectConfig>, builder: Arc<R>) -> Self {
        Self {
            config,
            builder,
            ws: None,
            shutdown_rx: None,
        }
    }

    /// Start the live-reload WebSocket listener.
    ///
    /// Returns the port actually bound, which may be above `port` when it
    /// was taken. Without this call no browser is ever notified.
    pub fn listen(&mut self, interface: IpAddr, port: u16) -> Result<u16> {
        let (ws_tx, ws_rx) = mpsc::channel::<WsMsg>(CHANNEL_BUFFER);
        let actual = crate::reload::server::start(interface, port, ws_tx.clone())?;
        crate::debug!("reload"; "ws://{}:{}", interface, actual);
        self.ws = Some((ws_tx, ws_rx));
        Ok(actual)
    }

    /// Set shutdown signal receiver.
    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    /// Run the actor system until shutdown.
    pub async fn run(self) -> Result<()> {
        let (ws_tx, ws_actor) = match self.ws {
            Some((tx, rx)) => (Some(tx), Some(WsActor::new(rx))),
            None => (None, None),
        };

        let mut routes = FxHashMap::default();
        let mut rebuilders = Vec::with_capacity(AssetCategory::ALL.len());
        for category in AssetCategory::ALL {
            let (tx, rx) = mpsc::channel::<RebuildMsg>(CHANNEL_BUFFER);
            routes.insert(category, tx);
            rebuilders.push(RebuildActor::new(
                category,
                rx,
                Arc::clone(&self.builder),
                ws_tx.clone(),
            ));
        }

        let watch_paths = watch_paths::collect_watch_paths(&self.config);
        for path in &watch_paths {
            crate::debug!("watch"; "{}", path.display());
        }
        let fs_actor = FsActor::new(watch_paths, routes.clone(), Arc::clone(&self.config))
            .map_err(|e| anyhow::anyhow!("watcher failed: {}", e))?;

        crate::debug!("actor"; "start");
        runtime::run_actors(fs_actor, rebuilders, ws_actor, routes, ws_tx, self.shutdown_rx).await;
        crate::debug!("actor"; "stopped");
        Ok(())
    }
}
