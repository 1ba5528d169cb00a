//! `watch`: rerun pipelines on change, without a server.

use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam::channel;

use crate::actor::Coordinator;
use crate::core::{AssetCategory, register_shutdown};
use crate::log;
use crate::pipeline::BuildContext;

/// Watch until Ctrl+C.
pub fn watch(ctx: BuildContext) -> Result<()> {
    let config = Arc::clone(&ctx.config);
    for category in AssetCategory::ALL {
        log!("watch"; "{}: {}", category, config.paths.get(category).watch.join(", "));
    }

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    register_shutdown(shutdown_tx);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    rt.block_on(
        Coordinator::new(config, Arc::new(ctx))
            .with_shutdown_signal(shutdown_rx)
            .run(),
    )
}
