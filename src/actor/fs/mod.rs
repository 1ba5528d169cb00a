//! FileSystem Actor
//!
//! Watches the directories under the path table's watch patterns and routes
//! debounced change batches to the rebuild actor of each matching category.
//!
//! ```text
//! Watcher → Debouncer (pure timing) → Router (watch patterns) → RebuildMsg
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use notify::RecommendedWatcher;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;

use super::messages::RebuildMsg;
use crate::config::ProjectConfig;
use crate::core::AssetCategory;

// Pure timing and deduplication.
mod debouncer;
// Change routing (paths -> categories).
mod router;
// Shared fs event types.
mod types;
// Watch root attach/re-attach lifecycle.
mod watch_roots;

#[cfg(test)]
mod tests;

use debouncer::Debouncer;
use router::{log_changes, route};
use watch_roots::WatchRoots;

/// Rebuild actor inboxes, one per category.
pub type RebuildRoutes = FxHashMap<AssetCategory, mpsc::Sender<RebuildMsg>>;

/// FileSystem Actor - watches for file changes
pub struct FsActor {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    watch_roots: WatchRoots,
    routes: RebuildRoutes,
    debouncer: Debouncer,
    config: Arc<ProjectConfig>,
}

impl FsActor {
    /// Create the actor and start watching immediately.
    ///
    /// Events that arrive before `run` is awaited are buffered in the
    /// notify channel, not lost.
    pub fn new(
        paths: Vec<PathBuf>,
        routes: RebuildRoutes,
        config: Arc<ProjectConfig>,
    ) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let mut watch_roots = WatchRoots::new(paths);
        watch_roots.attach_existing(&mut watcher)?;

        Ok(Self {
            notify_rx,
            watcher,
            watch_roots,
            routes,
            debouncer: Debouncer::new(),
            config,
        })
    }

    /// Run the actor event loop until every rebuild actor is gone.
    pub async fn run(self) {
        let notify_rx = self.notify_rx;
        let routes = self.routes;
        let config = self.config;
        let mut debouncer = self.debouncer;
        let mut watcher = self.watcher;
        let mut watch_roots = self.watch_roots;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        // notify only offers a sync callback
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                Some(event) = async_rx.recv() => debouncer.add_event(&event),
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    watch_roots.maintain(&mut watcher);
                    if dispatch(&mut debouncer, &routes, &config).await.is_err() {
                        break;
                    }
                }
            }
        }

        crate::debug!("watch"; "stopped");
    }
}

/// Route a ready batch to the rebuild actors.
///
/// Returns `Err(())` once a rebuild actor has shut down.
async fn dispatch(
    debouncer: &mut Debouncer,
    routes: &RebuildRoutes,
    config: &ProjectConfig,
) -> Result<(), ()> {
    let Some(changes) = debouncer.take_if_ready() else {
        return Ok(());
    };

    log_changes(&changes);

    for batch in route(&changes, config) {
        let Some(tx) = routes.get(&batch.category) else {
            continue;
        };
        crate::debug!("watch"; "{}: {} changed", batch.category, batch.paths.len());
        tx.send(RebuildMsg::Changed(batch.paths))
            .await
            .map_err(|_| ())?;
    }

    Ok(())
}
