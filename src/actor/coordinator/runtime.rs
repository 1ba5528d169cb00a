use std::time::Duration;

use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use crate::actor::fs::{FsActor, RebuildRoutes};
use crate::actor::messages::{RebuildMsg, WsMsg};
use crate::actor::rebuild::RebuildActor;
use crate::actor::ws::WsActor;
use crate::pipeline::Rebuild;

/// How long an in-flight pipeline run may delay shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Run all actors concurrently.
pub(super) async fn run_actors<R: Rebuild>(
    fs: FsActor,
    rebuilders: Vec<RebuildActor<R>>,
    ws: Option<WsActor>,
    routes: RebuildRoutes,
    ws_tx: Option<mpsc::Sender<WsMsg>>,
    shutdown_rx: Option<Receiver<()>>,
) {
    let rebuild_handles: Vec<_> = rebuilders
        .into_iter()
        .map(|actor| tokio::spawn(actor.run()))
        .collect();
    let ws_handle = ws.map(|actor| tokio::spawn(actor.run()));
    let mut fs_handle = tokio::spawn(fs.run());

    if let Some(rx) = shutdown_rx {
        loop {
            if rx.try_recv().is_ok() {
                crate::debug!("actor"; "shutdown signal received");
                break;
            }
            if fs_handle.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    } else {
        let _ = (&mut fs_handle).await;
    }

    fs_handle.abort();

    for tx in routes.values() {
        let _ = tx.send(RebuildMsg::Shutdown).await;
    }
    drop(routes);
    let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
        for handle in rebuild_handles {
            let _ = handle.await;
        }
    })
    .await;
    if drained.is_err() {
        crate::debug!("actor"; "pipeline still running at shutdown");
    }

    if let Some(tx) = ws_tx {
        let _ = tx.send(WsMsg::Shutdown).await;
    }
    if let Some(handle) = ws_handle {
        let _ = tokio::time::timeout(Duration::from_millis(500), handle).await;
    }
}
