//! Rebuild Actor
//!
//! One per asset category. Runs the category's pipeline on a blocking
//! thread and reports the outcome to the terminal and to the WebSocket
//! actor. Changes that arrive while a run is in flight collapse into a
//! single pending run, so a burst of saves costs at most two runs.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinError;

use super::messages::{RebuildMsg, WsMsg};
use crate::core::AssetCategory;
use crate::logger::{status_error, status_success};
use crate::pipeline::{PipelineError, Rebuild, TaskReport};

pub struct RebuildActor<R: Rebuild> {
    category: AssetCategory,
    rx: mpsc::Receiver<RebuildMsg>,
    builder: Arc<R>,
    /// `None` in `watch` mode (no browsers to notify)
    ws_tx: Option<mpsc::Sender<WsMsg>>,
}

impl<R: Rebuild> RebuildActor<R> {
    pub fn new(
        category: AssetCategory,
        rx: mpsc::Receiver<RebuildMsg>,
        builder: Arc<R>,
        ws_tx: Option<mpsc::Sender<WsMsg>>,
    ) -> Self {
        Self {
            category,
            rx,
            builder,
            ws_tx,
        }
    }

    /// Run the actor event loop.
    ///
    /// A closed inbox still runs the pending batch; `Shutdown` drops it.
    pub async fn run(mut self) {
        let mut pending: Option<Vec<PathBuf>> = None;
        // inbox still worth polling
        let mut open = true;
        // Shutdown received: the pending run is dropped
        let mut stopping = false;

        loop {
            let mut changed = match pending.take() {
                Some(paths) => paths,
                None if !open => break,
                None => match self.rx.recv().await {
                    Some(RebuildMsg::Changed(paths)) => paths,
                    Some(RebuildMsg::Shutdown) | None => break,
                },
            };

            // fold in whatever queued up before the run starts
            while let Ok(msg) = self.rx.try_recv() {
                match msg {
                    RebuildMsg::Changed(paths) => changed.extend(paths),
                    RebuildMsg::Shutdown => (open, stopping) = (false, true),
                }
            }

            let builder = Arc::clone(&self.builder);
            let category = self.category;
            let mut handle = tokio::task::spawn_blocking(move || builder.rebuild(category));

            let result = loop {
                tokio::select! {
                    result = &mut handle => break result,
                    msg = self.rx.recv(), if open => match msg {
                        Some(RebuildMsg::Changed(paths)) => {
                            pending.get_or_insert_with(Vec::new).extend(paths);
                        }
                        Some(RebuildMsg::Shutdown) => (open, stopping) = (false, true),
                        None => open = false,
                    },
                }
            };

            self.report(&changed, result).await;

            if stopping {
                break;
            }
        }

        crate::debug!(self.category.log_module(); "rebuild actor stopped");
    }

    async fn report(
        &self,
        changed: &[PathBuf],
        result: Result<Result<TaskReport, PipelineError>, JoinError>,
    ) {
        let category = self.category;
        let trigger = trigger_label(changed);

        let msg = match result {
            Ok(Ok(report)) => {
                status_success(category.name(), &format!("{category}: {report} ({trigger})"));
                WsMsg::Rebuilt {
                    category,
                    files: written_names(&report),
                }
            }
            Ok(Err(e)) => {
                status_error(
                    category.name(),
                    &format!("{category} failed ({trigger})"),
                    &e.detail(),
                );
                WsMsg::Failed {
                    category,
                    error: e.detail(),
                }
            }
            Err(e) => {
                crate::log!(category.log_module(); "pipeline panicked: {}", e);
                return;
            }
        };

        if let Some(ws_tx) = &self.ws_tx
            && ws_tx.send(msg).await.is_err()
        {
            crate::debug!(category.log_module(); "ws actor gone, notification dropped");
        }
    }
}

/// `app.scss` or `app.scss +3`
fn trigger_label(changed: &[PathBuf]) -> String {
    let first = changed
        .first()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match changed.len() {
        0 | 1 => first,
        n => format!("{first} +{}", n - 1),
    }
}

fn written_names(report: &TaskReport) -> Vec<String> {
    report
        .written
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect()
}
