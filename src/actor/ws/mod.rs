//! WebSocket Actor
//!
//! Owns the live-reload clients and turns pipeline outcomes into
//! [`ReloadMessage`]s:
//!
//! | Outcome          | Message                         |
//! |------------------|---------------------------------|
//! | styles rebuilt   | `css` (stylesheets re-fetched)  |
//! | other rebuilt    | `reload`                        |
//! | any failure      | `error` (overlay, no reload)    |
//!
//! The last error of each category is replayed to clients that connect
//! while it is unresolved.

mod client_io;
mod delivery;

use std::net::TcpStream;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tungstenite::WebSocket;

use super::messages::WsMsg;
use crate::core::AssetCategory;
use crate::reload::message::ReloadMessage;

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// WebSocket Actor - manages client connections and broadcasts
pub struct WsActor {
    rx: mpsc::Receiver<WsMsg>,
    clients: Clients,
    /// Unresolved failures, replayed to new clients
    pending_errors: Arc<Mutex<FxHashMap<AssetCategory, String>>>,
}

impl WsActor {
    pub fn new(rx: mpsc::Receiver<WsMsg>) -> Self {
        Self {
            rx,
            clients: Arc::new(Mutex::new(Vec::new())),
            pending_errors: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        let clients_for_reader = Arc::clone(&self.clients);
        std::thread::spawn(move || client_io::reader_loop(clients_for_reader));

        while let Some(msg) = self.rx.recv().await {
            match msg {
                WsMsg::Rebuilt { category, files } => {
                    let recovered = self.pending_errors.lock().remove(&category).is_some();
                    if recovered {
                        self.broadcast(&ReloadMessage::ClearError);
                    }
                    crate::debug!("ws"; "{} rebuilt, notifying", category);
                    self.broadcast(&ReloadMessage::rebuilt(category, files));
                }

                WsMsg::Failed { category, error } => {
                    self.pending_errors.lock().insert(category, error.clone());
                    self.broadcast(&ReloadMessage::error(category, error));
                }

                WsMsg::AddClient(stream) => self.add_client(stream),

                WsMsg::Shutdown => {
                    crate::debug!("ws"; "shutting down");
                    let mut clients = self.clients.lock();
                    for mut ws in clients.drain(..) {
                        let _ = ws.close(None);
                    }
                    break;
                }
            }
        }
    }
}
