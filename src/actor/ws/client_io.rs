use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use tungstenite::protocol::Message;

use super::{Clients, WsActor};
use crate::reload::message::ReloadMessage;

impl WsActor {
    /// Handshake a new client, greet it and replay unresolved errors.
    pub(super) fn add_client(&self, stream: TcpStream) {
        // handshake in blocking mode, poll reads non-blocking afterwards
        let mut ws = match tungstenite::accept(stream) {
            Ok(ws) => ws,
            Err(e) => {
                crate::log!("ws"; "handshake failed: {}", e);
                return;
            }
        };
        let _ = ws.get_ref().set_nonblocking(true);

        let mut greeting = vec![ReloadMessage::connected()];
        greeting.extend(
            self.pending_errors
                .lock()
                .iter()
                .map(|(category, error)| ReloadMessage::error(*category, error.clone())),
        );

        for msg in greeting {
            if let Err(e) = ws.send(Message::Text(msg.to_json().into())) {
                crate::debug!("ws"; "client dropped during greeting: {}", e);
                return;
            }
        }

        let mut clients = self.clients.lock();
        clients.push(ws);
        crate::debug!("ws"; "client connected (total: {})", clients.len());
    }
}

/// Poll clients so closed connections are dropped and pings answered.
///
/// Stops once the actor (the other owner of `clients`) is gone.
pub(super) fn reader_loop(clients: Clients) {
    while Arc::strong_count(&clients) > 1 {
        std::thread::sleep(Duration::from_millis(100));

        clients.lock().retain_mut(|ws| match ws.read() {
            Ok(Message::Close(_)) => false,
            Ok(_) => true,
            Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                true
            }
            Err(_) => false,
        });
    }
}
