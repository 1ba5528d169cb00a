//! WebSocket Server for Live Reload
//!
//! Accepts connections on its own port and hands each raw stream to the
//! WsActor, which performs the handshake and owns the client afterwards.

use std::net::{IpAddr, SocketAddr, TcpListener};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::actor::WsMsg;

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Start the listener thread; returns the port actually bound.
pub fn start(interface: IpAddr, base_port: u16, ws_tx: mpsc::Sender<WsMsg>) -> Result<u16> {
    let (listener, actual_port) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
    listener.set_nonblocking(true)?;

    std::thread::spawn(move || {
        loop {
            match listener.accept() {
                Ok((stream, addr)) => {
                    crate::debug!("reload"; "client connected: {}", addr);

                    // the handshake in WsActor is blocking
                    let _ = stream.set_nonblocking(false);

                    if ws_tx.blocking_send(WsMsg::AddClient(stream)).is_err() {
                        crate::debug!("reload"; "ws actor gone, listener stopping");
                        break;
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    crate::log!("reload"; "accept error: {}", e);
                    std::thread::sleep(Duration::from_millis(100));
                }
            }
        }
    });

    Ok(actual_port)
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(SocketAddr::new(interface, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                if offset > 0 {
                    crate::log!("reload"; "port {} in use, using {} instead", base_port, actual_port);
                }
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    let error = last_error.map_or_else(|| anyhow::anyhow!("no port tried"), anyhow::Error::from);
    Err(error.context(format!(
        "failed to bind live-reload server after {} attempts (ports {}-{})",
        max_retries,
        base_port,
        base_port.saturating_add(max_retries.saturating_sub(1))
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_bind_skips_busy_port() {
        let localhost = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let busy = TcpListener::bind(SocketAddr::new(localhost, 0)).unwrap();
        let port = busy.local_addr().unwrap().port();

        let (_listener, actual) = try_bind_port(localhost, port, 5).unwrap();
        assert_ne!(actual, port);
    }

    #[test]
    fn test_bind_gives_up() {
        let localhost = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let busy = TcpListener::bind(SocketAddr::new(localhost, 0)).unwrap();
        let port = busy.local_addr().unwrap().port();

        let err = try_bind_port(localhost, port, 1).unwrap_err();
        assert!(err.to_string().contains("failed to bind"));
    }
}
