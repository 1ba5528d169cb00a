//! Live reload for development.
//!
//! ```text
//! RebuildActor -> WsActor -> browser (livereload.js)
//!                   ^
//!                 server (accepts WebSocket clients)
//! ```
//!
//! - `message` - JSON messages sent to the browser client
//! - `server` - WebSocket listener handing clients to the WsActor

pub mod message;
pub mod server;
