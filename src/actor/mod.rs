//! Actor system for watch mode.
//!
//! ```text
//!                        ┌─▶ RebuildActor(styles)  ─┐
//! FsActor ──Changed──────┼─▶ RebuildActor(scripts) ─┼──Rebuilt/Failed──▶ WsActor ──▶ browsers
//! (notify + debounce)    ├─▶ RebuildActor(images)  ─┤
//!                        └─▶ RebuildActor(fonts)   ─┘
//! ```
//!
//! Each category has its own rebuild actor, so a slow image run never holds
//! up a stylesheet swap. The WebSocket actor only exists when serving.

mod coordinator;
mod fs;
mod messages;
mod rebuild;
mod ws;

pub use coordinator::Coordinator;
pub use messages::WsMsg;
