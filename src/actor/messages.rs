//! Actor Message Definitions
//!
//! ```text
//! FsActor --Changed--> RebuildActor --Rebuilt/Failed--> WsActor
//! ```

use std::net::TcpStream;
use std::path::PathBuf;

use crate::core::AssetCategory;

// =============================================================================
// RebuildActor Messages
// =============================================================================

/// Messages to a category's rebuild actor
#[derive(Debug)]
pub enum RebuildMsg {
    /// Watched files of this category changed
    Changed(Vec<PathBuf>),
    /// Finish the current run (if any) and stop
    Shutdown,
}

// =============================================================================
// WsActor Messages
// =============================================================================

/// Messages to WebSocket Actor
#[derive(Debug)]
pub enum WsMsg {
    /// A pipeline run succeeded
    Rebuilt {
        category: AssetCategory,
        /// Output file names relative to the category destination
        files: Vec<String>,
    },
    /// A pipeline run failed (display overlay, no reload)
    Failed {
        category: AssetCategory,
        error: String,
    },
    /// Add client
    AddClient(TcpStream),
    /// Shutdown
    Shutdown,
}
