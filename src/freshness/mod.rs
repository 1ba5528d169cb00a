//! Freshness detection: blake3 content hashes for sources.

mod hash;

pub use hash::{ContentHash, compute_file_hash};
