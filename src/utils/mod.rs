//! Shared utilities.

pub mod glob;
pub mod mime;
pub mod path;
