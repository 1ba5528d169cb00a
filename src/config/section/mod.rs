//! Configuration section definitions.
//!
//! Each module corresponds to a section in `brisk.toml`:
//!
//! | Module    | TOML Section | Purpose                               |
//! |-----------|--------------|---------------------------------------|
//! | `serve`   | `[serve]`    | Dev server (root, port, cors)         |
//! | `styles`  | `[styles]`   | Browser range, Sass load paths        |
//! | `scripts` | `[scripts]`  | Downlevel target                      |
//! | `images`  | `[images]`   | Compression settings, cache location  |
//! | `remote`  | `[remote]`   | Upload error policy                   |

mod images;
mod remote;
mod scripts;
mod serve;
mod styles;

pub use images::{ImagesConfig, JpegConfig, PngConfig};
pub use remote::RemoteConfig;
pub use scripts::ScriptsConfig;
pub use serve::ServeConfig;
pub use styles::StylesConfig;
