//! Asset category definitions.

use std::fmt;

/// Asset category, one per pipeline and path-table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetCategory {
    Scripts,
    Styles,
    Images,
    Fonts,
}

impl AssetCategory {
    /// All categories, in the order `build` runs them.
    pub const ALL: [Self; 4] = [Self::Styles, Self::Scripts, Self::Images, Self::Fonts];

    /// Name used in logs, config keys and the `[paths.<name>]` table.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Scripts => "scripts",
            Self::Styles => "styles",
            Self::Images => "images",
            Self::Fonts => "fonts",
        }
    }

    /// Short log prefix.
    pub const fn log_module(self) -> &'static str {
        match self {
            Self::Scripts => "js",
            Self::Styles => "styles",
            Self::Images => "images",
            Self::Fonts => "fonts",
        }
    }

    /// Whether pipeline output is mirrored to the remote host on `--deploy`.
    pub const fn mirrors_remote(self) -> bool {
        matches!(self, Self::Scripts | Self::Styles)
    }

    /// Whether connected browsers can pick up the change without a full reload.
    pub const fn hot_swappable(self) -> bool {
        matches!(self, Self::Styles)
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
