use std::path::PathBuf;

use crate::core::AssetCategory;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Changed paths of one category, in path order.
#[derive(Debug, PartialEq, Eq)]
pub(super) struct CategoryChanges {
    pub(super) category: AssetCategory,
    pub(super) paths: Vec<PathBuf>,
}
