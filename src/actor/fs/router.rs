use std::path::PathBuf;

use rustc_hash::FxHashMap;

use super::types::{CategoryChanges, ChangeKind};
use crate::config::ProjectConfig;
use crate::core::AssetCategory;
use crate::utils::glob::matches_any;

pub(super) fn log_changes(changes: &FxHashMap<PathBuf, ChangeKind>) {
    for (path, kind) in changes {
        crate::debug!("watch"; "{}: {}", kind.label(), path.display());
    }
}

/// Group a debounced batch by the categories whose watch patterns match.
///
/// A path matching no category is dropped; a path matching several is
/// delivered to each. Categories come out in `AssetCategory::ALL` order.
pub(super) fn route(
    changes: &FxHashMap<PathBuf, ChangeKind>,
    config: &ProjectConfig,
) -> Vec<CategoryChanges> {
    let root = config.get_root();

    AssetCategory::ALL
        .into_iter()
        .filter_map(|category| {
            let watch = &config.paths.get(category).watch;
            let mut paths: Vec<PathBuf> = changes
                .keys()
                .filter(|path| matches_any(root, watch, path))
                .cloned()
                .collect();
            if paths.is_empty() {
                return None;
            }
            paths.sort();
            Some(CategoryChanges { category, paths })
        })
        .collect()
}
