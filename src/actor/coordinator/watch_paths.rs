use std::path::PathBuf;

use crate::config::ProjectConfig;
use crate::core::AssetCategory;
use crate::utils::glob::base_dir;

/// Directories to watch recursively: the literal prefix of every watch
/// pattern, without roots nested inside another root.
pub(super) fn collect_watch_paths(config: &ProjectConfig) -> Vec<PathBuf> {
    let root = config.get_root();
    let mut paths: Vec<PathBuf> = AssetCategory::ALL
        .iter()
        .flat_map(|&category| &config.paths.get(category).watch)
        .map(|pattern| base_dir(root, pattern))
        .collect();

    paths.sort();
    paths.dedup();
    dedupe_nested(&mut paths);
    paths
}

/// Drop roots already covered by an ancestor root. Expects sorted input.
fn dedupe_nested(paths: &mut Vec<PathBuf>) {
    let mut kept: Vec<PathBuf> = Vec::with_capacity(paths.len());
    for path in paths.drain(..) {
        if !kept.iter().any(|root| path.starts_with(root)) {
            kept.push(path);
        }
    }
    *paths = kept;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_default_layout_watches_each_source_dir() {
        let config = crate::config::test_config_at(Path::new("/p"), "");
        assert_eq!(
            collect_watch_paths(&config),
            vec![
                PathBuf::from("/p/src/fonts"),
                PathBuf::from("/p/src/img"),
                PathBuf::from("/p/src/js"),
                PathBuf::from("/p/src/scss"),
            ]
        );
    }

    #[test]
    fn test_nested_roots_collapse() {
        let config = crate::config::test_config_at(
            Path::new("/p"),
            "[paths.scripts]\nsrc = \"src/app.js\"\nwatch = \"src/**/*.js\"\ndest = \"out/js\"\n",
        );
        let paths = collect_watch_paths(&config);
        assert!(paths.contains(&PathBuf::from("/p/src")));
        assert!(!paths.contains(&PathBuf::from("/p/src/scss")));
    }
}
