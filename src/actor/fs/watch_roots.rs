use std::path::{Path, PathBuf};

use notify::{RecursiveMode, Watcher};
use rustc_hash::FxHashMap;

/// How a source directory is currently observed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RootState {
    /// Watched recursively.
    Attached,
    /// Missing; its nearest existing ancestor is watched non-recursively so
    /// that creating the directory produces an event.
    Pending { ancestor: Option<PathBuf> },
}

/// Source directories to watch.
///
/// `src/fonts` may not exist when watching starts, and any root may be
/// deleted and recreated. Each `maintain` pass moves roots between the two
/// states to match the filesystem.
pub(super) struct WatchRoots {
    roots: FxHashMap<PathBuf, RootState>,
}

impl WatchRoots {
    pub(super) fn new(paths: Vec<PathBuf>) -> Self {
        let roots = paths
            .into_iter()
            .map(|p| (p, RootState::Pending { ancestor: None }))
            .collect();
        Self { roots }
    }

    /// First attach. Fails only if an existing root cannot be watched.
    pub(super) fn attach_existing<W: Watcher>(&mut self, watcher: &mut W) -> notify::Result<()> {
        for (path, state) in &mut self.roots {
            if path.is_dir() {
                watcher.watch(path, RecursiveMode::Recursive)?;
                *state = RootState::Attached;
            } else {
                crate::debug!("watch"; "not yet present: {}", path.display());
                *state = pending(watcher, path);
            }
        }
        Ok(())
    }

    /// Re-sync with the filesystem after a batch of events.
    pub(super) fn maintain<W: Watcher>(&mut self, watcher: &mut W) {
        for (path, state) in &mut self.roots {
            match state.clone() {
                RootState::Attached if !path.is_dir() => {
                    let _ = watcher.unwatch(path);
                    crate::debug!("watch"; "removed: {}", path.display());
                    *state = pending(watcher, path);
                }
                RootState::Pending { ancestor } if path.is_dir() => {
                    if let Some(ancestor) = ancestor {
                        let _ = watcher.unwatch(&ancestor);
                    }
                    if watcher.watch(path, RecursiveMode::Recursive).is_ok() {
                        crate::debug!("watch"; "attached: {}", path.display());
                        *state = RootState::Attached;
                    }
                }
                _ => {}
            }
        }
    }

    #[cfg(test)]
    fn is_attached(&self, path: &Path) -> bool {
        self.roots.get(path) == Some(&RootState::Attached)
    }
}

/// Watch the closest existing ancestor of a missing root.
fn pending<W: Watcher>(watcher: &mut W, path: &Path) -> RootState {
    let ancestor = path
        .ancestors()
        .skip(1)
        .find(|p| p.is_dir())
        .filter(|p| watcher.watch(p, RecursiveMode::NonRecursive).is_ok())
        .map(Path::to_path_buf);
    RootState::Pending { ancestor }
}
