use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use tokio::sync::mpsc;

use super::debouncer::{DEBOUNCE_MS, Debouncer};
use super::router::route;
use super::types::ChangeKind;
use super::{RebuildRoutes, dispatch};
use crate::actor::messages::RebuildMsg;
use crate::config::ProjectConfig;
use crate::core::AssetCategory;

fn config() -> ProjectConfig {
    crate::config::test_config_at(Path::new("/p"), "")
}

fn make_event(paths: Vec<&str>, kind: notify::EventKind) -> notify::Event {
    notify::Event {
        kind,
        paths: paths.into_iter().map(PathBuf::from).collect(),
        attrs: Default::default(),
    }
}

fn modify_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Data(
        notify::event::DataChange::Any,
    ))
}

fn create_kind() -> notify::EventKind {
    notify::EventKind::Create(notify::event::CreateKind::File)
}

fn remove_kind() -> notify::EventKind {
    notify::EventKind::Remove(notify::event::RemoveKind::File)
}

fn changes(paths: &[&str]) -> FxHashMap<PathBuf, ChangeKind> {
    paths
        .iter()
        .map(|p| (PathBuf::from(p), ChangeKind::Modified))
        .collect()
}

/// Pretend the debounce window has already elapsed.
fn expire(debouncer: &mut Debouncer) {
    debouncer.last_event = Instant::now().checked_sub(Duration::from_millis(DEBOUNCE_MS + 50));
}

#[test]
fn test_debouncer_empty() {
    let debouncer = Debouncer::new();
    assert!(!debouncer.is_ready());
    assert!(debouncer.sleep_duration() > Duration::from_secs(60));
}

#[test]
fn test_debouncer_waits_for_quiet_period() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/p/src/scss/a.scss"], modify_kind()));

    assert!(!debouncer.is_ready());
    assert!(debouncer.sleep_duration() <= Duration::from_millis(DEBOUNCE_MS));

    expire(&mut debouncer);
    let batch = debouncer.take_if_ready().unwrap();
    assert_eq!(batch.len(), 1);
    assert!(debouncer.take_if_ready().is_none());
}

#[test]
fn test_repeated_saves_dedup() {
    let mut debouncer = Debouncer::new();
    for _ in 0..5 {
        debouncer.add_event(&make_event(vec!["/p/src/js/app.js"], modify_kind()));
    }
    assert_eq!(debouncer.changes.len(), 1);
}

#[test]
fn test_state_transitions() {
    let mut debouncer = Debouncer::new();

    debouncer.add_event(&make_event(vec!["/p/a.js"], create_kind()));
    debouncer.add_event(&make_event(vec!["/p/a.js"], remove_kind()));
    assert!(!debouncer.changes.contains_key(Path::new("/p/a.js")));

    debouncer.add_event(&make_event(vec!["/p/b.js"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/p/b.js"], remove_kind()));
    assert_eq!(debouncer.changes[Path::new("/p/b.js")], ChangeKind::Removed);

    debouncer.add_event(&make_event(vec!["/p/b.js"], create_kind()));
    assert_eq!(debouncer.changes[Path::new("/p/b.js")], ChangeKind::Created);
}

#[test]
fn test_metadata_and_temp_files_ignored() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(
        vec!["/p/src/js/app.js"],
        notify::EventKind::Modify(notify::event::ModifyKind::Metadata(
            notify::event::MetadataKind::WriteTime,
        )),
    ));
    debouncer.add_event(&make_event(
        vec!["/p/src/js/app.js.swp", "/p/src/js/app.js~", "/p/src/js/.#app.js"],
        modify_kind(),
    ));
    assert!(debouncer.changes.is_empty());
}

#[test]
fn test_route_by_watch_pattern() {
    let batches = route(
        &changes(&[
            "/p/src/scss/base/_vars.scss",
            "/p/src/js/lib/util.js",
            "/p/src/js/app.js",
            "/p/README.md",
        ]),
        &config(),
    );

    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].category, AssetCategory::Styles);
    assert_eq!(
        batches[0].paths,
        vec![PathBuf::from("/p/src/scss/base/_vars.scss")]
    );
    assert_eq!(batches[1].category, AssetCategory::Scripts);
    assert_eq!(
        batches[1].paths,
        vec![
            PathBuf::from("/p/src/js/app.js"),
            PathBuf::from("/p/src/js/lib/util.js"),
        ]
    );
}

#[test]
fn test_route_ignores_unwatched_paths() {
    let batches = route(&changes(&["/p/build/css/app.min.css"]), &config());
    assert!(batches.is_empty());
}

#[tokio::test]
async fn test_dispatch_sends_only_to_matching_category() {
    let mut routes = RebuildRoutes::default();
    let mut inboxes = Vec::new();
    for category in AssetCategory::ALL {
        let (tx, rx) = mpsc::channel(8);
        routes.insert(category, tx);
        inboxes.push((category, rx));
    }

    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/p/src/scss/app.scss"], modify_kind()));
    expire(&mut debouncer);

    dispatch(&mut debouncer, &routes, &config()).await.unwrap();

    for (category, rx) in &mut inboxes {
        match rx.try_recv() {
            Ok(RebuildMsg::Changed(paths)) => {
                assert_eq!(*category, AssetCategory::Styles);
                assert_eq!(paths, vec![PathBuf::from("/p/src/scss/app.scss")]);
            }
            Ok(other) => panic!("unexpected message: {other:?}"),
            Err(_) => assert_ne!(*category, AssetCategory::Styles),
        }
    }
}

#[tokio::test]
async fn test_dispatch_fails_when_rebuild_actor_is_gone() {
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let mut routes = RebuildRoutes::default();
    routes.insert(AssetCategory::Scripts, tx);

    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/p/src/js/app.js"], modify_kind()));
    expire(&mut debouncer);

    assert!(dispatch(&mut debouncer, &routes, &config()).await.is_err());
}
