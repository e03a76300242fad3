// Integration tests for the indexer: startup, background scans and reconfiguration
mod common;

use common::{ChannelEmitter, collect_events, key, library_dir, wait_until, write_fake_audio};
use penguin_core::UNKNOWN_ALBUM;
use penguin_index::settings::{IndexSettings, LibrarySettings};
use penguin_index::{IndexError, Indexer, Settings, TrackStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

fn settings(index_dir: &Path, roots: Vec<PathBuf>) -> Settings {
    Settings {
        index: IndexSettings {
            dir: index_dir.to_path_buf(),
            debounce_ms: 200,
            scan_concurrency: 2,
            queue_capacity: 8,
        },
        library: LibrarySettings { source_dirs: roots },
    }
}

#[test]
fn test_scan_scenario_song_and_subdirectory() {
    let dir = tempfile::tempdir().unwrap();
    let library = library_dir(dir.path());
    write_fake_audio(&library.join("song1.mp3"));
    write_fake_audio(&library.join("sub").join("song2.flac"));
    std::fs::write(library.join("readme.txt"), b"not audio").unwrap();

    let (emitter, events) = ChannelEmitter::new();
    let indexer = Indexer::open(
        &settings(&dir.path().join("index"), vec![library.clone()]),
        Arc::new(emitter),
    )
    .unwrap();
    indexer.start().unwrap();
    indexer.wait_for_scan();

    let received = collect_events(&events, Duration::from_millis(100));
    let reasons: Vec<_> = received
        .iter()
        .map(|(_, payload)| payload.as_ref().unwrap()["reason"].clone())
        .collect();
    assert_eq!(reasons, vec!["startup", "scan"]);

    let tracks = indexer.tracks();
    assert_eq!(tracks.len(), 2);
    let song1 = indexer.store().get(&key(&library.join("song1.mp3"))).unwrap();
    assert_eq!(song1.title, "song1.mp3");
    assert_eq!(song1.album, UNKNOWN_ALBUM);

    // The snapshot on disk matches memory
    let reloaded = TrackStore::new();
    reloaded.load(&indexer.paths().snapshot).unwrap();
    assert_eq!(reloaded.snapshot(), indexer.store().snapshot());

    indexer.shutdown().unwrap();
}

#[test]
fn test_reopen_loads_previous_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let library = library_dir(dir.path());
    write_fake_audio(&library.join("a.wav"));
    let config = settings(&dir.path().join("index"), vec![library.clone()]);

    {
        let (emitter, _events) = ChannelEmitter::new();
        let indexer = Indexer::open(&config, Arc::new(emitter)).unwrap();
        indexer.rescan().unwrap();
        indexer.wait_for_scan();
        indexer.shutdown().unwrap();
    }

    let (emitter, _events) = ChannelEmitter::new();
    let indexer = Indexer::open(&config, Arc::new(emitter)).unwrap();
    assert_eq!(indexer.tracks().len(), 1);
    assert!(indexer.store().contains(&key(&library.join("a.wav"))));
}

#[test]
fn test_malformed_snapshot_is_init_error() {
    let dir = tempfile::tempdir().unwrap();
    let index_dir = dir.path().join("index");
    std::fs::create_dir_all(&index_dir).unwrap();
    std::fs::write(index_dir.join("index.json"), b"{{{").unwrap();

    let (emitter, _events) = ChannelEmitter::new();
    let result = Indexer::open(&settings(&index_dir, vec![]), Arc::new(emitter));
    assert!(matches!(result, Err(IndexError::Store(_))));
}

#[test]
fn test_invalid_settings_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = settings(&dir.path().join("index"), vec![]);
    config.index.debounce_ms = 0;

    let (emitter, _events) = ChannelEmitter::new();
    let result = Indexer::open(&config, Arc::new(emitter));
    assert!(matches!(result, Err(IndexError::InvalidSettings(_))));
}

#[test]
fn test_identical_rescan_requests_are_deduplicated() {
    let dir = tempfile::tempdir().unwrap();
    let library = library_dir(dir.path());
    for i in 0..200 {
        write_fake_audio(&library.join(format!("{i}.mp3")));
    }

    let (emitter, events) = ChannelEmitter::new();
    let indexer = Indexer::open(
        &settings(&dir.path().join("index"), vec![library]),
        Arc::new(emitter),
    )
    .unwrap();

    let first = indexer.rescan().unwrap();
    let mut started = 1;
    while indexer.is_scanning() {
        if indexer.rescan().unwrap() {
            started += 1;
        }
    }
    indexer.wait_for_scan();

    assert!(first);
    let scans = collect_events(&events, Duration::from_millis(100)).len();
    assert_eq!(scans, started);
    assert_eq!(indexer.tracks().len(), 200);
}

#[test]
fn test_set_source_dirs_rescans_and_rewatches() {
    let dir = tempfile::tempdir().unwrap();
    let old_library = library_dir(dir.path());
    write_fake_audio(&old_library.join("old.mp3"));
    std::fs::create_dir_all(dir.path().join("other")).unwrap();
    let new_library = dir.path().join("other").canonicalize().unwrap();
    write_fake_audio(&new_library.join("new.mp3"));

    let (emitter, _events) = ChannelEmitter::new();
    let indexer = Indexer::open(
        &settings(&dir.path().join("index"), vec![old_library.clone()]),
        Arc::new(emitter),
    )
    .unwrap();
    indexer.start().unwrap();
    indexer.wait_for_scan();
    assert_eq!(indexer.tracks().len(), 1);

    indexer
        .set_source_dirs(vec![old_library.clone(), new_library.clone()])
        .unwrap();
    indexer.wait_for_scan();
    assert_eq!(indexer.tracks().len(), 2);
    assert_eq!(indexer.source_dirs().len(), 2);

    // The new root is watched
    let live = new_library.join("live.ogg");
    write_fake_audio(&live);
    assert!(wait_until(Duration::from_secs(2), || {
        indexer.store().contains(&key(&live))
    }));

    indexer.shutdown().unwrap();
}

#[test]
fn test_add_and_remove_source_dir() {
    let dir = tempfile::tempdir().unwrap();
    let library = library_dir(dir.path());
    write_fake_audio(&library.join("kept.mp3"));
    std::fs::create_dir_all(dir.path().join("extra")).unwrap();
    let extra = dir.path().join("extra").canonicalize().unwrap();
    write_fake_audio(&extra.join("one.flac"));
    write_fake_audio(&extra.join("disc2").join("two.ogg"));

    let (emitter, _events) = ChannelEmitter::new();
    let indexer = Indexer::open(
        &settings(&dir.path().join("index"), vec![library.clone()]),
        Arc::new(emitter),
    )
    .unwrap();
    indexer.start().unwrap();
    indexer.wait_for_scan();
    assert_eq!(indexer.tracks().len(), 1);

    indexer.add_source_dir(extra.clone()).unwrap();
    indexer.add_source_dir(extra.clone()).unwrap();
    indexer.wait_for_scan();
    assert_eq!(indexer.source_dirs(), vec![library.clone(), extra.clone()]);
    assert_eq!(indexer.tracks().len(), 3);

    // The added root is watched
    let live = extra.join("live.wav");
    write_fake_audio(&live);
    assert!(wait_until(Duration::from_secs(2), || {
        indexer.store().contains(&key(&live))
    }));

    indexer.remove_source_dir(&extra).unwrap();
    indexer.wait_for_scan();
    assert_eq!(indexer.source_dirs(), vec![library.clone()]);
    let paths: Vec<String> = indexer.tracks().into_iter().map(|t| t.path).collect();
    assert_eq!(paths, vec![key(&library.join("kept.mp3"))]);

    // Removing an unknown root changes nothing
    indexer.remove_source_dir(&extra).unwrap();
    assert_eq!(indexer.source_dirs(), vec![library]);

    indexer.shutdown().unwrap();
}

#[test]
fn test_removed_root_tracks_leave_store_and_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let library = library_dir(dir.path());
    write_fake_audio(&library.join("stay.mp3"));
    std::fs::create_dir_all(dir.path().join("podcasts")).unwrap();
    let podcasts = dir.path().join("podcasts").canonicalize().unwrap();
    write_fake_audio(&podcasts.join("episode1.mp3"));
    write_fake_audio(&podcasts.join("episode2.mp3"));

    let (emitter, _events) = ChannelEmitter::new();
    let indexer = Indexer::open(
        &settings(
            &dir.path().join("index"),
            vec![library.clone(), podcasts.clone()],
        ),
        Arc::new(emitter),
    )
    .unwrap();
    indexer.rescan().unwrap();
    indexer.wait_for_scan();
    assert_eq!(indexer.tracks().len(), 3);

    indexer.set_source_dirs(vec![library.clone()]).unwrap();
    indexer.wait_for_scan();

    assert!(!indexer.store().contains(&key(&podcasts.join("episode1.mp3"))));
    assert!(!indexer.store().contains(&key(&podcasts.join("episode2.mp3"))));
    assert!(indexer.store().contains(&key(&library.join("stay.mp3"))));

    let on_disk = TrackStore::new();
    on_disk.load(&indexer.paths().snapshot).unwrap();
    assert_eq!(on_disk.snapshot(), indexer.store().snapshot());
    assert_eq!(on_disk.len(), 1);

    // Clearing every root empties the index
    indexer.set_source_dirs(vec![]).unwrap();
    indexer.wait_for_scan();
    assert!(indexer.tracks().is_empty());
    on_disk.load(&indexer.paths().snapshot).unwrap();
    assert!(on_disk.is_empty());
}

#[test]
fn test_shutdown_is_idempotent_and_final() {
    let dir = tempfile::tempdir().unwrap();
    let library = library_dir(dir.path());

    let (emitter, _events) = ChannelEmitter::new();
    let indexer = Indexer::open(
        &settings(&dir.path().join("index"), vec![library]),
        Arc::new(emitter),
    )
    .unwrap();
    indexer.start().unwrap();

    indexer.shutdown().unwrap();
    indexer.shutdown().unwrap();
    assert!(indexer.paths().snapshot.exists());
    assert!(indexer.rescan().is_err());
}
