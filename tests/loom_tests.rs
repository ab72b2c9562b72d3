//! Loom-based concurrency tests
//!
//! These tests use the `loom` library to exhaustively check the thread
//! interleavings of a pinning reader against a committing, collecting writer.
//!
//! Run with: `cargo test --features loom --test loom_tests --release`

#![cfg(feature = "loom")]

use gidmap::{DocumentMetaStore, GlobalId, NO_LID};
use loom::thread;

fn gid(n: u8) -> GlobalId {
    GlobalId::new([n; GlobalId::LENGTH])
}

/// Test: A reader sees either none or all of one commit
#[test]
fn loom_commit_is_atomic_for_readers() {
    loom::model(|| {
        let (mut writer, store) = DocumentMetaStore::new();

        let reader_store = store.clone();
        let reader = thread::spawn(move || {
            let reader = reader_store.register_reader();
            let mapper = reader.gid_to_lid_mapper();
            let a = mapper.map_gid_to_lid(&gid(1));
            let b = mapper.map_gid_to_lid(&gid(2));
            match mapper.generation() {
                0 => assert_eq!((a, b), (NO_LID, NO_LID)),
                _ => assert_eq!((a, b), (1, 2)),
            }
        });

        writer.put(gid(1), 1).unwrap();
        writer.put(gid(2), 2).unwrap();
        writer.commit();

        reader.join().unwrap();
    });
}

/// Test: Collection never frees the snapshot a reader is using
#[test]
fn loom_collect_respects_pinned_snapshot() {
    loom::model(|| {
        let (mut writer, store) = DocumentMetaStore::builder()
            .auto_reclaim_threshold(None)
            .build();
        writer.put(gid(1), 1).unwrap();
        writer.commit();

        let reader_store = store.clone();
        let reader = thread::spawn(move || {
            let reader = reader_store.register_reader();
            let mapper = reader.gid_to_lid_mapper();
            let first = mapper.map_gid_to_lid(&gid(1));

            thread::yield_now();

            // Same snapshot, whatever the writer did meanwhile.
            assert_eq!(mapper.map_gid_to_lid(&gid(1)), first);
            let pairs: Vec<_> = mapper.iter().collect();
            if first == NO_LID {
                assert!(pairs.is_empty());
            } else {
                assert_eq!(pairs, vec![(gid(1), first)]);
            }
        });

        writer.remove(&gid(1));
        writer.commit();
        writer.collect();

        reader.join().unwrap();
    });
}

/// Test: A LID reused by the writer is never seen with the wrong GID
#[test]
fn loom_reused_lid_is_consistent_within_snapshot() {
    loom::model(|| {
        let (mut writer, store) = DocumentMetaStore::new();
        writer.put(gid(1), 1).unwrap();
        writer.commit();

        let reader_store = store.clone();
        let reader = thread::spawn(move || {
            let reader = reader_store.register_reader();
            let guard = reader.acquire_guard();
            if let Some(meta) = guard.raw_meta_data(1) {
                assert_eq!(guard.lookup(meta.gid()), Some(1));
            }
        });

        writer.remove(&gid(1));
        writer.put(gid(2), 1).unwrap();
        writer.commit();
        writer.collect();

        reader.join().unwrap();
    });
}

/// Test: Reentrant guards on one reader
#[test]
fn loom_nested_guards() {
    loom::model(|| {
        let (mut writer, store) = DocumentMetaStore::new();

        let reader_store = store.clone();
        let reader = thread::spawn(move || {
            let reader = reader_store.register_reader();
            let outer = reader.acquire_guard();
            let inner = reader.acquire_guard();
            assert!(inner.generation() >= outer.generation());

            drop(outer);
            assert!(reader.is_pinned());
            let _ = inner.lookup(&gid(1));
            drop(inner);
            assert!(!reader.is_pinned());
        });

        writer.put(gid(1), 1).unwrap();
        writer.commit();
        writer.collect();

        reader.join().unwrap();
    });
}

/// Test: Successive mappers on one reader never go back in time
#[test]
fn loom_reader_monotonic_observation() {
    loom::model(|| {
        let (mut writer, store) = DocumentMetaStore::new();

        let reader_store = store.clone();
        let reader = thread::spawn(move || {
            let reader = reader_store.register_reader();
            let first = reader.gid_to_lid_mapper().generation();
            let second = reader.gid_to_lid_mapper().generation();
            assert!(second >= first);
        });

        writer.commit();
        writer.commit();

        reader.join().unwrap();
    });
}

/// Test: Dropping the writer while a reader is pinned
#[test]
fn loom_writer_dropped_while_pinned() {
    loom::model(|| {
        let (mut writer, store) = DocumentMetaStore::new();
        writer.put(gid(1), 1).unwrap();
        writer.commit();

        let reader_store = store.clone();
        let reader = thread::spawn(move || {
            let reader = reader_store.register_reader();
            let mapper = reader.gid_to_lid_mapper();
            thread::yield_now();
            assert_eq!(mapper.iter().count(), mapper.len());
        });

        writer.remove(&gid(1));
        writer.commit();
        writer.collect();
        drop(writer);
        drop(store);

        reader.join().unwrap();
    });
}

/// Test: Collection with no registered readers releases everything
#[test]
fn loom_collect_without_readers() {
    loom::model(|| {
        let (mut writer, _store) = DocumentMetaStore::builder()
            .auto_reclaim_threshold(None)
            .build();
        writer.insert(gid(1)).unwrap();
        writer.commit();
        writer.remove(&gid(1));
        writer.commit();
        writer.collect();

        assert_eq!(writer.retired_count(), 0);
        assert_eq!(writer.held_lid_count(), 0);
        assert_eq!(writer.insert(gid(2)).unwrap(), 1);
    });
}

/// Test: Slots of dropped readers are cleaned up
#[test]
fn loom_reader_drop_cleanup() {
    loom::model(|| {
        let (mut writer, store) = DocumentMetaStore::builder()
            .cleanup_interval(1)
            .build();

        let reader_store = store.clone();
        let reader = thread::spawn(move || {
            let reader = reader_store.register_reader();
            let _mapper = reader.gid_to_lid_mapper();
        });

        writer.commit();
        writer.collect();
        reader.join().unwrap();

        writer.collect();
        assert_eq!(writer.retired_count(), 0);
    });
}
