//! Concurrent flush tests for the file-backed manifest store

use fs2::FileExt;
use std::fs::OpenOptions;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use strictcsp_manifest::*;

fn worker_flush(root: std::path::PathBuf, route: &str, hashes: Vec<String>, barrier: Arc<Barrier>) {
    // Each worker opens its own store, as a separate process would.
    let store = FileManifestStore::new(root).unwrap();
    let mut collector = HashCollector::new(route);
    for hash in &hashes {
        collector.collect(CollectKind::Script, hash).unwrap();
    }
    barrier.wait();
    collector.flush(&store, DEFAULT_LOCK_TIMEOUT).unwrap();
}

#[test]
fn test_concurrent_flushes_union_disjoint_hashes() {
    let dir = tempfile::tempdir().unwrap();
    let workers = 8;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let root = dir.path().to_path_buf();
            let barrier = Arc::clone(&barrier);
            let hashes = (0..5)
                .map(|i| format!("sha256-worker{}hash{}", worker, i))
                .collect();
            thread::spawn(move || worker_flush(root, "/shared", hashes, barrier))
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let store = FileManifestStore::new(dir.path()).unwrap();
    let manifest = store.read("/shared").unwrap().unwrap();
    assert_eq!(manifest.scripts.len(), workers * 5);
    for worker in 0..workers {
        for i in 0..5 {
            let hash = format!("sha256-worker{}hash{}", worker, i);
            assert!(manifest.script_hashes().contains(&hash), "missing {}", hash);
        }
    }
}

#[test]
fn test_two_workers_with_overlapping_hashes() {
    let dir = tempfile::tempdir().unwrap();
    let barrier = Arc::new(Barrier::new(2));

    let a = {
        let root = dir.path().to_path_buf();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            worker_flush(
                root,
                "/",
                vec!["sha256-common".into(), "sha256-a".into()],
                barrier,
            )
        })
    };
    let b = {
        let root = dir.path().to_path_buf();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            worker_flush(
                root,
                "/",
                vec!["sha256-common".into(), "sha256-b".into()],
                barrier,
            )
        })
    };
    a.join().unwrap();
    b.join().unwrap();

    let store = FileManifestStore::new(dir.path()).unwrap();
    let mut hashes = store.read("/").unwrap().unwrap().script_hashes();
    hashes.sort();
    assert_eq!(hashes, vec!["sha256-a", "sha256-b", "sha256-common"]);
}

#[test]
fn test_flush_times_out_when_lock_is_held() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileManifestStore::new(dir.path())
        .unwrap()
        .with_poll_interval(Duration::from_millis(5));

    let holder = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(store.lock_path("/blocked"))
        .unwrap();
    FileExt::lock_exclusive(&holder).unwrap();

    let mut collector = HashCollector::new("/blocked");
    collector.collect(CollectKind::Script, "sha256-a").unwrap();

    let started = Instant::now();
    let err = collector
        .flush(&store, Duration::from_millis(100))
        .unwrap_err();
    assert!(err.is_lock_timeout());
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(collector.state(), CollectorState::Collecting);
    assert!(store.read("/blocked").unwrap().is_none());

    // Once released, the retried flush succeeds.
    FileExt::unlock(&holder).unwrap();
    collector.flush(&store, Duration::from_secs(1)).unwrap();
    assert_eq!(collector.state(), CollectorState::Flushed);
    assert_eq!(
        store.read("/blocked").unwrap().unwrap().script_hashes(),
        vec!["sha256-a"]
    );
}

#[test]
fn test_lock_is_released_after_each_flush() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileManifestStore::new(dir.path()).unwrap();

    for i in 0..3 {
        let mut collector = HashCollector::new("/again");
        collector
            .collect(CollectKind::StyleElem, &format!("sha256-{}", i))
            .unwrap();
        collector.flush(&store, Duration::from_millis(200)).unwrap();
    }

    let manifest = store.read("/again").unwrap().unwrap();
    assert_eq!(manifest.styles.elem, vec!["sha256-0", "sha256-1", "sha256-2"]);
}

#[test]
fn test_failed_flush_releases_lock() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileManifestStore::new(dir.path()).unwrap();
    std::fs::write(store.manifest_path("/broken"), "{not json").unwrap();

    let mut collector = HashCollector::new("/broken");
    collector.collect(CollectKind::Script, "sha256-a").unwrap();

    let err = collector
        .flush(&store, Duration::from_millis(200))
        .unwrap_err();
    assert!(matches!(err, ManifestError::Serialization(_)));
    assert_eq!(collector.state(), CollectorState::Collecting);

    let lock = OpenOptions::new()
        .read(true)
        .write(true)
        .open(store.lock_path("/broken"))
        .unwrap();
    assert!(FileExt::try_lock_exclusive(&lock).is_ok());
    FileExt::unlock(&lock).unwrap();
}

#[test]
fn test_rebuild_invalidates_cache() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn ManifestStore> = Arc::new(FileManifestStore::new(dir.path()).unwrap());
    let cache = ManifestCache::new(Arc::clone(&store));

    let mut first = HashCollector::new("/page");
    first.collect(CollectKind::Script, "sha256-old").unwrap();
    first.flush(store.as_ref(), DEFAULT_LOCK_TIMEOUT).unwrap();
    assert_eq!(cache.get("/page").unwrap().unwrap().script_hashes(), vec!["sha256-old"]);

    let mut second = HashCollector::new("/page");
    second.collect(CollectKind::Script, "sha256-new").unwrap();
    second.flush(store.as_ref(), DEFAULT_LOCK_TIMEOUT).unwrap();

    cache.invalidate("/page");
    assert_eq!(
        cache.get("/page").unwrap().unwrap().script_hashes(),
        vec!["sha256-old", "sha256-new"]
    );
}
