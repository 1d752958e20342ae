use super::*;

fn scratch(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "framecraft_cache_{tag}_{}_{nanos}",
        std::process::id()
    ))
}

#[test]
fn paths_are_keyed_by_fingerprint() {
    let m = CacheManager::new("/c", "/o/out.mp4");
    let fp = Fingerprint { hi: 1, lo: 2 };
    assert_eq!(
        m.artifact_path(fp),
        PathBuf::from("/c/00000000000000010000000000000002.mp4")
    );
    assert_eq!(
        m.partial_path(fp),
        PathBuf::from("/c/00000000000000010000000000000002.partial")
    );
    let staging = m.staging_path();
    assert_eq!(staging.parent(), Some(Path::new("/o")));
    assert!(staging.to_string_lossy().ends_with(".partial"));
}

#[test]
fn cleanup_removes_only_recorded_files() {
    let root = scratch("cleanup");
    let m = CacheManager::new(root.join("cache"), root.join("out/final.mp4"));
    m.prepare().unwrap();

    let ours = m.artifact_path(Fingerprint { hi: 0, lo: 1 });
    let foreign = m.artifact_path(Fingerprint { hi: 0, lo: 2 });
    std::fs::write(&ours, b"a").unwrap();
    std::fs::write(&foreign, b"b").unwrap();
    m.record(&ours);

    m.cleanup();
    assert!(!ours.exists());
    assert!(foreign.exists());
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn publish_moves_staged_file_into_place() {
    let root = scratch("publish");
    let m = CacheManager::new(root.join("cache"), root.join("out/final.mp4"));
    m.prepare().unwrap();
    let staged = m.staging_path();
    std::fs::write(&staged, b"video").unwrap();

    let out = m.publish(&staged).unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), b"video");
    assert!(!staged.exists());
    assert!(m.publish(&staged).is_err());
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn temp_guard_removes_unless_disarmed() {
    let root = scratch("guard");
    std::fs::create_dir_all(&root).unwrap();
    let a = root.join("a");
    let b = root.join("b");
    std::fs::write(&a, b"x").unwrap();
    std::fs::write(&b, b"x").unwrap();
    drop(TempFileGuard(Some(a.clone())));
    let mut keep = TempFileGuard(Some(b.clone()));
    keep.disarm();
    drop(keep);
    assert!(!a.exists());
    assert!(b.exists());
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn shared_artifact_is_deleted_by_its_last_holder() {
    let root = scratch("lease");
    let writer = CacheManager::new(root.join("cache"), root.join("out/a.mp4"));
    let reader = CacheManager::new(root.join("cache"), root.join("out/b.mp4"));
    writer.prepare().unwrap();

    let shared = writer.artifact_path(Fingerprint { hi: 0, lo: 3 });
    std::fs::write(&shared, b"a").unwrap();
    writer.record(&shared);
    reader.hold(&reader.artifact_path(Fingerprint { hi: 0, lo: 3 }));

    writer.cleanup();
    assert!(shared.exists());
    reader.cleanup();
    assert!(!shared.exists());
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn held_artifacts_from_elsewhere_survive_release() {
    let root = scratch("foreign_lease");
    let m = CacheManager::new(root.join("cache"), root.join("out/final.mp4"));
    m.prepare().unwrap();
    let earlier = m.artifact_path(Fingerprint { hi: 0, lo: 4 });
    std::fs::write(&earlier, b"b").unwrap();
    m.hold(&earlier);
    assert_eq!(m.held(), vec![earlier.clone()]);
    m.cleanup();
    assert!(earlier.exists());
    assert!(m.held().is_empty());
    let _ = std::fs::remove_dir_all(root);
}
