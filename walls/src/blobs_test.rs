use super::*;

#[test]
fn data_uri_is_base64_encoded() {
    assert_eq!(encode_data_uri(b"hi", "image/png"), "data:image/png;base64,aGk=");
}

#[test]
fn guess_mime_maps_common_extensions() {
    assert_eq!(guess_mime(Path::new("a.PNG")), "image/png");
    assert_eq!(guess_mime(Path::new("dir/b.jpeg")), "image/jpeg");
    assert_eq!(guess_mime(Path::new("c.webp")), "image/webp");
    assert_eq!(guess_mime(Path::new("noext")), "application/octet-stream");
}

#[test]
fn allocate_writes_file_and_tracks_handle() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = BlobRegistry::new(dir.path());

    let handle = registry.allocate(b"pixels").unwrap();
    assert!(is_blob_ref(&handle));
    assert!(registry.is_live(&handle));

    let path = registry.resolve(&handle).unwrap();
    assert_eq!(std::fs::read(path).unwrap(), b"pixels");
}

#[test]
fn release_removes_file_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = BlobRegistry::new(dir.path());
    let handle = registry.allocate(b"x").unwrap();
    let path = registry.resolve(&handle).unwrap();

    assert!(registry.release(&handle));
    assert!(!path.exists());
    assert!(!registry.release(&handle));
    assert_eq!(registry.live_count(), 0);
}

#[test]
fn track_ignores_non_blob_references() {
    let mut registry = BlobRegistry::new("/nonexistent");
    registry.track("data:image/png;base64,AA");
    registry.track("https://cdn.example/a.png");
    assert_eq!(registry.live_count(), 0);
    registry.track("blob:abc");
    assert_eq!(registry.live_count(), 1);
}

#[test]
fn release_of_untracked_reference_is_noop() {
    let mut registry = BlobRegistry::new("/nonexistent");
    assert!(!registry.release("blob:unknown"));
}

#[test]
fn drop_releases_remaining_handles() {
    let dir = tempfile::tempdir().unwrap();
    let paths = {
        let mut registry = BlobRegistry::new(dir.path());
        let a = registry.allocate(b"a").unwrap();
        let b = registry.allocate(b"b").unwrap();
        vec![registry.resolve(&a).unwrap(), registry.resolve(&b).unwrap()]
    };
    assert!(paths.iter().all(|p| !p.exists()));
}

#[test]
fn release_never_escapes_registry_dir() {
    let dir = tempfile::tempdir().unwrap();
    let outside = dir.path().join("keep.txt");
    std::fs::write(&outside, "keep").unwrap();

    let mut registry = BlobRegistry::new(dir.path().join("blobs"));
    registry.track("blob:../keep.txt");
    assert!(registry.release("blob:../keep.txt"));
    assert!(outside.exists());
}
