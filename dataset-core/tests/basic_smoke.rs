//! End-to-end smoke test against a real temporary directory: writes a tiny
//! dataset by hand through `LocalOpener`, then loads and infers its schema.

use easeml_dataset_core::{Dataset, LocalOpener};
use std::fs;

#[test]
fn infers_schema_from_a_real_directory_tree() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sample = dir.path().join("sample0");
    fs::create_dir(&sample).unwrap();

    let mut npy_bytes = Vec::new();
    easeml_dataset_core::npy::write_array(&mut npy_bytes, &[2, 2], &[1.0, 2.0, 3.0, 4.0]).unwrap();
    fs::write(sample.join("image.ten.npy"), &npy_bytes).unwrap();
    fs::write(sample.join("label.cat.txt"), "cat\n").unwrap();
    fs::write(dir.path().join("label.class.txt"), "cat\ndog\n").unwrap();

    let opener = LocalOpener::new(dir.path());
    let dataset = Dataset::load(&opener, true).expect("dataset loads");
    let schema = dataset.infer_schema().expect("schema infers");

    assert!(schema.nodes["image"].is_singleton);
    assert!(schema.nodes["label"].is_singleton);
    assert_eq!(schema.category_classes.len(), 1);
}

#[test]
fn rejects_unrecognized_file_at_dataset_root() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("stray.txt"), "oops").unwrap();

    let opener = LocalOpener::new(dir.path());
    let dataset = Dataset::load(&opener, true).expect("loader does not reject plain files");
    let err = dataset.infer_schema().unwrap_err();
    assert!(err.path.contains("stray.txt"));
}
