//! End-to-end CLI integration tests: execute the actual `easeml` binary via
//! `std::process::Command` to validate the full command-line workflow.

use std::fs;
use std::process::Command;

fn easeml() -> Command {
    Command::new(env!("CARGO_BIN_EXE_easeml"))
}

const SCHEMA: &str = r#"{
  "nodes": {
    "item": {
      "singleton": true,
      "type": "tensor",
      "dim": [3]
    }
  }
}"#;

#[test]
fn schema_validate_accepts_a_well_formed_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.json");
    fs::write(&path, SCHEMA).unwrap();

    let output = easeml().args(["schema", "validate"]).arg(&path).output().expect("runs easeml");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn schema_validate_rejects_a_malformed_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.json");
    fs::write(&path, r#"{"nodes": {}}"#).unwrap();

    let output = easeml().args(["schema", "validate"]).arg(&path).output().expect("runs easeml");
    assert!(!output.status.success());
}

#[test]
fn dataset_generate_then_validate_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let schema_path = dir.path().join("schema.json");
    fs::write(&schema_path, SCHEMA).unwrap();
    let dataset_root = dir.path().join("data");

    let generate = easeml()
        .args(["dataset", "generate"])
        .arg(&dataset_root)
        .arg(&schema_path)
        .args(["--samples", "2", "--seed", "1"])
        .output()
        .expect("runs easeml");
    assert!(generate.status.success(), "stderr: {}", String::from_utf8_lossy(&generate.stderr));

    let validate = easeml().args(["dataset", "validate"]).arg(&dataset_root).output().expect("runs easeml");
    assert!(validate.status.success(), "stderr: {}", String::from_utf8_lossy(&validate.stderr));
    assert!(String::from_utf8_lossy(&validate.stdout).contains("\"item\""));
}
