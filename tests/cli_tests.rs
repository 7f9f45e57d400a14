//! Integration tests for the Argus CLI
//!
//! These tests run the actual CLI binary and verify output.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CI_WORKFLOW: &str = r#"
name: CI Pipeline
jobs:
  build:
    runs-on: gpu
    steps:
      - uses: actions/checkout@v4
      - name: Compile
        run: cargo build
  test:
    needs: build
    if: github.ref == 'refs/heads/main'
    runs-on: ubuntu-latest
    steps:
      - run: cargo test
"#;

/// Get the binary to test, isolated from the user's config and environment
fn argus_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("argus").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("ARGUS_WORKERS")
        .env_remove("ARGUS_QUEUE_CAPACITY")
        .env_remove("ARGUS_NAMESPACE")
        .env_remove("ARGUS_STORE_DIR")
        .env_remove("ARGUS_DEFAULT_IMAGE")
        .env("RUST_LOG", "warn")
        .env("NO_COLOR", "1");
    cmd
}

fn write_workflow(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_string()
}

fn write_store_entry(store: &Path, label: &str, content: &str) {
    let ns = store.join("argo");
    fs::create_dir_all(&ns).unwrap();
    fs::write(ns.join(format!("{label}.yaml")), content).unwrap();
}

#[test]
fn test_help_flag() {
    let temp = TempDir::new().unwrap();
    argus_cmd(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("convert"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("batch"));
}

#[test]
fn test_convert_help_lists_formats() {
    let temp = TempDir::new().unwrap();
    argus_cmd(temp.path())
        .args(["convert", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--format"))
        .stdout(predicate::str::contains("--store-dir"));
}

// ============================================================================
// Convert
// ============================================================================

#[test]
fn test_convert_prints_workflow() {
    let temp = TempDir::new().unwrap();
    let file = write_workflow(temp.path(), "ci.yml", CI_WORKFLOW);

    argus_cmd(temp.path())
        .args(["convert", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("apiVersion: argoproj.io/v1alpha1"))
        .stdout(predicate::str::contains("generateName: ci-pipeline-"))
        .stdout(predicate::str::contains("entrypoint: main"))
        .stdout(predicate::str::contains("image: ubuntu:22.04"))
        .stdout(predicate::str::contains("refs/heads/main"));
}

#[test]
fn test_convert_warns_on_missing_label() {
    let temp = TempDir::new().unwrap();
    let file = write_workflow(temp.path(), "ci.yml", CI_WORKFLOW);

    argus_cmd(temp.path())
        .args(["convert", &file])
        .assert()
        .success()
        .stderr(predicate::str::contains("warning:"))
        .stderr(predicate::str::contains("gpu.yaml"));
}

#[test]
fn test_convert_uses_store_dir() {
    let temp = TempDir::new().unwrap();
    let store = temp.path().join("store");
    write_store_entry(
        &store,
        "gpu",
        "image: cuda:12\nresources:\n  limits:\n    nvidia.com/gpu: 1\n",
    );
    let file = write_workflow(temp.path(), "ci.yml", CI_WORKFLOW);

    argus_cmd(temp.path())
        .args(["convert", &file, "--store-dir", store.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("image: cuda:12"))
        .stdout(predicate::str::contains("nvidia.com/gpu"));
}

#[test]
fn test_convert_json_to_file() {
    let temp = TempDir::new().unwrap();
    let file = write_workflow(temp.path(), "ci.yml", CI_WORKFLOW);
    let out = temp.path().join("out.json");

    argus_cmd(temp.path())
        .args(["convert", &file, "--format", "json", "--output", out.to_str().unwrap()])
        .assert()
        .success();

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(value["kind"], "Workflow");
    assert_eq!(value["spec"]["templates"][0]["name"], "main");
    assert_eq!(
        value["spec"]["templates"][0]["dag"]["tasks"][1]["dependencies"][0],
        "build"
    );
}

#[test]
fn test_convert_default_image_from_env() {
    let temp = TempDir::new().unwrap();
    let file = write_workflow(temp.path(), "ci.yml", "jobs:\n  a:\n    steps:\n      - run: echo ok\n");

    argus_cmd(temp.path())
        .env("ARGUS_DEFAULT_IMAGE", "alpine:3.20")
        .args(["convert", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("image: alpine:3.20"));
}

#[test]
fn test_convert_cycle_fails_without_output() {
    let temp = TempDir::new().unwrap();
    let file = write_workflow(
        temp.path(),
        "cycle.yml",
        "jobs:\n  a: { needs: b }\n  b: { needs: a }\n",
    );

    argus_cmd(temp.path())
        .args(["convert", &file])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("ARGUS-012"))
        .stderr(predicate::str::contains("Fix:"));
}

#[test]
fn test_convert_missing_file() {
    let temp = TempDir::new().unwrap();
    argus_cmd(temp.path())
        .args(["convert", "does-not-exist.yml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn test_zero_workers_is_config_error() {
    let temp = TempDir::new().unwrap();
    let file = write_workflow(temp.path(), "ci.yml", CI_WORKFLOW);

    argus_cmd(temp.path())
        .args(["convert", &file, "--workers", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ARGUS-040"));
}

// ============================================================================
// Validate
// ============================================================================

#[test]
fn test_validate_valid_workflow() {
    let temp = TempDir::new().unwrap();
    let file = write_workflow(temp.path(), "ci.yml", CI_WORKFLOW);

    argus_cmd(temp.path())
        .args(["validate", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"))
        .stdout(predicate::str::contains("Jobs: 2"))
        .stdout(predicate::str::contains("← build"));
}

#[test]
fn test_validate_unknown_dependency() {
    let temp = TempDir::new().unwrap();
    let file = write_workflow(temp.path(), "bad.yml", "jobs:\n  deploy:\n    needs: ghost\n");

    argus_cmd(temp.path())
        .args(["validate", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ARGUS-011"))
        .stderr(predicate::str::contains("ghost"));
}

#[test]
fn test_validate_malformed_yaml() {
    let temp = TempDir::new().unwrap();
    let file = write_workflow(temp.path(), "bad.yml", "jobs: [unclosed");

    argus_cmd(temp.path())
        .args(["validate", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ARGUS-001"));
}

// ============================================================================
// Batch
// ============================================================================

#[test]
fn test_batch_converts_tree() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in");
    let out = temp.path().join("out");
    for i in 0..6 {
        write_workflow(
            &input,
            &format!("team{}/wf{i}.yml", i % 2),
            &format!("name: wf{i}\njobs:\n  a:\n    steps:\n      - run: echo {i}\n"),
        );
    }
    write_workflow(&input, "README.md", "not a workflow");

    // A tiny queue forces the caller-side wait-and-resubmit path
    argus_cmd(temp.path())
        .args([
            "batch",
            input.to_str().unwrap(),
            "--out-dir",
            out.to_str().unwrap(),
            "--workers",
            "1",
            "--queue-capacity",
            "1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("6 converted"));

    let converted = fs::read_to_string(out.join("team1/wf3.yaml")).unwrap();
    assert!(converted.contains("generateName: wf3-"));
    assert!(converted.contains("echo 3"));
    assert!(!out.join("README.yaml").exists());
}

#[test]
fn test_batch_reports_failures() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in");
    let out = temp.path().join("out");
    write_workflow(&input, "good.yml", "jobs:\n  a: {}\n");
    write_workflow(&input, "bad.yaml", "jobs:\n  a: { needs: a }\n");

    argus_cmd(temp.path())
        .args(["batch", input.to_str().unwrap(), "--out-dir", out.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("1 converted"))
        .stderr(predicate::str::contains("bad.yaml"));

    assert!(out.join("good.yaml").exists());
    assert!(!out.join("bad.yaml").exists());
}
