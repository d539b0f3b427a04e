//! Tests for the command-line binary: exit codes and output.

use std::path::PathBuf;
use std::process::Command;

use tempfile::TempDir;

fn sdk_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata/flutter")
}

fn widget_catalog() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_widget-catalog"));
    cmd.env_remove("FLUTTER_ROOT").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_generate_writes_catalog_and_exits_zero() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("out/widgets.json");

    let status = widget_catalog()
        .current_dir(temp.path())
        .arg("generate")
        .arg("--flutter-root")
        .arg(sdk_root())
        .arg("--output")
        .arg(&output)
        .arg("--framework-version")
        .arg("3.24.0")
        .arg("--channel")
        .arg("beta")
        .status()
        .expect("binary should run");
    assert_eq!(status.code(), Some(0));

    let catalog: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(catalog["flutter"]["version"], "3.24.0");
    assert_eq!(catalog["flutter"]["channel"], "beta");
    assert_eq!(catalog["widgets"][0]["name"], "Builder");
}

#[test]
fn test_show_prints_entry() {
    let temp = TempDir::new().unwrap();
    let out = widget_catalog()
        .current_dir(temp.path())
        .args(["show", "Row", "--flutter-root"])
        .arg(sdk_root())
        .output()
        .expect("binary should run");
    assert_eq!(out.status.code(), Some(0));

    let entry: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(entry["parent"], "Flex");
    assert_eq!(entry["categories"][0], "Layout");
}

#[test]
fn test_missing_sdk_exits_two() {
    let temp = TempDir::new().unwrap();
    let out = widget_catalog()
        .current_dir(temp.path())
        .arg("generate")
        .output()
        .expect("binary should run");
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("ConfigurationError"));
    assert!(!temp.path().join("widgets.json").exists());
}
