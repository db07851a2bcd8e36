//! Runs the built binary against files in a scratch directory.

use std::path::Path;
use std::process::{Command, Output};

/// Run `modgraph` with config, data and log dirs redirected into `home`.
fn modgraph(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_modgraph"))
        .args(args)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .output()
        .expect("failed to run modgraph")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn project_lifecycle() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("song.axp");
    let file = file.to_str().unwrap();

    let created = modgraph(home.path(), &["new-project", file]);
    assert!(created.status.success());

    let info = modgraph(home.path(), &["--verbose", "info", file]);
    assert!(info.status.success());
    assert!(stdout(&info).contains("project file, schema version 5"));

    let dump = modgraph(home.path(), &["dump", file]);
    let value: serde_json::Value = serde_json::from_str(&stdout(&dump)).unwrap();
    assert_eq!(value["entities"].as_array().unwrap().len(), 1);
    assert_eq!(value["linked_file"], serde_json::Value::Null);
}

#[test]
fn library_lifecycle_releases_lock() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("modules.axl");
    let file = file.to_str().unwrap();

    let created = modgraph(home.path(), &["new-library", file, "Lead Synth", "bass", "lead"]);
    assert!(created.status.success());
    assert!(!home
        .path()
        .join("data")
        .join("modgraph")
        .join("library.lock")
        .exists());

    let info = modgraph(home.path(), &["info", file]);
    let report = stdout(&info);
    assert!(report.contains("library file"));
    assert!(report.contains("Lead Synth [bass, lead]"));
}

#[test]
fn usage_errors_exit_with_two() {
    let home = tempfile::tempdir().unwrap();
    assert_eq!(modgraph(home.path(), &[]).status.code(), Some(2));
    assert_eq!(modgraph(home.path(), &["frobnicate", "x"]).status.code(), Some(2));
}

#[test]
fn unreadable_file_exits_with_one() {
    let home = tempfile::tempdir().unwrap();
    let junk = home.path().join("junk.bin");
    std::fs::write(&junk, b"definitely not a project").unwrap();
    let output = modgraph(home.path(), &["info", junk.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not a recognized file"));
}
