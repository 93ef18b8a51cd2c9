use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs;
use tempfile::{tempdir, TempDir};

fn setup_db() -> TempDir {
    let temp = tempdir().unwrap();
    let records = json!([
        {"file": "/ws/et/runtime/a.cpp", "directory": "/ws/out",
         "command": "c++ -I/ws/et/include -I/ws/et/runtime -DET=1 -std=c++17 -O2 -c /ws/et/runtime/a.cpp"},
        {"file": "/ws/et/runtime/b.cpp", "directory": "/ws/out",
         "command": "c++ -I/ws/et/include -DET=1 -DFAST -std=c++17 -O2 -c /ws/et/runtime/b.cpp"},
        {"file": "/ws/et/tools/gen.c", "directory": "/ws/out",
         "command": "cc -I/ws/et/include -std=c11 -c /ws/et/tools/gen.c"}
    ]);
    fs::write(
        temp.path().join("compile_commands.json"),
        serde_json::to_string(&records).unwrap(),
    )
    .unwrap();
    temp
}

#[allow(deprecated)]
fn cli(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ccdb2layer").expect("binary");
    cmd.current_dir(temp.path()).env_remove("RUST_LOG");
    cmd
}

#[test]
fn stats_json_reports_types_and_flags() {
    let temp = setup_db();
    let output = cli(&temp)
        .args(["stats", "--json", "--strip-path", "/ws/et"])
        .output()
        .expect("command run");
    assert!(output.status.success());

    let stats: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(stats["entries"], 3);
    assert_eq!(stats["file_types"], json!({".c": 1, ".cpp": 2}));
    assert_eq!(stats["top_flags"][0], json!({"flag": "-std", "count": 3}));
    assert_eq!(stats["top_flags"][1], json!({"flag": "-O2", "count": 2}));
    assert_eq!(stats["distinct_includes"], 2);
    assert_eq!(stats["distinct_defines"], 2);
    assert_eq!(stats["unresolved_paths"], 0);
}

#[test]
fn stats_text_respects_root_filter() {
    let temp = setup_db();
    cli(&temp)
        .args(["stats", "--strip-path", "/ws/et", "--root", "tools"])
        .assert()
        .success()
        .stdout(predicate::str::contains("entries:           1"))
        .stdout(predicate::str::contains(".c"));
}

#[test]
fn stats_on_missing_database_fails() {
    let temp = setup_db();
    cli(&temp)
        .args(["stats", "missing.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.json"));
}

#[test]
fn list_files_relative_to_root() {
    let temp = setup_db();
    let output = cli(&temp)
        .args([
            "list",
            "files",
            "--strip-path",
            "/ws/et",
            "--root",
            "runtime",
            "--relative-to",
            "runtime",
        ])
        .output()
        .expect("command run");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "a.cpp\nb.cpp\n");
}

#[test]
fn list_includes_and_defines_are_deduplicated() {
    let temp = setup_db();
    let output = cli(&temp)
        .args(["list", "includes", "--relative-to", "/ws/et"])
        .output()
        .expect("command run");
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "include\nruntime\n"
    );

    let output = cli(&temp)
        .args(["list", "defines"])
        .output()
        .expect("command run");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "ET=1\nFAST\n");
}
