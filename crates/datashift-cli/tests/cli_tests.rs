//! CLI integration tests for datashift.
//!
//! These tests verify command-line argument parsing, help output,
//! exit codes, and end-to-end file transfers through the built-in
//! extensions.

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a command for the datashift binary, sandboxed to a temp extension dir.
fn cmd(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("datashift").unwrap();
    cmd.current_dir(dir.path())
        .env("DATASHIFT_EXTENSIONS_PATH", dir.path().join("extensions"));
    cmd
}

fn tempdir() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    let dir = tempdir();
    cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("settings"));
}

#[test]
fn test_run_subcommand_help() {
    let dir = tempdir();
    cmd(&dir)
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--source"))
        .stdout(predicate::str::contains("--sink"))
        .stdout(predicate::str::contains("--settings"))
        .stdout(predicate::str::contains("--source-setting"))
        .stdout(predicate::str::contains("--sink-setting"));
}

#[test]
fn test_version_flag() {
    let dir = tempdir();
    cmd(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("datashift"));
}

// =============================================================================
// list
// =============================================================================

#[test]
fn test_list_shows_builtin_extensions() {
    let dir = tempdir();
    cmd(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sources:"))
        .stdout(predicate::str::contains("Sinks:"))
        .stdout(predicate::str::contains("json-file"))
        .stdout(predicate::str::contains("csv-file"));
}

#[test]
fn test_list_sources_only() {
    let dir = tempdir();
    cmd(&dir)
        .args(["list", "--sources"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sources:"))
        .stdout(predicate::str::contains("Sinks:").not());
}

// =============================================================================
// init
// =============================================================================

#[test]
fn test_init_writes_template() {
    let dir = tempdir();
    cmd(&dir).arg("init").assert().success();

    let text = std::fs::read_to_string(dir.path().join("migration-settings.json")).unwrap();
    assert!(text.contains("\"Source\""));
    assert!(text.contains("\"SinkSettings\""));
    assert!(!text.contains("\"Operations\""));
}

#[test]
fn test_init_multi_includes_operations_skeleton() {
    let dir = tempdir();
    cmd(&dir).args(["init", "--multi"]).assert().success();

    let text = std::fs::read_to_string(dir.path().join("migration-settings.json")).unwrap();
    assert!(text.contains("\"Operations\""));
}

#[test]
fn test_init_refuses_overwrite_without_force() {
    let dir = tempdir();
    cmd(&dir).arg("init").assert().success();
    cmd(&dir)
        .arg("init")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("already exists"));
    cmd(&dir).args(["init", "--force"]).assert().success();
}

#[test]
fn test_init_custom_path() {
    let dir = tempdir();
    cmd(&dir)
        .args(["init", "--path", "custom.json"])
        .assert()
        .success();
    assert!(dir.path().join("custom.json").exists());
}

// =============================================================================
// settings
// =============================================================================

#[test]
fn test_settings_for_one_extension_wrapped_in_sentinels() {
    let dir = tempdir();
    cmd(&dir)
        .args(["settings", "--extension", "json-file", "--source"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<<<"))
        .stdout(predicate::str::contains(">>>"))
        .stdout(predicate::str::contains("\"FilePath\""));
}

#[test]
fn test_settings_full_manifest() {
    let dir = tempdir();
    cmd(&dir)
        .arg("settings")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ToolVersion\""))
        .stdout(predicate::str::contains("\"json-file\""))
        .stdout(predicate::str::contains("\"csv-file\""));
}

#[test]
fn test_settings_to_file_has_no_sentinels() {
    let dir = tempdir();
    cmd(&dir)
        .args(["settings", "--output", "manifest.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<<<").not());

    let text = std::fs::read_to_string(dir.path().join("manifest.json")).unwrap();
    let manifest: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert!(manifest["Extensions"].as_array().unwrap().len() >= 4);
}

#[test]
fn test_settings_unknown_extension_fails() {
    let dir = tempdir();
    cmd(&dir)
        .args(["settings", "--extension", "nope"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("No extension matches"));
}

// =============================================================================
// run
// =============================================================================

#[test]
fn test_run_json_to_json_with_settings_file() {
    let dir = tempdir();
    std::fs::write(
        dir.path().join("input.json"),
        r#"[{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("migration-settings.json"),
        r#"{
            "Source": "json-file",
            "Sink": "json-file",
            "SourceSettings": { "FilePath": "input.json" },
            "SinkSettings": { "FilePath": "output.json" }
        }"#,
    )
    .unwrap();

    cmd(&dir)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Migration completed!"))
        .stdout(predicate::str::contains("Records: 2"));

    let text = std::fs::read_to_string(dir.path().join("output.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 2);
    assert_eq!(parsed[0]["name"], "a");
}

#[test]
fn test_run_json_to_csv_with_flag_overrides() {
    let dir = tempdir();
    std::fs::write(
        dir.path().join("input.json"),
        r#"[{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]"#,
    )
    .unwrap();

    cmd(&dir)
        .args([
            "run",
            "--source",
            "json-file",
            "--sink",
            "csv-file",
            "--source-setting",
            "FilePath=input.json",
            "--sink-setting",
            "FilePath=output.csv",
        ])
        .assert()
        .success();

    let text = std::fs::read_to_string(dir.path().join("output.csv")).unwrap();
    assert_eq!(text, "id,name\n1,a\n2,b\n");
}

#[test]
fn test_run_operations_fan_out() {
    let dir = tempdir();
    std::fs::write(dir.path().join("input.json"), r#"[{"id": 1}]"#).unwrap();
    std::fs::write(
        dir.path().join("migration-settings.json"),
        r#"{
            "Source": "json-file",
            "Sink": "csv-file",
            "SourceSettings": { "FilePath": "input.json" },
            "Operations": [
                { "SinkSettings": { "FilePath": "out-a.csv" } },
                { "SinkSettings": { "FilePath": "out-b.csv" } },
                { "SinkSettings": { "FilePath": "out-c.csv" } }
            ]
        }"#,
    )
    .unwrap();

    cmd(&dir)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Operations: 3"));

    for name in ["out-a.csv", "out-b.csv", "out-c.csv"] {
        assert_eq!(
            std::fs::read_to_string(dir.path().join(name)).unwrap(),
            "id\n1\n"
        );
    }
}

#[test]
fn test_run_output_json_report() {
    let dir = tempdir();
    std::fs::write(dir.path().join("input.json"), r#"[{"id": 1}]"#).unwrap();

    let output = cmd(&dir)
        .args([
            "run",
            "--source",
            "json-file",
            "--sink",
            "json-file",
            "--source-setting",
            "FilePath=input.json",
            "--sink-setting",
            "FilePath=out.json",
            "--output-json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["outcome"], "completed");
    assert_eq!(report["total_records"], 1);
}

#[test]
fn test_run_unknown_source_fails_without_terminal() {
    let dir = tempdir();
    cmd(&dir)
        .args(["run", "--source", "nope", "--sink", "json-file"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("No source extension matches"));
}

#[test]
fn test_run_validation_error_names_property_and_exits_3() {
    let dir = tempdir();
    // json-file source requires FilePath.
    cmd(&dir)
        .args(["run", "--source", "json-file", "--sink", "json-file"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Source:FilePath"));
}

#[test]
fn test_run_missing_settings_file_fails() {
    let dir = tempdir();
    cmd(&dir)
        .args(["run", "--settings", "absent.json"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Cannot read settings file"));
}
