//! End-to-end CLI smoke tests, in the style of the teacher's own
//! `assert_cmd`/`predicates`-based integration tests.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn missing_config_flag_is_a_usage_error() {
    let mut cmd = Command::cargo_bin("taosgen").unwrap();
    cmd.assert().failure().stderr(predicate::str::contains("config"));
}

#[test]
fn nonexistent_config_file_fails_with_a_readable_message() {
    let mut cmd = Command::cargo_bin("taosgen").unwrap();
    cmd.args(["-c", "/nonexistent/path/to/config.yaml"]);
    cmd.assert().failure();
}

#[test]
fn help_lists_connection_overrides() {
    let mut cmd = Command::cargo_bin("taosgen").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--host"))
        .stdout(predicate::str::contains("--port"));
}

#[test]
fn runs_a_minimal_filesystem_sink_config_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let output_dir = dir.path().join("out");
    let config_path = dir.path().join("config.yaml");
    std::fs::write(
        &config_path,
        format!(
            r#"
database: demo
producer_threads: 1
consumer_threads: 1
block_count: 2
super_tables:
  - name: readings
    table_count: 2
    rows_per_table: 5
    table_name_prefix: sensor_
    columns:
      - name: temp
        type: float
        generator: random
        params:
          min: 0
          max: 100
    timestamp:
      start_timestamp: "1620000000000"
      precision: ms
      step: "1000"
    sink:
      type: filesystem
      output_dir: "{}"
      file_prefix: readings
"#,
            output_dir.display()
        ),
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("taosgen").unwrap();
    cmd.args(["-c", config_path.to_str().unwrap()]);
    cmd.assert().success();
    assert!(output_dir.join("readings.txt").exists());
}
