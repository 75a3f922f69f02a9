use assert_cmd::Command;
use tempfile::tempdir;

mod common;

// Basic command line surface
#[test]
fn help_describes_the_surface() {
    let mut cmd = Command::cargo_bin("run_test").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("--out-dir"))
        .stdout(predicates::str::contains("--repo"))
        .stdout(predicates::str::contains("--logs-dir"))
        .stdout(predicates::str::contains("blink"));
}

#[test]
fn version_reports_the_tool_name() {
    let mut cmd = Command::cargo_bin("run_test").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("run_test"));
}

// Configuration errors must fail before the device tool is ever invoked
#[test]
fn missing_out_dir_is_rejected_before_any_device_call() {
    let temp = tempdir().unwrap();
    let trace = temp.path().join("trace");
    let tool = common::write_fake_devctl(temp.path(), &trace, 0, 0, 0);

    let mut cmd = Command::cargo_bin("run_test").unwrap();
    cmd.arg("base_unittests")
        .arg("--device-tool")
        .arg(&tool)
        .assert()
        .failure()
        .code(1)
        .stdout(predicates::str::contains("--out-dir must be specified"));

    assert!(!trace.exists(), "device tool must not have been invoked");
}

#[test]
fn blink_requires_a_target_id() {
    let temp = tempdir().unwrap();
    let trace = temp.path().join("trace");
    let tool = common::write_fake_devctl(temp.path(), &trace, 0, 0, 0);
    let out_dir = common::write_out_dir(temp.path(), &["web_engine.pkg", "blink_shell.pkg"]);

    let mut cmd = Command::cargo_bin("run_test").unwrap();
    cmd.arg("blink")
        .arg("--out-dir")
        .arg(&out_dir)
        .arg("--device-tool")
        .arg(&tool)
        .assert()
        .failure()
        .code(1)
        .stdout(predicates::str::contains("--target-id"));

    assert!(!trace.exists(), "device tool must not have been invoked");
}
