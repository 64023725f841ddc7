use assert_cmd::Command;
use tempfile::tempdir;

const BIN: &str = "sim-run";

#[test]
fn init_writes_a_config_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("sim.yaml");

    let mut cmd = Command::cargo_bin(BIN).unwrap();
    cmd.arg("--config").arg(&config_path).arg("--init").assert().success();

    assert!(config_path.exists());
}

#[test]
fn init_twice_fails_the_second_time() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("sim.yaml");

    Command::cargo_bin(BIN).unwrap().arg("--config").arg(&config_path).arg("--init").assert().success();
    Command::cargo_bin(BIN).unwrap().arg("--config").arg(&config_path).arg("--init").assert().failure();
}

#[test]
fn missing_config_file_is_a_failure() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("does-not-exist.yaml");

    Command::cargo_bin(BIN)
        .unwrap()
        .arg("--config")
        .arg(&config_path)
        .arg("--local-app")
        .arg("http://localhost:1")
        .assert()
        .failure();
}

#[test]
fn run_with_empty_fixtures_directory_passes_with_zero_fixtures() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("sim.yaml");
    std::fs::write(
        &config_path,
        "service: users\nport: 8080\nendpoints:\n  - name: get_user\n    method: GET\n    path: /users/1\n",
    )
    .unwrap();
    let fixtures_dir = dir.path().join("fixtures");
    std::fs::create_dir_all(&fixtures_dir).unwrap();
    let output_dir = dir.path().join("out");

    Command::cargo_bin(BIN)
        .unwrap()
        .arg("--config")
        .arg(&config_path)
        .arg("--local-app")
        .arg("http://localhost:1")
        .arg("--fixtures")
        .arg(&fixtures_dir)
        .arg("--output")
        .arg(&output_dir)
        .arg("--json")
        .assert()
        .success();

    assert!(output_dir.join("report.json").exists());
}
