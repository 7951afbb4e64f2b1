#![cfg(all(unix, feature = "cli"))]

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

fn ertza(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ertza"))
        .args(args)
        .env_remove("ERTZA_CONFIG")
        .output()
        .expect("ertza binary should run")
}

fn temp_config(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ertza-cli-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("temp dir should be created");
    let path = dir.join(name);
    fs::write(&path, contents).expect("config should be written");
    path
}

#[test]
fn version_prints_package_version() {
    let out = ertza(&["version"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(stdout.trim(), format!("ertza {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn check_lists_configured_rules_as_json() {
    let path = temp_config(
        "valid.toml",
        r#"
        [machine]
        mode = "master"

        [slave_5]
        velocity_ref_mode = "multiply"
        velocity_ref_value = 2.0
        "#,
    );
    let out = ertza(&["--format", "json", "check", path.to_str().expect("utf-8 path")]);

    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));
    let rows: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("check output should be json");
    assert_eq!(rows[0]["slave"], "5");
    assert_eq!(rows[0]["key"], "velocity_ref");
    assert_eq!(rows[0]["mode"], "multiply");
    assert_eq!(rows[0]["value"], 2.0);
}

#[test]
fn check_fails_on_invalid_rule() {
    let path = temp_config(
        "invalid-rule.toml",
        "[slave_5]\nvelocity_ref_mode = \"scale\"\n",
    );
    let out = ertza(&["--format", "pretty", "check", path.to_str().expect("utf-8 path")]);

    assert_eq!(out.status.code(), Some(78));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("scale"), "{stdout}");
}

#[test]
fn malformed_config_exits_with_config_code() {
    let path = temp_config("broken.toml", "[machine\n");
    let out = ertza(&["--config", path.to_str().expect("utf-8 path"), "check"]);

    assert_eq!(out.status.code(), Some(78));
    assert!(String::from_utf8_lossy(&out.stderr).starts_with("error: "));
}

#[test]
fn serve_without_device_is_a_usage_error() {
    let out = ertza(&["serve"]);
    assert_eq!(out.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&out.stderr).contains("no serial device configured"));
}
