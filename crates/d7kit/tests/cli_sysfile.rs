#![cfg(feature = "cli")]

use std::process::Command;

fn d7kit(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_d7kit"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("d7kit should run")
}

fn json_stdout(output: &std::process::Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).expect("stdout should be json")
}

#[test]
fn encode_pads_short_fields() {
    let output = d7kit(&["sysfile", "encode", "--app-name", "test", "--git-sha1", "abc1234"]);
    assert!(output.status.success());
    let out = json_stdout(&output);
    assert_eq!(
        out.get("hex").and_then(|v| v.as_str()),
        Some("74657374000061626331323334")
    );
}

#[test]
fn decode_reads_back_fields() {
    let output = d7kit(&["sysfile", "decode", "7468726f756761626331323334"]);
    assert!(output.status.success());
    let out = json_stdout(&output);
    assert_eq!(
        out.get("application_name").and_then(|v| v.as_str()),
        Some("throug")
    );
    assert_eq!(out.get("git_sha1").and_then(|v| v.as_str()), Some("abc1234"));
}

#[test]
fn decode_keeps_unused_name_bytes() {
    let output = d7kit(&["sysfile", "decode", "74657374000061626331323334"]);
    assert!(output.status.success());
    let out = json_stdout(&output);
    assert_eq!(
        out.get("application_name").and_then(|v| v.as_str()),
        Some("test\u{0}\u{0}")
    );
    assert_eq!(
        out.get("hex").and_then(|v| v.as_str()),
        Some("74657374000061626331323334")
    );
}

#[test]
fn encode_rejects_long_application_name() {
    let output = d7kit(&["sysfile", "encode", "--app-name", "toolong", "--git-sha1", "abc1234"]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn decode_rejects_truncated_record() {
    let output = d7kit(&["sysfile", "decode", "7465737400"]);
    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"));
}

#[test]
fn version_prints_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_d7kit"))
        .arg("version")
        .output()
        .expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("d7kit {}", env!("CARGO_PKG_VERSION")));
}
