#![cfg(feature = "cli")]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

const REFERENCE_FRAME: [u8; 9] = [0x61, 0x01, 0x78, 0x56, 0x34, 0x12, 0x7A, 0x14, 0x01];

fn objlink() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_objlink"));
    cmd.arg("--log-level").arg("error");
    cmd.env_remove("OBJLINK_PREFIX").env_remove("OBJLINK_SUFFIX");
    cmd
}

fn run_with_stdin(mut cmd: Command, input: &[u8]) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("objlink should start");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(input)
        .expect("stdin should accept input");
    child.wait_with_output().expect("objlink should exit")
}

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "objlink-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

#[test]
fn encode_raw_writes_reference_frame() {
    let output = objlink()
        .args(["--format", "raw", "encode", "--channel", "1", "--hex", "78563412"])
        .output()
        .expect("encode should run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(output.stdout, REFERENCE_FRAME);
}

#[test]
fn encode_json_describes_frame() {
    let output = objlink()
        .args(["--format", "json", "encode", "--hex", "78563412"])
        .output()
        .expect("encode should run");

    assert!(output.status.success());
    let line = String::from_utf8(output.stdout).expect("json output should be utf-8");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("valid json");
    assert_eq!(value["channel"], 1);
    assert_eq!(value["payload_size"], 4);
    assert_eq!(value["checksum"], 0x0114);
    assert_eq!(value["frame"], "6101785634127a1401");
}

#[test]
fn encode_to_file_then_decode_file() {
    let dir = unique_temp_dir("file");
    let path = dir.join("frames.bin");

    let status = objlink()
        .args(["encode", "--channel", "9", "--text", "ping", "--repeat", "3", "--out"])
        .arg(&path)
        .status()
        .expect("encode should run");
    assert!(status.success());
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 27);

    let output = objlink()
        .args(["--format", "json", "decode", "--channel", "9", "--size", "4", "--input"])
        .arg(&path)
        .output()
        .expect("decode should run");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let payloads: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid json line"))
        .collect();
    assert_eq!(payloads.len(), 3);
    for (i, payload) in payloads.iter().enumerate() {
        assert_eq!(payload["index"], i as u64);
        assert_eq!(payload["payload"], hex_of(b"ping"));
    }

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_stdin_skips_noise_and_other_channels() {
    let mut wire = vec![0x00, 0xFF, b'z'];
    wire.extend_from_slice(&[b'a', 2, 1, 2, 3, 4, b'z', 10, 0]);
    wire.extend_from_slice(&REFERENCE_FRAME);

    let mut cmd = objlink();
    cmd.args(["--format", "json", "decode", "--size", "4", "--stats"]);
    let output = run_with_stdin(cmd, &wire);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid json line"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["payload"], "78563412");
    assert_eq!(lines[1]["frames"], 1);
    assert_eq!(lines[1]["foreign"], 1);
    assert_eq!(lines[1]["bytes"], wire.len() as u64);
}

#[test]
fn decode_raw_output_is_payload_bytes() {
    let mut cmd = objlink();
    cmd.args(["--format", "raw", "decode", "--size", "4"]);
    let output = run_with_stdin(cmd, &[REFERENCE_FRAME, REFERENCE_FRAME].concat());

    assert!(output.status.success());
    assert_eq!(output.stdout, [0x78, 0x56, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12]);
}

#[test]
fn custom_markers_from_environment() {
    let output = objlink()
        .env("OBJLINK_PREFIX", "0x02")
        .env("OBJLINK_SUFFIX", "0x03")
        .args(["--format", "raw", "encode", "--hex", "05"])
        .output()
        .expect("encode should run");

    assert!(output.status.success());
    assert_eq!(output.stdout, [0x02, 0x01, 0x05, 0x03, 0x05, 0x00]);
}

#[test]
fn stream_shorter_than_count_fails() {
    let mut cmd = objlink();
    cmd.args(["--format", "json", "decode", "--size", "4", "--count", "2"]);
    let output = run_with_stdin(cmd, &REFERENCE_FRAME);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("1 of 2"));
}

#[test]
fn usage_and_data_errors_map_to_exit_codes() {
    let zero_channel = objlink()
        .args(["encode", "--channel", "0", "--hex", "00"])
        .output()
        .unwrap();
    assert_eq!(zero_channel.status.code(), Some(64));

    let colliding = objlink()
        .args(["--prefix", "q", "--suffix", "q", "encode", "--hex", "00"])
        .output()
        .unwrap();
    assert_eq!(colliding.status.code(), Some(64));

    let bad_hex = objlink().args(["encode", "--hex", "xyz"]).output().unwrap();
    assert_eq!(bad_hex.status.code(), Some(60));

    let missing = objlink()
        .args(["decode", "--size", "1", "--input", "/definitely/not/here.bin"])
        .output()
        .unwrap();
    assert_eq!(missing.status.code(), Some(1));
}

#[test]
fn oversized_arguments_are_usage_errors() {
    let mut cmd = objlink();
    cmd.args(["decode", "--size", "18446744073709551615"]);
    let huge_size = run_with_stdin(cmd, &[]);
    assert_eq!(huge_size.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&huge_size.stderr).contains("payload too large"));

    let huge_repeat = objlink()
        .args(["encode", "--hex", "00", "--repeat", "18446744073709551615"])
        .output()
        .unwrap();
    assert_eq!(huge_repeat.status.code(), Some(64));
}

#[test]
fn version_prints_name() {
    let output = objlink().arg("version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("objlink "));
}

fn hex_of(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
