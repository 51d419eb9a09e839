use assert_cmd::Command;
use predicates::prelude::*;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::thread;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// A `droidtouch` command with its data directory moved out of `$HOME` and
/// pointed at a server that is not running.
fn droidtouch() -> Command {
    let home = std::env::temp_dir().join(format!("droidtouch-cli-{}", std::process::id()));
    let mut cmd = Command::cargo_bin("droidtouch").unwrap();
    cmd.env("DROIDTOUCH_HOME", home)
        .env("DROIDTOUCH_SERVER", "http://127.0.0.1:1")
        .env_remove("DROIDTOUCH_LAUNCH_SERVER")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_exits_zero() {
    droidtouch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("droidtouch"))
        .stdout(predicate::str::contains("pinch-out"));
}

#[test]
fn test_unknown_subcommand() {
    droidtouch()
        .arg("totally-fake-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_unknown_direction_is_rejected() {
    droidtouch()
        .args(["scroll", "sideways"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid direction 'sideways'"));
}

// ---------------------------------------------------------------------------
// Offline gesture plans
// ---------------------------------------------------------------------------

#[test]
fn test_plan_swipe_left() {
    let assert = droidtouch()
        .args(["plan", "--width", "1000", "--height", "2000", "swipe", "left"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let plan: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(plan["repeat"], 1);

    let steps = plan["fingers"][0].as_array().unwrap();
    assert_eq!(steps.first().unwrap()["x"], 500);
    assert_eq!(steps.first().unwrap()["y"], 1000);
    let last_move = steps.iter().rev().find(|s| s["type"] == "move_to").unwrap();
    assert_eq!(last_move["x"], 250);
    assert_eq!(last_move["y"], 1000);
}

#[test]
fn test_plan_pinch_has_two_fingers() {
    let assert = droidtouch()
        .args(["plan", "--width", "1080", "--height", "2400", "pinch-in", "--times", "3"])
        .assert()
        .success();

    let plan: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(plan["fingers"].as_array().unwrap().len(), 2);
    assert_eq!(plan["repeat"], 3);
}

#[test]
fn test_plan_rotate_invalid_degree_exits_3() {
    droidtouch()
        .args(["plan", "--width", "1000", "--height", "2000", "rotate", "7"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("invalid degree 7"));
}

#[test]
fn test_plan_zero_screen_exits_3() {
    droidtouch()
        .args(["plan", "--width", "0", "--height", "2000", "pinch-out"])
        .assert()
        .code(3);
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

#[test]
fn test_convert_basic_session_to_scenario() {
    let fixture = fixture_path("basic_session.jsonl");

    let assert = droidtouch()
        .args(["convert", fixture.to_str().unwrap()])
        .assert()
        .success();

    let scenario: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(scenario["name"], "basic_session");
    let steps = scenario["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 5);
    assert_eq!(steps[0]["type"], "Comment");
    assert_eq!(steps[1]["target"], "xpath=//*[@text='Network & internet']");
    assert_eq!(steps[3]["direction"], "counterclockwise");
    assert_eq!(steps[4]["key"], "home");
}

#[test]
fn test_convert_error_session_to_script() {
    let fixture = fixture_path("error_session.jsonl");

    let assert = droidtouch()
        .args(["convert", "--script", fixture.to_str().unwrap()])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.starts_with("#!/usr/bin/env bash\nset -euo pipefail\n"));

    // Failed actions are still converted
    assert!(stdout.contains("droidtouch tap id=com.example:id/missing"));
    assert!(stdout.contains("# Retrying after failure"));
    assert!(stdout.contains("droidtouch tap 150,300"));
    assert!(stdout.contains(r#"droidtouch enter-text id=com.example:id/search 'it'\''s a test'"#));
}

#[test]
fn test_convert_from_stdin_with_name() {
    let content = std::fs::read_to_string(fixture_path("basic_session.jsonl")).unwrap();

    let assert = droidtouch()
        .args(["convert", "--name", "from stdin"])
        .write_stdin(content)
        .assert()
        .success();

    let scenario: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(scenario["name"], "from stdin");
}

#[test]
fn test_convert_nonexistent_file() {
    droidtouch()
        .args(["convert", "nonexistent_file_that_does_not_exist.jsonl"])
        .assert()
        .code(1);
}

// ---------------------------------------------------------------------------
// Commands that need a server
// ---------------------------------------------------------------------------

#[test]
fn test_device_command_without_server_exits_2() {
    droidtouch()
        .arg("back")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Appium server running"));
}

/// Answers one request on `stream`: session creation succeeds, `back`
/// reports the session as terminated, everything else returns null.
fn answer_as_terminated_session(stream: TcpStream) {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let mut content_length = 0;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).is_err() || header.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    let mut body = vec![0u8; content_length];
    let _ = reader.read_exact(&mut body);

    let mut parts = request_line.split_whitespace();
    let (method, path) = (parts.next().unwrap_or(""), parts.next().unwrap_or(""));
    let (status, payload) = match (method, path) {
        ("POST", "/session") => (200, r#"{"value":{"sessionId":"s1","capabilities":{}}}"#),
        ("POST", "/session/s1/back") => (
            404,
            r#"{"value":{"error":"invalid session id","message":"session was terminated"}}"#,
        ),
        _ => (200, r#"{"value":null}"#),
    };
    let reply = format!(
        "HTTP/1.1 {status} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    let mut stream = reader.into_inner();
    let _ = stream.write_all(reply.as_bytes());
}

#[test]
fn test_session_lost_mid_command_exits_2() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            answer_as_terminated_session(stream);
        }
    });

    droidtouch()
        .env("DROIDTOUCH_SERVER", url)
        .arg("back")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("session ended"));
}

#[test]
fn test_status_reports_unreachable_server() {
    droidtouch()
        .arg("status")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Reachable: false"));
}

#[test]
fn test_invalid_scenario_fails_before_connecting() {
    let fixture = fixture_path("invalid_rotation.json");

    droidtouch()
        .args(["run", fixture.to_str().unwrap()])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("step 2 (rotate)"));
}

#[test]
fn test_missing_scenario_file_exits_3() {
    droidtouch()
        .args(["run", "no/such/scenario.json"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("no/such/scenario.json"));
}

#[test]
fn test_completions_for_bash() {
    droidtouch()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("droidtouch"));
}
