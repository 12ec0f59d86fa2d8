use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const ADDRESS: &str = "1BoatSLRHtKNngkdXEeobR76b53LETtpyT";

/// A `bex` invocation isolated from the user's environment and config.
fn bex(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bex").unwrap();
    for var in [
        "BEX_ADDRESS",
        "BEX_SERVER_URL",
        "BEX_SERVER_TIMEOUT",
        "BEX_FORMAT",
        "BEX_HEIGHT",
        "BEX_HASH",
        "BEX_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("BEX_CONFIG", home.path().join("absent.toml"));
    cmd
}

/// Accept one connection, read one request line and answer with `respond`.
///
/// `None` keeps the connection open without answering.
fn serve_once<F>(respond: F) -> String
where
    F: FnOnce(&Value) -> Option<Value> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let request: Value = serde_json::from_str(&line).unwrap();
        let mut writer = stream;
        match respond(&request) {
            Some(reply) => {
                writeln!(writer, "{}", reply).unwrap();
            }
            None => thread::sleep(Duration::from_secs(5)),
        }
    });
    format!("tcp://127.0.0.1:{}", port)
}

#[test]
fn test_no_arguments_prints_usage_and_is_invalid() {
    let home = TempDir::new().unwrap();
    bex(&home)
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Usage: bex COMMAND [OPTIONS]"))
        .stderr(predicate::str::contains("fetch-balance"));
}

#[test]
fn test_unknown_command_is_failure() {
    let home = TempDir::new().unwrap();
    bex(&home)
        .arg("unknown-command")
        .assert()
        .code(255)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("command not found: unknown-command"));
}

#[test]
fn test_help_for_command_goes_to_stdout() {
    let home = TempDir::new().unwrap();
    bex(&home)
        .args(["help", "fetch-balance"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--address"));
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();
    bex(&home)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(format!(
            "bex v{}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_missing_address_is_failure() {
    let home = TempDir::new().unwrap();
    bex(&home)
        .arg("fetch-balance")
        .assert()
        .code(255)
        .stderr(predicate::str::contains("missing required option: --address"));
}

#[test]
fn test_balance_from_server_with_cli_address_over_env() {
    let home = TempDir::new().unwrap();
    let server = serve_once(|request| {
        assert_eq!(request["method"], "blockchain.fetch_history");
        assert_eq!(request["params"]["address"], ADDRESS);
        Some(json!({
            "id": request["id"],
            "result": [
                { "value": 150, "height": 10, "spent": null },
                { "value": 50, "height": 11, "spent": { "hash": "ab", "index": 1 } }
            ]
        }))
    });

    bex(&home)
        .env("BEX_ADDRESS", "1111111111111111111111111111")
        .args(["fetch-balance", "--address", ADDRESS, "--server", server.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("address: {}", ADDRESS)))
        .stdout(predicate::str::contains("received: 200"))
        .stdout(predicate::str::contains("spent: 50"))
        .stdout(predicate::str::contains("confirmed: 150"));
}

#[test]
fn test_height_as_json() {
    let home = TempDir::new().unwrap();
    let server = serve_once(|request| Some(json!({ "id": request["id"], "result": 812345 })));

    let assert = bex(&home)
        .args(["height", "--format", "json", "-s", server.as_str()])
        .assert()
        .success();
    let stdout: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(stdout, json!({ "height": 812345 }));
}

#[test]
fn test_server_error_is_failure() {
    let home = TempDir::new().unwrap();
    let server = serve_once(|request| {
        Some(json!({
            "id": request["id"],
            "error": { "code": 3, "message": "not found" }
        }))
    });

    bex(&home)
        .env("BEX_SERVER_URL", &server)
        .args(["fetch-balance", "-a", ADDRESS])
        .assert()
        .code(255)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("server error 3: not found"));
}

#[test]
fn test_silent_server_times_out() {
    let home = TempDir::new().unwrap();
    let server = serve_once(|_| None);

    bex(&home)
        .args(["fetch-height", "--timeout", "1", "--server", server.as_str()])
        .assert()
        .code(255)
        .stderr(predicate::str::contains("no response from server within 1s"));
}

#[test]
fn test_refused_connection_is_failure() {
    let home = TempDir::new().unwrap();
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    bex(&home)
        .args(["fetch-height", "--server", format!("tcp://127.0.0.1:{}", port).as_str()])
        .assert()
        .code(255)
        .stderr(predicate::str::contains("could not connect to"));
}

#[test]
fn test_settings_layers_and_origins() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("bex.toml");
    fs::write(
        &config,
        "[server]\nurl = \"tcp://from-file:1\"\ntimeout = 20\n",
    )
    .unwrap();

    bex(&home)
        .env("BEX_SERVER_TIMEOUT", "30")
        .env("BEX_FORMAT", "text")
        .args(["settings", "--show-origin", "--config"])
        .arg(&config)
        .args(["--server", "tcp://from-cli:2"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "    server:\n        origin: command-line\n        value: tcp://from-cli:2\n",
        ))
        .stdout(predicate::str::contains(
            "    timeout:\n        origin: config-file\n        value: 20\n",
        ))
        .stdout(predicate::str::contains(
            "    format:\n        origin: environment\n        value: text\n",
        ));
}

#[test]
fn test_malformed_config_is_failure() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("broken.toml");
    fs::write(&config, "[server\nurl = ").unwrap();

    bex(&home)
        .env("BEX_CONFIG", &config)
        .arg("settings")
        .assert()
        .code(255)
        .stderr(predicate::str::contains("malformed config file"));
}

#[test]
fn test_header_height_on_command_line_beats_hash_in_environment() {
    let home = TempDir::new().unwrap();
    let server = serve_once(|request| {
        assert_eq!(request["method"], "blockchain.fetch_block_header");
        assert_eq!(request["params"], json!({ "height": 5 }));
        Some(json!({ "id": request["id"], "result": { "height": 5, "timestamp": 0 } }))
    });

    bex(&home)
        .env(
            "BEX_HASH",
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f",
        )
        .args(["fetch-header", "--height", "5", "--server", server.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("time: 1970-01-01T00:00:00Z"));
}
