#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Runs the `sio-asyncapi` binary against manifest files

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sio-asyncapi"))
        .args(args)
        .env_remove("SIOAPI_TITLE")
        .env_remove("SIOAPI_VERSION")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn test_init_prints_bootstrap_document() {
    let output = run(&["init", "--format", "json"]);
    assert!(output.status.success(), "{output:?}");
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["asyncapi"], "3.0.0");
    assert_eq!(value["info"]["title"], "Demo Chat API");
    assert!(value["components"]["schemas"]["NoSpec"].is_object());
}

#[test]
fn test_init_reads_config_file() {
    let mut config = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(config, "title: Lobby API\nserver_name: LOBBY").unwrap();

    let output = run(&["init", "--config", config.path().to_str().unwrap()]);
    assert!(output.status.success(), "{output:?}");
    let value: serde_yaml::Value = serde_yaml::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["info"]["title"].as_str(), Some("Lobby API"));
    assert!(value["servers"]["LOBBY"].is_mapping());
}

#[test]
fn test_build_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("asyncapi.json");
    let manifest = fixture("chat.yaml");

    let output = run(&[
        "build",
        "--manifest",
        manifest.to_str().unwrap(),
        "--format",
        "json",
        "--output",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{output:?}");
    assert!(stdout(&output).is_empty());

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert!(value["operations"]["chat/message"]["reply"].is_object());
}

#[test]
fn test_resolve_prints_node() {
    let manifest = fixture("chat.yaml");
    let output = run(&[
        "resolve",
        "-m",
        manifest.to_str().unwrap(),
        "-p",
        "#/components/schemas/MessagePayload",
        "-f",
        "json",
    ]);
    assert!(output.status.success(), "{output:?}");
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["title"], "MessagePayload");

    let missing = run(&[
        "resolve",
        "-m",
        manifest.to_str().unwrap(),
        "-p",
        "#/components/schemas/Missing",
    ]);
    assert!(!missing.status.success());
    let stderr = String::from_utf8_lossy(&missing.stderr);
    assert!(stderr.contains("segment 'Missing' not found"), "{stderr}");
}

#[test]
fn test_lint_fails_on_broken_reference() {
    let mut manifest = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        manifest,
        r##"
components:
  - kind: schemas
    name: JoinPayload
    value:
      properties:
        room: {{ $ref: "#/components/schemas/Room" }}
"##
    )
    .unwrap();
    let path = manifest.path().to_str().unwrap();

    let output = run(&["lint", "--manifest", path]);
    assert!(output.status.success(), "{output:?}");
    assert!(stdout(&output).contains("broken_reference"));

    let output = run(&["lint", "--manifest", path, "--fail-on-error"]);
    assert_eq!(output.status.code(), Some(1));
}
