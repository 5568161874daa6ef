//! Unit tests for CLI commands

use crate::cli::{Cli, Commands, OutputFormat};
use clap::Parser;
use serde_json::json;

#[test]
fn test_build_command_defaults() {
    let cli = Cli::try_parse_from(["sio-asyncapi", "build", "--manifest", "chat.yaml"]).unwrap();

    match cli.command {
        Commands::Build {
            manifest,
            format,
            output,
        } => {
            assert_eq!(manifest.to_string_lossy(), "chat.yaml");
            assert_eq!(format, OutputFormat::Yaml);
            assert!(output.is_none());
        }
        _ => panic!("Expected Build command"),
    }
}

#[test]
fn test_build_command_with_flags() {
    let cli = Cli::try_parse_from([
        "sio-asyncapi",
        "build",
        "-m",
        "chat.yaml",
        "--format",
        "json",
        "--output",
        "out.json",
    ])
    .unwrap();

    match cli.command {
        Commands::Build { format, output, .. } => {
            assert_eq!(format, OutputFormat::Json);
            assert_eq!(output.unwrap().to_string_lossy(), "out.json");
        }
        _ => panic!("Expected Build command"),
    }
}

#[test]
fn test_lint_command_with_flags() {
    let cli = Cli::try_parse_from([
        "sio-asyncapi",
        "lint",
        "--manifest",
        "chat.yaml",
        "--fail-on-error",
        "--errors-only",
    ])
    .unwrap();

    match cli.command {
        Commands::Lint {
            manifest,
            fail_on_error,
            errors_only,
        } => {
            assert_eq!(manifest.to_string_lossy(), "chat.yaml");
            assert!(fail_on_error);
            assert!(errors_only);
        }
        _ => panic!("Expected Lint command"),
    }
}

#[test]
fn test_all_commands_parse() {
    let commands = vec![
        vec!["sio-asyncapi", "init"],
        vec!["sio-asyncapi", "init", "--config", "doc.yaml", "-f", "json"],
        vec!["sio-asyncapi", "build", "--manifest", "chat.yaml"],
        vec!["sio-asyncapi", "resolve", "-m", "chat.yaml", "-p", "#/info"],
        vec!["sio-asyncapi", "lint", "--manifest", "chat.yaml"],
    ];

    for args in commands {
        let result = Cli::try_parse_from(args.clone());
        assert!(result.is_ok(), "Failed to parse: {:?}", args);
    }
}

#[test]
fn test_missing_manifest_and_bad_format_are_rejected() {
    assert!(Cli::try_parse_from(["sio-asyncapi", "build"]).is_err());
    assert!(Cli::try_parse_from(["sio-asyncapi", "resolve", "-m", "chat.yaml"]).is_err());
    assert!(Cli::try_parse_from(["sio-asyncapi", "build", "-m", "x", "-f", "toml"]).is_err());
}

#[test]
fn test_output_format_encode() {
    let value = json!({"title": "Chat"});
    assert_eq!(OutputFormat::Yaml.encode(&value).unwrap(), "title: Chat\n");
    assert_eq!(
        OutputFormat::Json.encode(&value).unwrap(),
        "{\n  \"title\": \"Chat\"\n}\n"
    );
}
