use crate::config::DocConfig;
use crate::document::AsyncApiDoc;
use crate::linter::{fail_if_errors, lint_document, print_lint_issues, LintSeverity};
use crate::manifest::Manifest;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Command-line interface for sio-asyncapi
#[derive(Parser)]
#[command(name = "sio-asyncapi")]
#[command(about = "AsyncAPI documents for Socket.IO event APIs", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Print the bootstrap document
    Init {
        /// YAML file with document settings; SIOAPI_* variables override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },
    /// Build a document from a manifest
    Build {
        /// Path to the manifest file (YAML or JSON)
        #[arg(short, long)]
        manifest: PathBuf,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,

        /// Write the document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Resolve a `#/...` pointer against the built document
    Resolve {
        /// Path to the manifest file (YAML or JSON)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Pointer to resolve, e.g. '#/components/schemas/NoSpec'
        #[arg(short, long)]
        pointer: String,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },
    /// Lint the document built from a manifest
    ///
    /// Checks:
    /// - every `$ref` is well-formed and resolves
    /// - operation messages live in the operation's channel
    /// - messages carry a payload schema
    /// - component schemas are referenced
    Lint {
        /// Path to the manifest file (YAML or JSON)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Exit with error code if any errors are found
        #[arg(long, default_value_t = false)]
        fail_on_error: bool,

        /// Show only errors (hide warnings and info)
        #[arg(long, default_value_t = false)]
        errors_only: bool,
    },
}

/// Output encoding for documents and resolved nodes
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> Result<String> {
        Ok(match self {
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Json => serde_json::to_string_pretty(value)? + "\n",
        })
    }

    fn document(self, doc: &AsyncApiDoc) -> Result<String> {
        Ok(match self {
            OutputFormat::Yaml => doc.to_yaml()?,
            OutputFormat::Json => doc.to_json()? + "\n",
        })
    }
}

fn load(manifest: &Path) -> Result<AsyncApiDoc> {
    Manifest::from_file(manifest)?
        .build()
        .with_context(|| format!("Failed to build document from {}", manifest.display()))
}

fn emit(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = text.len(), "wrote document");
        }
        None => print!("{text}"),
    }
    Ok(())
}

/// Execute a parsed command
///
/// # Errors
///
/// Returns an error if:
/// - The manifest or config file cannot be read or parsed
/// - The manifest does not describe a valid document
/// - A pointer does not resolve
/// - The output file cannot be written
pub fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { config, format } => {
            let config = match config {
                Some(path) => DocConfig::from_yaml_file(path)?,
                None => DocConfig::default(),
            }
            .with_env_overrides();
            let doc = AsyncApiDoc::default_init(&config);
            emit(&format.document(&doc)?, None)
        }
        Commands::Build {
            manifest,
            format,
            output,
        } => {
            let doc = load(&manifest)?;
            emit(&format.document(&doc)?, output.as_deref())
        }
        Commands::Resolve {
            manifest,
            pointer,
            format,
        } => {
            let doc = load(&manifest)?;
            let node = doc
                .resolve_ref(pointer.as_str())
                .with_context(|| format!("Failed to resolve {pointer}"))?;
            emit(&format.encode(&node)?, None)
        }
        Commands::Lint {
            manifest,
            fail_on_error,
            errors_only,
        } => {
            let doc = load(&manifest)?;
            let mut issues = lint_document(&doc);
            if errors_only {
                issues.retain(|i| i.severity == LintSeverity::Error);
            }
            print_lint_issues(&issues);
            if fail_on_error {
                fail_if_errors(&issues);
            }
            Ok(())
        }
    }
}
