//! # CLI Module
//!
//! Command-line front end over [`Manifest`](crate::manifest::Manifest) and
//! the document builder.
//!
//! ## Commands
//!
//! ### `init`
//!
//! Print the bootstrap document for a configuration:
//!
//! ```bash
//! sio-asyncapi init --config asyncapi.yaml
//! ```
//!
//! ### `build`
//!
//! Build a document from a manifest:
//!
//! ```bash
//! sio-asyncapi build --manifest chat.yaml --format json --output asyncapi.json
//! ```
//!
//! ### `resolve`
//!
//! Print the node a pointer addresses in the built document:
//!
//! ```bash
//! sio-asyncapi resolve --manifest chat.yaml --pointer '#/components/schemas/MessagePayload'
//! ```
//!
//! ### `lint`
//!
//! ```bash
//! sio-asyncapi lint --manifest chat.yaml --fail-on-error
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use sio_asyncapi::cli::{run_cli, Cli};
//! use clap::Parser;
//!
//! run_cli(Cli::parse())?;
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{run_cli, Cli, Commands, OutputFormat};
