use clap::Parser;
use sio_asyncapi::cli::{run_cli, Cli};
use sio_asyncapi::logging::{init_logging, LogConfig};

fn main() -> anyhow::Result<()> {
    init_logging(&LogConfig::from_env())?;
    run_cli(Cli::parse())
}
