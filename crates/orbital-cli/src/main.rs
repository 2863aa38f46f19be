//! Orbital CLI - command-line interface for the lakehouse.
//!
//! The main entry point for the `orbital` binary.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orbital_cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Setup => orbital_cli::commands::setup::execute(&cli.common).await,
            Commands::Sync(args) => orbital_cli::commands::sync::execute(args, &cli.common).await,
            Commands::Gc(args) => orbital_cli::commands::gc::execute(args, &cli.common).await,
            Commands::Serve(args) => orbital_cli::commands::serve::execute(args, &cli.common).await,
        }
    })
}
