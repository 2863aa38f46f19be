//! # orbital-cli
//!
//! Command-line interface for the Orbital lakehouse: catalog setup, sync
//! runs, retention, and the serving API.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]

use clap::{Args, Parser, Subcommand};

pub mod commands;

/// Orbital: a quality-gated analytical data lakehouse.
#[derive(Debug, Parser)]
#[command(name = "orbital", version, about)]
pub struct Cli {
    /// Options shared by every command.
    #[command(flatten)]
    pub common: CommonArgs,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Debug, Args)]
pub struct CommonArgs {
    /// Definitions root directory.
    #[arg(long, default_value = "definitions", global = true)]
    pub definitions: std::path::PathBuf,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Attach (initializing if needed) the catalog and its layer schemas.
    Setup,
    /// Run one end-to-end sync: register RAW, transform, gate, promote.
    Sync(SyncArgs),
    /// Expire superseded catalog snapshots and reclaim orphaned files.
    Gc(GcArgs),
    /// Serve the read-only dataset API over the CLEANED layer.
    Serve(ServeArgs),
}

/// Arguments for `orbital sync`.
#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Skip snapshot retention for this run.
    #[arg(long)]
    pub no_prune: bool,

    /// Keep this many catalog snapshots when pruning.
    #[arg(long, default_value_t = 1)]
    pub keep_snapshots: u32,
}

/// Arguments for `orbital gc`.
#[derive(Debug, Args)]
pub struct GcArgs {
    /// Report what would be removed without removing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Keep this many catalog snapshots.
    #[arg(long, default_value_t = 1)]
    pub keep_snapshots: u32,
}

/// Arguments for `orbital serve`.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0:8000")]
    pub addr: String,

    /// Allowed CORS origins (default: any).
    #[arg(long)]
    pub origin: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn sync_flags_parse() {
        let cli = Cli::parse_from(["orbital", "sync", "--no-prune", "--keep-snapshots", "3"]);
        match cli.command {
            Commands::Sync(args) => {
                assert!(args.no_prune);
                assert_eq!(args.keep_snapshots, 3);
            }
            _ => panic!("expected sync"),
        }
    }

    #[test]
    fn definitions_root_defaults() {
        let cli = Cli::parse_from(["orbital", "setup"]);
        assert_eq!(cli.common.definitions, std::path::PathBuf::from("definitions"));
    }
}
