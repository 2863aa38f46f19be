//! `orbital sync` - one end-to-end sync run.

use anyhow::Result;

use orbital_lake::{RetentionPolicy, SyncOrchestrator};

use crate::{CommonArgs, SyncArgs};

/// Runs one sync pass and prints the run report.
pub async fn execute(args: SyncArgs, common: &CommonArgs) -> Result<()> {
    let connector = super::connector_from_env()?;
    let mut orchestrator = SyncOrchestrator::new(connector, &common.definitions)
        .with_retention(RetentionPolicy::new(args.keep_snapshots));
    if args.no_prune {
        orchestrator = orchestrator.with_prune_disabled();
    }

    let report = orchestrator.run().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
