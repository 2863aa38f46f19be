//! `orbital gc` - snapshot retention on its own.

use anyhow::Result;

use orbital_lake::{RetentionPolicy, SnapshotLifecycleManager};

use crate::{CommonArgs, GcArgs};

/// Expires superseded snapshots and reclaims orphaned data files.
pub async fn execute(args: GcArgs, _common: &CommonArgs) -> Result<()> {
    let connector = super::connector_from_env()?;
    let manager = SnapshotLifecycleManager::new(RetentionPolicy::new(args.keep_snapshots));

    let mut session = connector.open_session().await?;
    if args.dry_run {
        let report = manager.prune_dry_run(&session).await;
        session.close();
        let report = report?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let result = manager.prune(&mut session).await;
    session.close();
    let result = result?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
