//! `orbital setup` - attach and initialize the catalog.

use anyhow::Result;

use crate::CommonArgs;

/// Attaches the catalog, initializing it and the layer schemas if absent.
pub async fn execute(_common: &CommonArgs) -> Result<()> {
    let connector = super::connector_from_env()?;
    let session = connector.open_session().await?;
    let snapshot = session.catalog().current()?.version;
    let tables = session.catalog().current()?.tables.len();
    session.close();
    tracing::info!(snapshot, tables, "catalog ready");
    println!("catalog ready (snapshot {snapshot}, {tables} tables)");
    Ok(())
}
