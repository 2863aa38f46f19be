//! `orbital serve` - the read-only dataset API.

use std::sync::Arc;

use anyhow::Result;

use orbital_api::AppState;

use crate::{CommonArgs, ServeArgs};

/// Serves the dataset API until the process is stopped.
pub async fn execute(args: ServeArgs, _common: &CommonArgs) -> Result<()> {
    let connector = super::connector_from_env()?;
    let state = Arc::new(AppState::new(connector).with_origins(args.origin));
    orbital_api::serve(&args.addr, state).await?;
    Ok(())
}
