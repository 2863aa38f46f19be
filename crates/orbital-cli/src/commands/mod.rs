//! Command implementations.

pub mod gc;
pub mod serve;
pub mod setup;
pub mod sync;

use anyhow::Result;

use orbital_core::LakeConfig;
use orbital_lake::Connector;

/// Builds a connector from the environment-driven configuration.
pub(crate) fn connector_from_env() -> Result<Connector> {
    let config = LakeConfig::from_env()?;
    Ok(Connector::from_config(config)?)
}
