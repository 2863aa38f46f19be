//! Transform runner: derives one layer from the one above it.
//!
//! Definitions run strictly in order and fail fast: a broken transformation
//! stops the batch immediately, because later definitions may assume its
//! output exists. (Per-file ingestion failures are isolated instead - see
//! the registrar.)

use serde::Serialize;

use orbital_core::TableIdent;

use crate::definitions::TransformDefinition;
use crate::error::{LakeError, Result};
use crate::session::Session;

/// One executed transformation.
#[derive(Debug, Clone, Serialize)]
pub struct TransformOutcome {
    /// Definition that ran.
    pub definition: String,
    /// Table it replaced.
    pub target: TableIdent,
    /// Rows in the replaced table.
    pub row_count: u64,
}

/// Executes ordered transformation definitions against a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformRunner;

impl TransformRunner {
    /// Runs every definition in order, replacing each target table.
    ///
    /// A definition whose primary source table has never landed in the
    /// catalog is skipped: a dataset that hasn't arrived yet is a valid
    /// state, not a broken transformation.
    ///
    /// # Errors
    ///
    /// Returns [`LakeError::Transform`] naming the first failing
    /// definition; the remaining definitions are not attempted.
    pub async fn run(
        &self,
        session: &mut Session,
        definitions: &[TransformDefinition],
    ) -> Result<Vec<TransformOutcome>> {
        let mut outcomes = Vec::with_capacity(definitions.len());
        for definition in definitions {
            if !session.has_table(&definition.source) {
                tracing::info!(
                    definition = %definition.name,
                    source = %definition.source,
                    "skipping transformation; source table has not landed"
                );
                continue;
            }

            tracing::info!(definition = %definition.name, target = %definition.target, "running transformation");
            let (schema, batches) = session
                .query_with_schema(&definition.sql)
                .await
                .map_err(|e| LakeError::transform(&definition.name, e.to_string()))?;
            let entry = session
                .replace_table(&definition.target, schema, batches, None)
                .await
                .map_err(|e| LakeError::transform(&definition.name, e.to_string()))?;

            tracing::info!(
                definition = %definition.name,
                target = %definition.target,
                rows = entry.row_count,
                "transformation complete"
            );
            outcomes.push(TransformOutcome {
                definition: definition.name.clone(),
                target: definition.target.clone(),
                row_count: entry.row_count,
            });
        }
        Ok(outcomes)
    }
}
