//! Sync orchestrator: one end-to-end run of the engine's state machine.
//!
//! ```text
//! INIT -> RAW_REFRESHED -> STAGED_BUILT -> QUALITY_EVALUATED
//!                                             |-> CLEANED_BUILT -> DONE
//!                                             '-> HELD          -> DONE
//! ```
//!
//! The orchestrator owns the session for the run's lifetime: it opens at
//! entry, and closes on every exit path, including when a transform raises
//! mid-batch. All definition files load before any catalog mutation, so a
//! missing definition aborts a run with nothing changed.
//!
//! A failed quality gate holds promotion: CLEANED stays at its last
//! successfully promoted state, trading freshness for consistency. The run
//! never retries on its own - re-invocation is the scheduler's job.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use orbital_core::{Layer, RunId, sync_span};

use crate::definitions::DefinitionSet;
use crate::error::{LakeError, Result};
use crate::lifecycle::{PruneResult, RetentionPolicy, SnapshotLifecycleManager};
use crate::quality::{GateResult, QualityGate};
use crate::registrar::{IngestionSummary, LayerRegistrar};
use crate::session::{Connector, Session};
use crate::transform::{TransformOutcome, TransformRunner};

/// Sync run state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    /// Session opened, nothing refreshed yet.
    Init,
    /// RAW tables registered from the snapshot folder.
    RawRefreshed,
    /// STAGED tables derived from RAW.
    StagedBuilt,
    /// Quality gate evaluated against STAGED.
    QualityEvaluated,
    /// CLEANED tables rebuilt (gate passed).
    CleanedBuilt,
    /// Promotion held (gate failed); CLEANED untouched.
    Held,
    /// Run finished; reached exactly once per run.
    Done,
}

impl SyncState {
    /// Returns true if this is the terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if the transition from self to target is valid.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        match self {
            Self::Init => matches!(target, Self::RawRefreshed),
            Self::RawRefreshed => matches!(target, Self::StagedBuilt),
            Self::StagedBuilt => matches!(target, Self::QualityEvaluated),
            Self::QualityEvaluated => matches!(target, Self::CleanedBuilt | Self::Held),
            Self::CleanedBuilt | Self::Held => matches!(target, Self::Done),
            Self::Done => false,
        }
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::RawRefreshed => "RAW_REFRESHED",
            Self::StagedBuilt => "STAGED_BUILT",
            Self::QualityEvaluated => "QUALITY_EVALUATED",
            Self::CleanedBuilt => "CLEANED_BUILT",
            Self::Held => "HELD",
            Self::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// The run's promotion decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Promotion {
    /// Quality gate passed; CLEANED rebuilt from STAGED.
    Promoted,
    /// Quality gate failed; CLEANED left at its last promoted state.
    Held,
}

impl std::fmt::Display for Promotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Promoted => f.write_str("PROMOTED"),
            Self::Held => f.write_str("HELD"),
        }
    }
}

/// Record of one orchestration pass. Emitted to logs, not persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Unique run identifier.
    pub run_id: RunId,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// RAW registration outcome.
    pub ingestion: IngestionSummary,
    /// Staged transformations that ran.
    pub staged: Vec<TransformOutcome>,
    /// Quality gate verdicts.
    pub gate: GateResult,
    /// Cleaned transformations that ran (empty when held).
    pub cleaned: Vec<TransformOutcome>,
    /// The promotion decision.
    pub promotion: Promotion,
    /// Prune passes that ran during this run.
    pub prunes: Vec<PruneResult>,
}

struct PipelineOutcome {
    ingestion: IngestionSummary,
    staged: Vec<TransformOutcome>,
    gate: GateResult,
    cleaned: Vec<TransformOutcome>,
    promotion: Promotion,
    prunes: Vec<PruneResult>,
}

/// Sequences registration, transforms, gating, and retention into one run.
pub struct SyncOrchestrator {
    connector: Connector,
    definitions_root: PathBuf,
    families: Option<Vec<String>>,
    gate: QualityGate,
    lifecycle: SnapshotLifecycleManager,
    prune_enabled: bool,
}

impl SyncOrchestrator {
    /// Creates an orchestrator over a connector and a definitions root.
    #[must_use]
    pub fn new(connector: Connector, definitions_root: impl Into<PathBuf>) -> Self {
        Self {
            connector,
            definitions_root: definitions_root.into(),
            families: None,
            gate: QualityGate::default(),
            lifecycle: SnapshotLifecycleManager::default(),
            prune_enabled: true,
        }
    }

    /// Overrides the dataset family list (default: the built-in four).
    #[must_use]
    pub fn with_families(mut self, families: Vec<String>) -> Self {
        self.families = Some(families);
        self
    }

    /// Overrides the snapshot retention policy.
    #[must_use]
    pub fn with_retention(mut self, policy: RetentionPolicy) -> Self {
        self.lifecycle = SnapshotLifecycleManager::new(policy);
        self
    }

    /// Disables pruning for this orchestrator. Always safe; keeps more
    /// history.
    #[must_use]
    pub fn with_prune_disabled(mut self) -> Self {
        self.prune_enabled = false;
        self
    }

    /// Overrides the quality gate's violating-row sample limit.
    #[must_use]
    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.gate = QualityGate::with_sample_limit(limit);
        self
    }

    /// Executes one sync run to completion.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: missing definitions (before any
    /// mutation), catalog attach failures, or a transform failure. The
    /// session is released before the error propagates.
    pub async fn run(&self) -> Result<SyncReport> {
        let run_id = RunId::generate();
        let span = sync_span("run", run_id);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: RunId) -> Result<SyncReport> {
        // Load every definition before touching the catalog.
        let definitions = self.load_definitions()?;

        let started_at = Utc::now();
        tracing::info!(
            staged = definitions.staged.len(),
            cleaned = definitions.cleaned.len(),
            quality = definitions.quality.len(),
            "starting sync run"
        );

        let mut session = self.connector.open_session().await?;
        let outcome = self.run_pipeline(&mut session, &definitions).await;
        session.close();
        let pipeline = outcome?;

        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds();
        tracing::info!(
            duration_ms,
            promotion = %pipeline.promotion,
            tables_registered = pipeline.ingestion.tables.len(),
            "sync run complete"
        );

        Ok(SyncReport {
            run_id,
            started_at,
            finished_at,
            ingestion: pipeline.ingestion,
            staged: pipeline.staged,
            gate: pipeline.gate,
            cleaned: pipeline.cleaned,
            promotion: pipeline.promotion,
            prunes: pipeline.prunes,
        })
    }

    fn load_definitions(&self) -> Result<DefinitionSet> {
        match &self.families {
            Some(families) => {
                let refs: Vec<&str> = families.iter().map(String::as_str).collect();
                DefinitionSet::load_families(&self.definitions_root, &refs)
            }
            None => DefinitionSet::load(&self.definitions_root),
        }
    }

    async fn run_pipeline(
        &self,
        session: &mut Session,
        definitions: &DefinitionSet,
    ) -> Result<PipelineOutcome> {
        let mut state = SyncState::Init;

        let registrar = LayerRegistrar::new(&self.connector.config().raw_prefix, Layer::Raw);
        let ingestion = registrar.register(session).await?;
        if ingestion.has_failures() {
            tracing::warn!(
                failed = ingestion.failures.len(),
                registered = ingestion.tables.len(),
                "some snapshot files failed to register; continuing with the rest"
            );
        }
        advance(&mut state, SyncState::RawRefreshed)?;

        let runner = TransformRunner;
        let staged = runner.run(session, &definitions.staged).await?;
        advance(&mut state, SyncState::StagedBuilt)?;

        let mut prunes = Vec::new();
        self.maybe_prune(session, &mut prunes).await;

        let gate = self.gate.evaluate(session, &definitions.quality).await;
        advance(&mut state, SyncState::QualityEvaluated)?;

        let (cleaned, promotion) = if gate.all_passed() {
            let cleaned = runner.run(session, &definitions.cleaned).await?;
            advance(&mut state, SyncState::CleanedBuilt)?;
            self.maybe_prune(session, &mut prunes).await;
            (cleaned, Promotion::Promoted)
        } else {
            tracing::warn!(
                failed_checks = ?gate.failed_checks(),
                "data quality checks failed; holding promotion and keeping the last promoted CLEANED data"
            );
            advance(&mut state, SyncState::Held)?;
            (Vec::new(), Promotion::Held)
        };

        advance(&mut state, SyncState::Done)?;
        tracing::debug!(state = %state, "run reached terminal state");

        Ok(PipelineOutcome {
            ingestion,
            staged,
            gate,
            cleaned,
            promotion,
            prunes,
        })
    }

    async fn maybe_prune(&self, session: &mut Session, prunes: &mut Vec<PruneResult>) {
        if !self.prune_enabled {
            return;
        }
        match self.lifecycle.prune(session).await {
            Ok(result) => prunes.push(result),
            // Retention is optional; a failed prune must not fail the run.
            Err(e) => tracing::warn!(error = %e, "prune failed; continuing without retention"),
        }
    }
}

fn advance(state: &mut SyncState, next: SyncState) -> Result<()> {
    if !state.can_transition_to(next) {
        return Err(LakeError::internal(format!(
            "invalid sync state transition {state} -> {next}"
        )));
    }
    tracing::debug!(from = %state, to = %next, "sync state transition");
    *state = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_valid() {
        let path = [
            SyncState::Init,
            SyncState::RawRefreshed,
            SyncState::StagedBuilt,
            SyncState::QualityEvaluated,
            SyncState::CleanedBuilt,
            SyncState::Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn held_path_transitions_are_valid() {
        assert!(SyncState::QualityEvaluated.can_transition_to(SyncState::Held));
        assert!(SyncState::Held.can_transition_to(SyncState::Done));
    }

    #[test]
    fn done_is_terminal() {
        assert!(SyncState::Done.is_terminal());
        for target in [
            SyncState::Init,
            SyncState::RawRefreshed,
            SyncState::StagedBuilt,
            SyncState::QualityEvaluated,
            SyncState::CleanedBuilt,
            SyncState::Held,
            SyncState::Done,
        ] {
            assert!(!SyncState::Done.can_transition_to(target));
        }
    }

    #[test]
    fn skipping_states_is_invalid() {
        assert!(!SyncState::Init.can_transition_to(SyncState::StagedBuilt));
        assert!(!SyncState::RawRefreshed.can_transition_to(SyncState::QualityEvaluated));
        assert!(!SyncState::StagedBuilt.can_transition_to(SyncState::CleanedBuilt));
    }

    #[test]
    fn advance_rejects_invalid_transition() {
        let mut state = SyncState::Init;
        assert!(advance(&mut state, SyncState::Done).is_err());
        assert_eq!(state, SyncState::Init);

        advance(&mut state, SyncState::RawRefreshed).expect("valid transition");
        assert_eq!(state, SyncState::RawRefreshed);
    }

    #[test]
    fn state_serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&SyncState::RawRefreshed).unwrap();
        assert_eq!(json, "\"RAW_REFRESHED\"");
        let json = serde_json::to_string(&Promotion::Promoted).unwrap();
        assert_eq!(json, "\"PROMOTED\"");
    }
}
