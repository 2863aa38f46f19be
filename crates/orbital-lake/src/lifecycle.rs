//! Snapshot lifecycle: retention and reclamation.
//!
//! Every table replacement leaves the previous catalog snapshot behind for
//! point-in-time reads and crash recovery. Without retention that history
//! grows without bound, so the lifecycle manager expires snapshots
//! superseded by the latest committed state and deletes data files no
//! retained snapshot references.
//!
//! Pruning is a pure retention operation: skipping it entirely is always
//! correct, it just leaves more history than necessary. It must never run
//! between two operations that are conceptually one transaction (e.g.
//! between RAW ingestion and the staged transform pass of the same run).
//! Producer snapshot files under the raw folder are never touched - only
//! files under the catalog's own data prefix are candidates.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::Session;

/// Retention policy for catalog snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RetentionPolicy {
    /// Keep the latest N snapshots; everything older is expired.
    pub keep_snapshots: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { keep_snapshots: 1 }
    }
}

impl RetentionPolicy {
    /// Creates a policy keeping the latest N snapshots.
    #[must_use]
    pub const fn new(keep_snapshots: u32) -> Self {
        Self { keep_snapshots }
    }

    /// Validates the policy, returning a message when it is unusable.
    #[must_use]
    pub fn validate(&self) -> Option<String> {
        if self.keep_snapshots == 0 {
            return Some("keep_snapshots must be at least 1".to_string());
        }
        None
    }
}

/// Result of one prune pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PruneResult {
    /// Catalog snapshots expired.
    pub snapshots_expired: u64,
    /// Orphaned data files deleted.
    pub files_deleted: u64,
    /// Bytes reclaimed from deleted files.
    pub bytes_reclaimed: u64,
    /// Non-fatal per-file errors (pruning continues past them).
    pub errors: Vec<String>,
}

impl PruneResult {
    /// True if any per-file errors were encountered.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Dry-run report showing what a prune pass would remove.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PruneReport {
    /// Snapshot versions that would be expired.
    pub snapshots_to_expire: Vec<u64>,
    /// Data files that would be deleted.
    pub files_to_delete: Vec<String>,
}

/// Expires superseded catalog snapshots and reclaims orphaned data files.
#[derive(Debug, Clone, Default)]
pub struct SnapshotLifecycleManager {
    policy: RetentionPolicy,
}

impl SnapshotLifecycleManager {
    /// Creates a manager with the given retention policy.
    #[must_use]
    pub fn new(policy: RetentionPolicy) -> Self {
        Self { policy }
    }

    /// The active retention policy.
    #[must_use]
    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Reports what a prune pass would remove, without removing anything.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the data prefix cannot be listed.
    pub async fn prune_dry_run(&self, session: &Session) -> Result<PruneReport> {
        let keep = self.policy.keep_snapshots.max(1) as usize;
        let snapshots = &session.catalog().snapshots;
        let cutoff = snapshots.len().saturating_sub(keep);

        let mut report = PruneReport {
            snapshots_to_expire: snapshots[..cutoff].iter().map(|s| s.version).collect(),
            files_to_delete: Vec::new(),
        };

        let retained_refs: std::collections::HashSet<String> = snapshots[cutoff..]
            .iter()
            .flat_map(|s| s.tables.values().map(|e| e.path.clone()))
            .collect();
        let prefix = format!("{}/", session.config().data_prefix.trim_end_matches('/'));
        for meta in session.backend().list(&prefix).await? {
            if !retained_refs.contains(&meta.path) {
                report.files_to_delete.push(meta.path);
            }
        }
        report.files_to_delete.sort();
        Ok(report)
    }

    /// Expires superseded snapshots and deletes unreferenced data files.
    ///
    /// Per-file deletion errors are collected and do not stop the pass.
    ///
    /// # Errors
    ///
    /// Returns an error when the trimmed catalog cannot be committed or the
    /// data prefix cannot be listed.
    pub async fn prune(&self, session: &mut Session) -> Result<PruneResult> {
        let keep = self.policy.keep_snapshots.max(1) as usize;
        let expired = session.expire_snapshots(keep).await?;

        let mut result = PruneResult {
            snapshots_expired: expired.len() as u64,
            ..PruneResult::default()
        };

        let referenced = session.catalog().referenced_paths();
        let prefix = format!("{}/", session.config().data_prefix.trim_end_matches('/'));
        let backend = session.backend();
        for meta in backend.list(&prefix).await? {
            if referenced.contains(&meta.path) {
                continue;
            }
            match backend.delete(&meta.path).await {
                Ok(()) => {
                    result.files_deleted += 1;
                    result.bytes_reclaimed += meta.size;
                }
                Err(e) => {
                    tracing::warn!(file = %meta.path, error = %e, "failed to delete orphaned file");
                    result.errors.push(format!("{}: {e}", meta.path));
                }
            }
        }

        tracing::info!(
            snapshots_expired = result.snapshots_expired,
            files_deleted = result.files_deleted,
            bytes_reclaimed = result.bytes_reclaimed,
            "prune complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_keeps_only_latest() {
        assert_eq!(RetentionPolicy::default().keep_snapshots, 1);
    }

    #[test]
    fn zero_keep_is_invalid() {
        assert!(RetentionPolicy::new(0).validate().is_some());
        assert!(RetentionPolicy::new(3).validate().is_none());
    }

    #[test]
    fn policy_serde_round_trip() {
        let policy = RetentionPolicy::new(5);
        let json = serde_json::to_string(&policy).expect("serialize");
        assert!(json.contains("keepSnapshots"));
        let parsed: RetentionPolicy = serde_json::from_str(&json).expect("parse");
        assert_eq!(policy, parsed);
    }
}
