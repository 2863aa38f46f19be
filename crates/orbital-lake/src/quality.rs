//! Quality gate: violation-set checks over the STAGED layer.
//!
//! Each check is a read-only query whose result set is the set of violating
//! rows; zero rows is a pass. A check whose query itself errors (malformed
//! SQL, missing table) is a FAIL, not a skip: its cause is logged and
//! evaluation continues, so one broken check can neither mask another
//! check's genuine failure nor crash the orchestrator. The gate never
//! mutates catalog state.

use arrow::record_batch::RecordBatch;
use serde::Serialize;

use crate::definitions::QualityCheckDefinition;
use crate::parquet_io;
use crate::session::Session;

/// Default number of violating rows sampled into a check outcome.
pub const DEFAULT_SAMPLE_LIMIT: usize = 5;

/// Verdict for one quality check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    /// Check name.
    pub check: String,
    /// Whether the check passed (zero violating rows, query succeeded).
    pub passed: bool,
    /// Number of violating rows the query returned.
    pub violating_rows: u64,
    /// Up to the sample limit of violating rows, as JSON objects.
    pub sample: Vec<serde_json::Value>,
    /// Execution error, when the query itself failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate verdict of one gate evaluation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GateResult {
    /// Per-check outcomes, in evaluation order.
    pub checks: Vec<CheckOutcome>,
}

impl GateResult {
    /// True only when every check passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|check| check.passed)
    }

    /// Names of the checks that failed.
    #[must_use]
    pub fn failed_checks(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|check| !check.passed)
            .map(|check| check.check.as_str())
            .collect()
    }
}

/// Evaluates ordered quality checks against a session.
#[derive(Debug, Clone, Copy)]
pub struct QualityGate {
    sample_limit: usize,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self {
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }
}

impl QualityGate {
    /// Creates a gate with an explicit violating-row sample limit.
    #[must_use]
    pub fn with_sample_limit(sample_limit: usize) -> Self {
        Self { sample_limit }
    }

    /// Runs every check and aggregates the verdicts.
    ///
    /// Infallible by design: execution errors become failing checks.
    pub async fn evaluate(
        &self,
        session: &Session,
        checks: &[QualityCheckDefinition],
    ) -> GateResult {
        let mut result = GateResult::default();
        for check in checks {
            let outcome = match session.query(&check.sql).await {
                Ok(batches) => {
                    let violating_rows = parquet_io::row_count(&batches);
                    if violating_rows == 0 {
                        tracing::info!(check = %check.name, "quality check passed");
                        CheckOutcome {
                            check: check.name.clone(),
                            passed: true,
                            violating_rows: 0,
                            sample: Vec::new(),
                            error: None,
                        }
                    } else {
                        tracing::error!(
                            check = %check.name,
                            violating_rows,
                            "quality check failed"
                        );
                        CheckOutcome {
                            check: check.name.clone(),
                            passed: false,
                            violating_rows,
                            sample: sample_rows(&batches, self.sample_limit),
                            error: None,
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(check = %check.name, error = %e, "quality check failed to execute");
                    CheckOutcome {
                        check: check.name.clone(),
                        passed: false,
                        violating_rows: 0,
                        sample: Vec::new(),
                        error: Some(e.to_string()),
                    }
                }
            };
            result.checks.push(outcome);
        }
        result
    }
}

/// Serializes up to `limit` violating rows as JSON objects for the report.
fn sample_rows(batches: &[RecordBatch], limit: usize) -> Vec<serde_json::Value> {
    let Some(first) = batches.iter().find(|b| b.num_rows() > 0) else {
        return Vec::new();
    };
    let slice = first.slice(0, first.num_rows().min(limit));

    let mut writer = arrow::json::ArrayWriter::new(Vec::new());
    if writer.write(&slice).is_err() || writer.finish().is_err() {
        return Vec::new();
    }
    serde_json::from_slice(&writer.into_inner()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::StringArray;
    use arrow::datatypes::{DataType, Field, Schema};

    #[test]
    fn gate_result_requires_every_check_to_pass() {
        let mut result = GateResult::default();
        result.checks.push(CheckOutcome {
            check: "QUALITY_A".into(),
            passed: true,
            violating_rows: 0,
            sample: Vec::new(),
            error: None,
        });
        assert!(result.all_passed());

        result.checks.push(CheckOutcome {
            check: "QUALITY_B".into(),
            passed: false,
            violating_rows: 2,
            sample: Vec::new(),
            error: None,
        });
        assert!(!result.all_passed());
        assert_eq!(result.failed_checks(), vec!["QUALITY_B"]);
    }

    #[test]
    fn empty_gate_passes_vacuously() {
        assert!(GateResult::default().all_passed());
    }

    #[test]
    fn sample_rows_respects_limit() {
        let schema = Arc::new(Schema::new(vec![Field::new("name", DataType::Utf8, true)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(StringArray::from(vec!["a", "b", "c", "d"]))],
        )
        .unwrap();

        let sample = sample_rows(&[batch], 2);
        assert_eq!(sample.len(), 2);
        assert_eq!(sample[0]["name"], "a");
    }

    #[test]
    fn sample_rows_of_empty_result_is_empty() {
        assert!(sample_rows(&[], 5).is_empty());
    }
}
