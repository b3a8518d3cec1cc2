//! Per-item results and the aggregate batch report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Outcome of one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub target_id: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    /// HTTP status of the failing call, when the failure came from a response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
}

impl OperationResult {
    pub fn success(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            succeeded: true,
            error_detail: None,
            http_status: None,
        }
    }

    pub fn failure(target_id: impl Into<String>, error: &Error) -> Self {
        Self {
            target_id: target_id.into(),
            succeeded: false,
            error_detail: Some(error.to_string()),
            http_status: error.status(),
        }
    }
}

/// Ordered results of one batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub kind: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub results: Vec<OperationResult>,
}

impl BatchReport {
    /// Empty report stamped with a fresh run id
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            kind: kind.into(),
            started_at: Utc::now(),
            finished_at: None,
            results: Vec::new(),
        }
    }

    pub fn record(&mut self, result: OperationResult) {
        self.results.push(result);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// True when nothing failed (an empty batch counts)
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Failed results only, in input order
    pub fn failures(&self) -> impl Iterator<Item = &OperationResult> {
        self.results.iter().filter(|r| !r.succeeded)
    }

    /// e.g. `2 succeeded / 1 failed`
    pub fn summary(&self) -> String {
        format!("{} succeeded / {} failed", self.succeeded(), self.failed())
    }

    /// `Err(PartialBatchFailure)` if any item failed
    pub fn ensure_success(&self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(Error::PartialBatchFailure {
                failed: self.failed(),
                total: self.total(),
            })
        }
    }

    /// Report plus derived counts, for `--json` output
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "run_id": self.run_id,
            "kind": self.kind,
            "started_at": self.started_at,
            "finished_at": self.finished_at,
            "succeeded": self.succeeded(),
            "failed": self.failed(),
            "results": self.results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report() {
        let report = BatchReport::new("ci-update");
        assert_eq!(report.total(), 0);
        assert_eq!(report.summary(), "0 succeeded / 0 failed");
        assert!(report.is_success());
        assert!(report.ensure_success().is_ok());
    }

    #[test]
    fn test_counts_and_partial_failure() {
        let mut report = BatchReport::new("ci-update");
        report.record(OperationResult::success("CI001"));
        report.record(OperationResult::failure("CI002", &Error::NotFound("/api/v3/cmdb/ci/CI002".into())));
        report.finish();

        assert_eq!(report.summary(), "1 succeeded / 1 failed");
        assert!(report.finished_at.is_some());

        let failed: Vec<_> = report.failures().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].http_status, Some(404));

        match report.ensure_success() {
            Err(Error::PartialBatchFailure { failed, total }) => {
                assert_eq!((failed, total), (1, 2));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_json_shape() {
        let mut report = BatchReport::new("user-conversion");
        report.record(OperationResult::success("USER001"));

        let json = report.to_json();
        assert_eq!(json["succeeded"], 1);
        assert_eq!(json["failed"], 0);
        assert_eq!(json["results"][0]["target_id"], "USER001");
        assert!(json["results"][0].get("error_detail").is_none());
    }
}
