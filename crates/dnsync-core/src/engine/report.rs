//! Run report
//!
//! Every run that gets past the fetch phase produces a [`Report`]. A run that
//! aborts earlier returns an error instead.

use serde::Serialize;
use std::net::IpAddr;

/// A single provider mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    Create { address: IpAddr },
    Delete { record_id: String, address: IpAddr },
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create { address } => write!(f, "create {}", address),
            Operation::Delete { record_id, address } => {
                write!(f, "delete {} (id {})", address, record_id)
            }
        }
    }
}

/// An operation that did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationFailure {
    pub operation: Operation,
    pub cause: String,
    pub attempts: usize,
}

/// An operation the engine deliberately did not complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedOperation {
    pub operation: Operation,
    pub reason: String,
}

/// Overall outcome of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every planned operation succeeded
    Converged,
    /// The run completed but at least one operation failed
    Degraded,
}

/// Summary of one reconciliation run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub provider: String,
    pub zone: String,
    pub record_name: String,
    /// Size of the desired address set
    pub desired: usize,
    pub created: usize,
    pub deleted: usize,
    /// Records already in place
    pub unchanged: usize,
    /// Deletes the provider reported as already gone, or held back
    pub skipped: usize,
    pub skips: Vec<SkippedOperation>,
    pub failed: usize,
    pub failures: Vec<OperationFailure>,
    pub status: RunStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

impl Report {
    pub(crate) fn start(provider: &str, zone: &str, record_name: &str, desired: usize) -> Self {
        let now = chrono::Utc::now();
        Self {
            provider: provider.to_string(),
            zone: zone.to_string(),
            record_name: record_name.to_string(),
            desired,
            created: 0,
            deleted: 0,
            unchanged: 0,
            skipped: 0,
            skips: Vec::new(),
            failed: 0,
            failures: Vec::new(),
            status: RunStatus::Converged,
            started_at: now,
            finished_at: now,
        }
    }

    pub(crate) fn record_failure(&mut self, operation: Operation, cause: String, attempts: usize) {
        self.failed += 1;
        self.failures.push(OperationFailure {
            operation,
            cause,
            attempts,
        });
    }

    pub(crate) fn record_skip(&mut self, operation: Operation, reason: impl Into<String>) {
        self.skipped += 1;
        self.skips.push(SkippedOperation {
            operation,
            reason: reason.into(),
        });
    }

    pub(crate) fn finish(mut self) -> Self {
        self.status = if self.failed > 0 {
            RunStatus::Degraded
        } else {
            RunStatus::Converged
        };
        self.finished_at = chrono::Utc::now();
        self
    }

    /// Total create + delete operations that changed the zone
    pub fn mutations(&self) -> usize {
        self.created + self.deleted
    }

    pub fn is_converged(&self) -> bool {
        self.status == RunStatus::Converged
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Reconciled {} in zone {} via {} ({} desired address(es))",
            self.record_name, self.zone, self.provider, self.desired
        )?;
        writeln!(
            f,
            "  created: {}  deleted: {}  unchanged: {}  skipped: {}  failed: {}",
            self.created, self.deleted, self.unchanged, self.skipped, self.failed
        )?;
        for failure in &self.failures {
            writeln!(
                f,
                "  FAILED {}: {} [{} attempt(s)]",
                failure.operation, failure.cause, failure.attempts
            )?;
        }
        for skip in &self.skips {
            writeln!(f, "  SKIPPED {}: {}", skip.operation, skip.reason)?;
        }
        let elapsed = self.finished_at - self.started_at;
        match self.status {
            RunStatus::Converged => write!(
                f,
                "Status: converged in {} ms",
                elapsed.num_milliseconds()
            ),
            RunStatus::Degraded => write!(
                f,
                "Status: DEGRADED ({} operation(s) failed)",
                self.failed
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_follows_failures() {
        let report = Report::start("memory", "example.com", "edge.example.com", 1).finish();
        assert_eq!(report.status, RunStatus::Converged);

        let mut report = Report::start("memory", "example.com", "edge.example.com", 1);
        report.record_failure(
            Operation::Create {
                address: "10.0.0.1".parse().unwrap(),
            },
            "Quota exceeded: full".to_string(),
            1,
        );
        let report = report.finish();
        assert_eq!(report.status, RunStatus::Degraded);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn test_display_itemizes_failures() {
        let mut report = Report::start("memory", "example.com", "edge.example.com", 2);
        report.created = 1;
        report.record_failure(
            Operation::Delete {
                record_id: "7".to_string(),
                address: "10.0.0.7".parse().unwrap(),
            },
            "Network error: reset".to_string(),
            3,
        );
        let text = report.finish().to_string();

        assert!(text.contains("created: 1"));
        assert!(text.contains("FAILED delete 10.0.0.7 (id 7)"));
        assert!(text.contains("DEGRADED"));
    }

    #[test]
    fn test_skips_are_itemized() {
        let mut report = Report::start("memory", "example.com", "edge.example.com", 1);
        report.record_skip(
            Operation::Delete {
                record_id: "9".to_string(),
                address: "10.0.0.9".parse().unwrap(),
            },
            "already gone",
        );
        let report = report.finish();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.status, RunStatus::Converged);
        assert!(report.to_string().contains("SKIPPED delete 10.0.0.9 (id 9): already gone"));
    }

    #[test]
    fn test_json_shape() {
        let report = Report::start("memory", "example.com", "edge.example.com", 0).finish();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "converged");
        assert_eq!(json["failed"], 0);
        assert!(json["started_at"].is_string());
    }
}
