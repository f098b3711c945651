use serde::Serialize;
use storage::{SweepFailure, SweepReport};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct SweepFailureInfo {
    /// Object id or file name the failure relates to.
    pub target: String,
    pub error: String,
}

/// API view of a sweep pass outcome.
#[derive(Serialize, ToSchema)]
pub struct SweepReportResponse {
    pub removed: Vec<String>,
    pub skipped_recent: Vec<String>,
    pub failures: Vec<SweepFailureInfo>,
}

impl From<SweepReport> for SweepReportResponse {
    fn from(report: SweepReport) -> Self {
        SweepReportResponse {
            removed: report.removed,
            skipped_recent: report.skipped_recent,
            failures: report.failures.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<SweepFailure> for SweepFailureInfo {
    fn from(failure: SweepFailure) -> Self {
        SweepFailureInfo {
            target: failure.target,
            error: failure.error,
        }
    }
}
