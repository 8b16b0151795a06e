//! Audit rows derived from run summaries
//!
//! The reconciler does not store anything; an audit collaborator turns each
//! [`AuditRecord`] into a row of its own schema.

use super::summary::{RunStatus, RunSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One audit row per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub trigger_name: String,
    pub executed_at: DateTime<Utc>,
    /// `SUCCESS` or `WARNING`
    pub status: String,
    /// `Success: N, Errors: M`
    pub details: String,
}

impl AuditRecord {
    pub fn from_summary(summary: &RunSummary) -> Self {
        let status = match summary.status {
            RunStatus::Success => "SUCCESS",
            RunStatus::Warning => "WARNING",
        };

        Self {
            trigger_name: summary.trigger_label.clone(),
            executed_at: summary.completed_at,
            status: status.to_string(),
            details: format!(
                "Success: {}, Errors: {}",
                summary.success_count(),
                summary.error_count()
            ),
        }
    }
}
