//! Run summaries handed to notification and audit collaborators

use crate::dispatch::TriggerKind;
use crate::policy::PermissionFlag;
use crate::reconcile::{Action, ReconciliationResult, ReconciliationRun};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every channel succeeded
    Success,
    /// At least one channel failed or was missing
    Warning,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Warning => "warning",
        }
    }
}

/// One channel's line in a summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOutcome {
    pub channel_name: String,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drift: Vec<PermissionFlag>,
}

impl From<&ReconciliationResult> for ChannelOutcome {
    fn from(result: &ReconciliationResult) -> Self {
        Self {
            channel_name: result.channel_name().to_string(),
            action: result.action(),
            error: result.error_message().map(String::from),
            drift: result.drift().to_vec(),
        }
    }
}

/// Number of channels per action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounts {
    pub applied: usize,
    pub repaired: usize,
    pub skipped: usize,
    pub not_found: usize,
    pub error: usize,
}

impl ActionCounts {
    fn record(&mut self, action: Action) {
        match action {
            Action::Applied => self.applied += 1,
            Action::Repaired => self.repaired += 1,
            Action::Skipped => self.skipped += 1,
            Action::NotFound => self.not_found += 1,
            Action::Error => self.error += 1,
        }
    }
}

/// Platform-neutral summary of one reconciliation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub trigger: TriggerKind,
    pub trigger_label: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub status: RunStatus,
    /// Successful outcomes, in processing order
    pub succeeded: Vec<ChannelOutcome>,
    /// Failed and missing channels, in processing order
    pub failed: Vec<ChannelOutcome>,
    pub counts: ActionCounts,
}

impl RunSummary {
    /// Partition a sealed run into its summary
    pub fn from_run(run: ReconciliationRun) -> Self {
        let trigger = run.trigger();
        let started_at = run.started_at();
        let completed_at = run.completed_at();

        let mut counts = ActionCounts::default();
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();

        for result in run.results() {
            counts.record(result.action());
            let outcome = ChannelOutcome::from(result);
            if result.success() {
                succeeded.push(outcome);
            } else {
                failed.push(outcome);
            }
        }

        let status = if failed.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::Warning
        };

        Self {
            trigger,
            trigger_label: trigger.label().to_string(),
            started_at,
            completed_at,
            status,
            succeeded,
            failed,
            counts,
        }
    }

    /// Total channels covered by the run
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn error_count(&self) -> usize {
        self.failed.len()
    }

    /// Outcomes worth showing a human
    ///
    /// Drift-triggered runs only surface repairs and failures; untouched
    /// channels would be noise. Other runs surface everything.
    pub fn notable_outcomes(&self) -> Vec<&ChannelOutcome> {
        let all = self.succeeded.iter().chain(self.failed.iter());
        if self.trigger.is_drift() {
            all.filter(|o| matches!(o.action, Action::Repaired | Action::Error))
                .collect()
        } else {
            all.collect()
        }
    }

    /// Whether a notification sink should alert a human about this run
    ///
    /// Full applies and channel creation always report, even when no managed
    /// channel exists. Drift-triggered runs report only when something was
    /// repaired or failed.
    pub fn should_notify(&self) -> bool {
        if self.trigger.is_drift() {
            !self.notable_outcomes().is_empty()
        } else {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_of(trigger: TriggerKind, results: Vec<ReconciliationResult>) -> RunSummary {
        let mut builder = ReconciliationRun::builder(trigger);
        builder.extend(results);
        RunSummary::from_run(builder.seal())
    }

    #[test]
    fn test_all_success() {
        let summary = summary_of(
            TriggerKind::Startup,
            vec![
                ReconciliationResult::applied("a"),
                ReconciliationResult::applied("b"),
            ],
        );
        assert_eq!(summary.status, RunStatus::Success);
        assert_eq!(summary.success_count(), 2);
        assert_eq!(summary.counts.applied, 2);
        assert_eq!(summary.trigger_label, "Startup");
    }

    #[test]
    fn test_not_found_is_warning() {
        let summary = summary_of(
            TriggerKind::ScheduledTick,
            vec![
                ReconciliationResult::applied("mute_only"),
                ReconciliationResult::not_found("readonly"),
            ],
        );
        assert_eq!(summary.status, RunStatus::Warning);
        assert_eq!(summary.failed[0].channel_name, "readonly");
        assert_eq!(summary.failed[0].error.as_deref(), Some("Channel not found"));
        assert_eq!(summary.counts.not_found, 1);
    }

    #[test]
    fn test_empty_run() {
        let summary = summary_of(TriggerKind::Manual, vec![]);
        assert!(summary.is_empty());
        assert_eq!(summary.status, RunStatus::Success);
        assert!(summary.should_notify());
    }

    #[test]
    fn test_drift_run_with_only_skips_is_quiet() {
        let summary = summary_of(
            TriggerKind::RoleUpdated,
            vec![
                ReconciliationResult::skipped("a"),
                ReconciliationResult::not_found("b"),
            ],
        );
        assert!(summary.notable_outcomes().is_empty());
        assert!(!summary.should_notify());
        // The missing channel still makes the run a warning.
        assert_eq!(summary.status, RunStatus::Warning);
    }

    #[test]
    fn test_drift_run_surfaces_repairs_and_errors() {
        let summary = summary_of(
            TriggerKind::RoleUpdated,
            vec![
                ReconciliationResult::skipped("a"),
                ReconciliationResult::repaired("b", vec![PermissionFlag::Send]),
                ReconciliationResult::error("c", "Missing permissions to repair #c"),
            ],
        );
        let notable: Vec<&str> = summary
            .notable_outcomes()
            .iter()
            .map(|o| o.channel_name.as_str())
            .collect();
        assert_eq!(notable, vec!["b", "c"]);
        assert!(summary.should_notify());
    }

    #[test]
    fn test_summary_serializes() {
        let summary = summary_of(
            TriggerKind::ChannelCreated,
            vec![ReconciliationResult::applied("a")],
        );
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["trigger"], "channel_created");
        assert_eq!(json["succeeded"][0]["action"], "applied");
    }
}
