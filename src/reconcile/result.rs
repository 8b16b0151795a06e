//! Per-channel outcomes and the run that collects them

use crate::dispatch::TriggerKind;
use crate::policy::PermissionFlag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Unconditional write succeeded
    Applied,
    /// Drift was found and the write succeeded
    Repaired,
    /// Live state already matched; nothing written
    Skipped,
    /// No live channel with the managed name
    NotFound,
    /// The platform rejected or failed the call
    Error,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Applied => "applied",
            Action::Repaired => "repaired",
            Action::Skipped => "skipped",
            Action::NotFound => "not_found",
            Action::Error => "error",
        }
    }

    /// Whether this action counts as a success
    pub fn is_success(&self) -> bool {
        matches!(self, Action::Applied | Action::Repaired | Action::Skipped)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of reconciling one channel
///
/// Built once through the constructors below and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    channel_name: String,
    success: bool,
    action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    drift: Vec<PermissionFlag>,
}

impl ReconciliationResult {
    fn new(channel_name: impl Into<String>, action: Action) -> Self {
        Self {
            channel_name: channel_name.into(),
            success: action.is_success(),
            action,
            error: None,
            drift: Vec::new(),
        }
    }

    pub fn applied(channel_name: impl Into<String>) -> Self {
        Self::new(channel_name, Action::Applied)
    }

    /// A successful repair, with the flags that had drifted
    pub fn repaired(channel_name: impl Into<String>, drift: Vec<PermissionFlag>) -> Self {
        Self {
            drift,
            ..Self::new(channel_name, Action::Repaired)
        }
    }

    pub fn skipped(channel_name: impl Into<String>) -> Self {
        Self::new(channel_name, Action::Skipped)
    }

    pub fn not_found(channel_name: impl Into<String>) -> Self {
        Self {
            error: Some("Channel not found".to_string()),
            ..Self::new(channel_name, Action::NotFound)
        }
    }

    pub fn error(channel_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::new(channel_name, Action::Error)
        }
    }

    /// A failed repair keeps the drift it was trying to fix
    pub fn repair_failed(
        channel_name: impl Into<String>,
        message: impl Into<String>,
        drift: Vec<PermissionFlag>,
    ) -> Self {
        Self {
            drift,
            ..Self::error(channel_name, message)
        }
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Flags found drifted before a repair attempt
    pub fn drift(&self) -> &[PermissionFlag] {
        &self.drift
    }
}

/// One complete pass over a channel scope for a single trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationRun {
    trigger: TriggerKind,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    results: Vec<ReconciliationResult>,
}

impl ReconciliationRun {
    /// Open a run for `trigger`, stamped now
    pub fn builder(trigger: TriggerKind) -> RunBuilder {
        RunBuilder {
            trigger,
            started_at: Utc::now(),
            results: Vec::new(),
        }
    }

    pub fn trigger(&self) -> TriggerKind {
        self.trigger
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Results in processing order
    pub fn results(&self) -> &[ReconciliationResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<ReconciliationResult> {
        self.results
    }
}

/// A run that is still collecting results
#[derive(Debug)]
pub struct RunBuilder {
    trigger: TriggerKind,
    started_at: DateTime<Utc>,
    results: Vec<ReconciliationResult>,
}

impl RunBuilder {
    pub fn push(&mut self, result: ReconciliationResult) {
        self.results.push(result);
    }

    pub fn extend(&mut self, results: impl IntoIterator<Item = ReconciliationResult>) {
        self.results.extend(results);
    }

    /// Close the run once every channel operation has completed
    pub fn seal(self) -> ReconciliationRun {
        ReconciliationRun {
            trigger: self.trigger,
            started_at: self.started_at,
            completed_at: Utc::now(),
            results: self.results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_follows_action() {
        assert!(ReconciliationResult::applied("a").success());
        assert!(ReconciliationResult::skipped("a").success());
        assert!(ReconciliationResult::repaired("a", vec![PermissionFlag::Send]).success());
        assert!(!ReconciliationResult::not_found("a").success());
        assert!(!ReconciliationResult::error("a", "boom").success());
    }

    #[test]
    fn test_not_found_carries_message() {
        let result = ReconciliationResult::not_found("readonly");
        assert_eq!(result.action(), Action::NotFound);
        assert_eq!(result.error_message(), Some("Channel not found"));
        assert_eq!(result.channel_name(), "readonly");
    }

    #[test]
    fn test_repair_failed_keeps_drift() {
        let result =
            ReconciliationResult::repair_failed("a", "denied", vec![PermissionFlag::Send]);
        assert_eq!(result.action(), Action::Error);
        assert_eq!(result.drift(), &[PermissionFlag::Send]);
    }

    #[test]
    fn test_run_builder_keeps_order() {
        let mut builder = ReconciliationRun::builder(TriggerKind::Startup);
        builder.push(ReconciliationResult::applied("b"));
        builder.extend(vec![
            ReconciliationResult::applied("a"),
            ReconciliationResult::not_found("c"),
        ]);
        let run = builder.seal();

        let names: Vec<&str> = run.results().iter().map(|r| r.channel_name()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(run.trigger(), TriggerKind::Startup);
        assert!(run.completed_at() >= run.started_at());
    }

    #[test]
    fn test_action_serializes_snake_case() {
        let json = serde_json::to_string(&Action::NotFound).unwrap();
        assert_eq!(json, "\"not_found\"");
    }
}
