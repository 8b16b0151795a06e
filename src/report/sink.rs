//! Report sinks: where run summaries go after a dispatch

use super::audit::AuditRecord;
use super::summary::{RunStatus, RunSummary};
use crate::Result;
use async_trait::async_trait;
use std::sync::Mutex;

/// Receives every run summary the dispatcher produces
///
/// Implementations decide whether to alert a human (see
/// [`RunSummary::should_notify`]) or write an audit row. A failing sink is
/// logged by the dispatcher and never affects the run.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    async fn deliver(&self, summary: &RunSummary) -> Result<()>;
}

/// Writes one structured log event per run
#[derive(Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl ReportSink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn deliver(&self, summary: &RunSummary) -> Result<()> {
        let record = AuditRecord::from_summary(summary);
        match summary.status {
            RunStatus::Success => tracing::info!(
                trigger = %record.trigger_name,
                applied = summary.counts.applied,
                repaired = summary.counts.repaired,
                skipped = summary.counts.skipped,
                "{}",
                record.details
            ),
            RunStatus::Warning => {
                for outcome in &summary.failed {
                    tracing::warn!(
                        trigger = %record.trigger_name,
                        channel = %outcome.channel_name,
                        action = %outcome.action,
                        error = outcome.error.as_deref().unwrap_or(""),
                        "Channel not reconciled"
                    );
                }
                tracing::warn!(trigger = %record.trigger_name, "{}", record.details);
            }
        }
        Ok(())
    }
}

/// Keeps every summary in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    summaries: Mutex<Vec<RunSummary>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summaries received so far, oldest first
    pub fn summaries(&self) -> Vec<RunSummary> {
        self.summaries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.summaries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn deliver(&self, summary: &RunSummary) -> Result<()> {
        self.summaries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(summary.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::TriggerKind;
    use crate::reconcile::{ReconciliationResult, ReconciliationRun};

    fn sample() -> RunSummary {
        let mut builder = ReconciliationRun::builder(TriggerKind::Startup);
        builder.push(ReconciliationResult::applied("mute_only"));
        builder.push(ReconciliationResult::error("readonly", "HTTP error on #readonly: 503"));
        RunSummary::from_run(builder.seal())
    }

    #[tokio::test]
    async fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.deliver(&sample()).await.unwrap();
        sink.deliver(&sample()).await.unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.summaries()[0].trigger, TriggerKind::Startup);
    }

    #[tokio::test]
    async fn test_tracing_sink_never_fails() {
        crate::logging::init_test();
        assert!(TracingSink.deliver(&sample()).await.is_ok());
    }
}
