//! Trigger dispatcher
//!
//! Maps each [`Trigger`] to the matching engine operation, seals the run and
//! forwards its summary to the configured report sinks.

use super::trigger::{Trigger, TriggerKind};
use crate::metrics;
use crate::platform::{ChannelRef, GuildId, Platform, RoleRef};
use crate::policy::{PermissionProfile, PolicyRegistry};
use crate::reconcile::{ReconciliationEngine, ReconciliationResult, ReconciliationRun};
use crate::report::{ReportSink, RunSummary};
use std::sync::Arc;

/// Routes triggers to the reconciliation engine
pub struct Dispatcher<P: Platform + ?Sized> {
    engine: ReconciliationEngine<P>,
    policy: Arc<PolicyRegistry>,
    sinks: Vec<Arc<dyn ReportSink>>,
}

impl<P: Platform + ?Sized> Clone for Dispatcher<P> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            policy: self.policy.clone(),
            sinks: self.sinks.clone(),
        }
    }
}

impl<P: Platform + ?Sized> Dispatcher<P> {
    pub fn new(engine: ReconciliationEngine<P>, policy: Arc<PolicyRegistry>) -> Self {
        Self {
            engine,
            policy,
            sinks: Vec::new(),
        }
    }

    /// Add a sink that receives every run summary
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn engine(&self) -> &ReconciliationEngine<P> {
        &self.engine
    }

    pub fn policy(&self) -> &PolicyRegistry {
        &self.policy
    }

    /// Desired profile for a channel event, if the channel is managed
    ///
    /// Only text channels named in the registry are managed.
    pub fn managed_profile(&self, channel: &ChannelRef) -> Option<PermissionProfile> {
        if !channel.is_text() {
            return None;
        }
        self.policy.resolve(&channel.name)
    }

    /// Handle one trigger
    ///
    /// Returns `None` when the trigger concerns nothing this reconciler
    /// manages: an unmanaged or non-text channel, or a role other than the
    /// guild's default role. Otherwise the run is sealed, recorded and
    /// delivered to every sink before its summary is returned.
    pub async fn dispatch(&self, trigger: Trigger) -> Option<RunSummary> {
        let kind = trigger.kind();
        let mut run = ReconciliationRun::builder(kind);

        match trigger {
            Trigger::Startup { guild }
            | Trigger::Manual { guild }
            | Trigger::ScheduledTick { guild } => {
                tracing::info!(
                    trigger = %kind,
                    guild = %guild,
                    "Applying policy to all managed channels"
                );
                run.extend(self.apply_all(guild).await);
            }
            Trigger::ChannelCreated { channel } => {
                let profile = self.managed_or_ignore(kind, &channel)?;
                let role = self.engine.platform().default_role(channel.guild).await;
                tracing::info!(channel = %channel.name, "Managed channel created");
                run.push(self.engine.apply_one(&channel, &role, &profile).await);
            }
            Trigger::ChannelUpdated { channel } => {
                let profile = self.managed_or_ignore(kind, &channel)?;
                let role = self.engine.platform().default_role(channel.guild).await;
                run.push(self.engine.repair_one(&channel, &role, &profile).await);
            }
            Trigger::RoleUpdated { guild, role } => {
                let default_role = self.engine.platform().default_role(guild).await;
                if role.id != default_role.id {
                    tracing::debug!(role = %role.name, "Ignoring update of non-default role");
                    return None;
                }
                run.extend(self.repair_all(guild, &default_role).await);
            }
        }

        let summary = RunSummary::from_run(run.seal());
        self.record(&summary);
        self.deliver(&summary).await;
        Some(summary)
    }

    fn managed_or_ignore(
        &self,
        kind: TriggerKind,
        channel: &ChannelRef,
    ) -> Option<PermissionProfile> {
        let profile = self.managed_profile(channel);
        if profile.is_none() {
            tracing::trace!(trigger = %kind, channel = %channel.name, "Ignoring unmanaged channel");
        }
        profile
    }

    async fn apply_all(&self, guild: GuildId) -> Vec<ReconciliationResult> {
        let role = self.engine.platform().default_role(guild).await;
        self.engine.apply_all(guild, &role, &self.policy).await
    }

    async fn repair_all(&self, guild: GuildId, role: &RoleRef) -> Vec<ReconciliationResult> {
        self.engine.repair_all(guild, role, &self.policy).await
    }

    fn record(&self, summary: &RunSummary) {
        metrics::record_run(summary.trigger.as_str(), summary.status.as_str());
        for outcome in summary.succeeded.iter().chain(summary.failed.iter()) {
            metrics::record_outcome(outcome.action.as_str());
        }
    }

    async fn deliver(&self, summary: &RunSummary) {
        for sink in &self.sinks {
            if let Err(e) = sink.deliver(summary).await {
                tracing::warn!(sink = sink.name(), error = %e, "Report sink failed");
            }
        }
    }
}
