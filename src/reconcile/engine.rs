//! Reconciliation engine
//!
//! Applies or repairs the desired profile on one or many channels. Each
//! channel is handled on its own: a rejected or failed write becomes an
//! [`Action::Error`](super::Action::Error) result for that channel and the
//! rest of the batch carries on. None of the public operations return an
//! error.

use super::locks::ChannelLocks;
use super::result::ReconciliationResult;
use crate::metrics;
use crate::platform::{ChannelRef, GuildId, Platform, PlatformError, RoleRef};
use crate::policy::{drifted_flags, PermissionProfile, PolicyEntry, PolicyRegistry};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;

/// Default number of channels reconciled at once within a batch
pub const DEFAULT_MAX_CONCURRENT_WRITES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Apply,
    Repair,
}

/// Desired-state permission reconciler
pub struct ReconciliationEngine<P: Platform + ?Sized> {
    platform: Arc<P>,
    locks: Arc<ChannelLocks>,
    max_concurrent_writes: usize,
}

impl<P: Platform + ?Sized> Clone for ReconciliationEngine<P> {
    fn clone(&self) -> Self {
        Self {
            platform: self.platform.clone(),
            locks: self.locks.clone(),
            max_concurrent_writes: self.max_concurrent_writes,
        }
    }
}

impl<P: Platform + ?Sized> ReconciliationEngine<P> {
    /// Create an engine with its own lock table
    pub fn new(platform: Arc<P>) -> Self {
        Self {
            platform,
            locks: Arc::new(ChannelLocks::new()),
            max_concurrent_writes: DEFAULT_MAX_CONCURRENT_WRITES,
        }
    }

    /// Limit how many channels of one batch are processed at once
    pub fn with_max_concurrent_writes(mut self, max: usize) -> Self {
        self.max_concurrent_writes = max.max(1);
        self
    }

    /// Share a lock table with other engines writing to the same guild
    pub fn with_locks(mut self, locks: Arc<ChannelLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    pub fn locks(&self) -> &Arc<ChannelLocks> {
        &self.locks
    }

    /// Unconditionally write the desired profile to every managed channel
    ///
    /// Results follow registry order. Missing channels yield `NotFound`.
    pub async fn apply_all(
        &self,
        guild: GuildId,
        role: &RoleRef,
        policy: &PolicyRegistry,
    ) -> Vec<ReconciliationResult> {
        self.run_batch(guild, role, policy, Mode::Apply).await
    }

    /// Write only to managed channels whose live override has drifted
    pub async fn repair_all(
        &self,
        guild: GuildId,
        role: &RoleRef,
        policy: &PolicyRegistry,
    ) -> Vec<ReconciliationResult> {
        self.run_batch(guild, role, policy, Mode::Repair).await
    }

    async fn run_batch(
        &self,
        guild: GuildId,
        role: &RoleRef,
        policy: &PolicyRegistry,
        mode: Mode,
    ) -> Vec<ReconciliationResult> {
        // Entry futures own their inputs; the batch must stay Send when spawned.
        let pending: Vec<_> = policy
            .entries()
            .iter()
            .map(|entry| self.clone().reconcile_entry(guild, role.clone(), entry.clone(), mode))
            .collect();

        stream::iter(pending)
            .buffered(self.max_concurrent_writes)
            .collect()
            .await
    }

    async fn reconcile_entry(
        self,
        guild: GuildId,
        role: RoleRef,
        entry: PolicyEntry,
        mode: Mode,
    ) -> ReconciliationResult {
        let channel = match self.platform.resolve_channel_by_name(guild, &entry.name).await {
            Ok(Some(channel)) => channel,
            Ok(None) => {
                tracing::warn!(channel = %entry.name, guild = %guild, "Managed channel not found");
                return ReconciliationResult::not_found(&entry.name);
            }
            Err(e) => {
                tracing::warn!(channel = %entry.name, error = %e, "Channel lookup failed");
                return ReconciliationResult::error(
                    &entry.name,
                    format!("Failed to look up #{}: {}", entry.name, e),
                );
            }
        };

        let profile = entry.profile();
        match mode {
            Mode::Apply => self.apply_one(&channel, &role, &profile).await,
            Mode::Repair => self.repair_one(&channel, &role, &profile).await,
        }
    }

    /// Unconditionally write `profile` to one channel
    pub async fn apply_one(
        &self,
        channel: &ChannelRef,
        role: &RoleRef,
        profile: &PermissionProfile,
    ) -> ReconciliationResult {
        let _lease = self.locks.acquire(channel.id).await;

        match self.write(channel, role, profile).await {
            Ok(()) => {
                tracing::debug!(channel = %channel.name, role = %role.name, "Permissions applied");
                ReconciliationResult::applied(&channel.name)
            }
            Err(e) => {
                let message = match e {
                    PlatformError::Forbidden(_) => {
                        format!("Missing permissions to edit channel #{}", channel.name)
                    }
                    PlatformError::Transport(detail) => {
                        format!("HTTP error on #{}: {}", channel.name, detail)
                    }
                };
                tracing::warn!(channel = %channel.name, "{}", message);
                ReconciliationResult::error(&channel.name, message)
            }
        }
    }

    /// Compare one channel against `profile` and write only if it drifted
    pub async fn repair_one(
        &self,
        channel: &ChannelRef,
        role: &RoleRef,
        profile: &PermissionProfile,
    ) -> ReconciliationResult {
        // Held across read, compare and write so no other writer slips in between.
        let _lease = self.locks.acquire(channel.id).await;

        let live = match self.platform.current_override(channel, role).await {
            Ok(live) => live,
            Err(e) => {
                tracing::warn!(channel = %channel.name, error = %e, "Failed to read live override");
                return ReconciliationResult::error(
                    &channel.name,
                    format!("Failed to read permissions of #{}: {}", channel.name, e),
                );
            }
        };

        let drift = drifted_flags(&live, profile);
        if drift.is_empty() {
            tracing::debug!(channel = %channel.name, "Permissions match policy");
            return ReconciliationResult::skipped(&channel.name);
        }

        tracing::info!(
            channel = %channel.name,
            role = %role.name,
            drift = ?drift,
            "Repairing permissions"
        );

        match self.write(channel, role, profile).await {
            Ok(()) => ReconciliationResult::repaired(&channel.name, drift),
            Err(e) => {
                let message = match e {
                    PlatformError::Forbidden(_) => {
                        format!("Missing permissions to repair #{}", channel.name)
                    }
                    PlatformError::Transport(detail) => {
                        format!("HTTP error repairing #{}: {}", channel.name, detail)
                    }
                };
                tracing::warn!(channel = %channel.name, "{}", message);
                ReconciliationResult::repair_failed(&channel.name, message, drift)
            }
        }
    }

    async fn write(
        &self,
        channel: &ChannelRef,
        role: &RoleRef,
        profile: &PermissionProfile,
    ) -> Result<(), PlatformError> {
        let start = Instant::now();
        let outcome = self.platform.set_override(channel, role, profile).await;
        metrics::record_write(
            if outcome.is_ok() { "ok" } else { "failed" },
            start.elapsed().as_secs_f64(),
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::InMemoryPlatform;
    use crate::policy::PermissionFlag;
    use crate::reconcile::Action;

    const GUILD: GuildId = GuildId::new(1);

    fn setup() -> (Arc<InMemoryPlatform>, ReconciliationEngine<InMemoryPlatform>, RoleRef) {
        let platform = Arc::new(InMemoryPlatform::new());
        let engine = ReconciliationEngine::new(platform.clone());
        (platform, engine, RoleRef::everyone(GUILD))
    }

    #[tokio::test]
    async fn test_apply_one_writes_even_when_matching() {
        let (platform, engine, role) = setup();
        let channel = platform.add_text_channel(GUILD, "mute_only");
        platform.set_live_override(&channel, &role, PermissionProfile::SEND_ALLOWED);

        let result = engine
            .apply_one(&channel, &role, &PermissionProfile::SEND_ALLOWED)
            .await;

        assert_eq!(result.action(), Action::Applied);
        assert_eq!(platform.write_count(), 1);
    }

    #[tokio::test]
    async fn test_repair_one_skips_matching_channel() {
        let (platform, engine, role) = setup();
        let channel = platform.add_text_channel(GUILD, "mute_only");
        platform.set_live_override(&channel, &role, PermissionProfile::SEND_ALLOWED);

        let result = engine
            .repair_one(&channel, &role, &PermissionProfile::SEND_ALLOWED)
            .await;

        assert_eq!(result.action(), Action::Skipped);
        assert!(result.success());
        assert_eq!(platform.write_count(), 0);
    }

    #[tokio::test]
    async fn test_repair_one_fixes_drift() {
        let (platform, engine, role) = setup();
        let channel = platform.add_text_channel(GUILD, "readonly");
        platform.set_live_override(&channel, &role, PermissionProfile::SEND_ALLOWED);

        let result = engine
            .repair_one(&channel, &role, &PermissionProfile::SEND_DENIED)
            .await;

        assert_eq!(result.action(), Action::Repaired);
        assert_eq!(result.drift(), &[PermissionFlag::Send]);
        assert_eq!(
            platform.live_override(&channel, &role),
            PermissionProfile::SEND_DENIED
        );
    }

    #[tokio::test]
    async fn test_forbidden_apply_message() {
        let (platform, engine, role) = setup();
        let channel = platform.add_text_channel(GUILD, "restricted");
        platform.forbid_writes(channel.id);

        let result = engine
            .apply_one(&channel, &role, &PermissionProfile::SEND_ALLOWED)
            .await;

        assert!(!result.success());
        assert_eq!(result.action(), Action::Error);
        assert_eq!(
            result.error_message(),
            Some("Missing permissions to edit channel #restricted")
        );
    }

    #[tokio::test]
    async fn test_transport_repair_message() {
        let (platform, engine, role) = setup();
        let channel = platform.add_text_channel(GUILD, "broken");
        platform.fail_writes(channel.id);

        let result = engine
            .repair_one(&channel, &role, &PermissionProfile::SEND_DENIED)
            .await;

        assert_eq!(result.action(), Action::Error);
        let message = result.error_message().unwrap();
        assert!(message.starts_with("HTTP error repairing #broken"));
        assert!(!result.drift().is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_becomes_error_result() {
        let (platform, engine, role) = setup();
        let channel = platform.add_text_channel(GUILD, "flaky");
        platform.fail_reads(channel.id);

        let result = engine
            .repair_one(&channel, &role, &PermissionProfile::SEND_DENIED)
            .await;

        assert_eq!(result.action(), Action::Error);
        assert_eq!(platform.write_count(), 0);
    }

    #[tokio::test]
    async fn test_repair_all_reports_missing_channels() {
        let (platform, engine, role) = setup();
        platform.add_text_channel(GUILD, "mute_only");
        let policy = PolicyRegistry::new(&["mute_only"], &["readonly"]).unwrap();

        let results = engine.repair_all(GUILD, &role, &policy).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].action(), Action::Repaired);
        assert_eq!(results[1].action(), Action::NotFound);
    }

    #[tokio::test]
    async fn test_batch_preserves_registry_order_under_concurrency() {
        let platform = Arc::new(
            InMemoryPlatform::new().with_write_delay(std::time::Duration::from_millis(2)),
        );
        let engine = ReconciliationEngine::new(platform.clone()).with_max_concurrent_writes(8);
        let role = RoleRef::everyone(GUILD);
        let names = ["a", "b", "c", "d", "e", "f"];
        for name in names {
            platform.add_text_channel(GUILD, name);
        }
        let policy = PolicyRegistry::new(&names, &[] as &[&str]).unwrap();

        let results = engine.apply_all(GUILD, &role, &policy).await;

        let got: Vec<&str> = results.iter().map(|r| r.channel_name()).collect();
        assert_eq!(got, names);
    }

    #[tokio::test]
    async fn test_batch_runs_inside_spawned_task() {
        let platform = Arc::new(
            InMemoryPlatform::new().with_write_delay(std::time::Duration::from_millis(2)),
        );
        let engine = ReconciliationEngine::new(platform.clone()).with_max_concurrent_writes(2);
        platform.add_text_channel(GUILD, "mute_only");
        platform.add_text_channel(GUILD, "readonly");
        let policy = Arc::new(PolicyRegistry::new(&["mute_only"], &["readonly"]).unwrap());

        let handle = tokio::spawn(async move {
            let role = RoleRef::everyone(GUILD);
            engine.repair_all(GUILD, &role, &policy).await
        });
        let results = handle.await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.action() == Action::Repaired));
        assert_eq!(platform.write_count(), 2);
    }
}
