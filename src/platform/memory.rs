//! In-memory platform binding
//!
//! Holds channels and overrides in process memory. Useful for dry runs and as
//! the fake platform in tests: individual channels can be made to reject
//! writes, every call is counted, and the highest number of overlapping
//! writes to one channel is recorded.

use super::{ChannelId, ChannelRef, GuildId, Platform, PlatformError, RoleId, RoleRef};
use crate::policy::PermissionProfile;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Injected failure for a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    Forbidden,
    Transport,
}

#[derive(Debug, Default)]
struct State {
    channels: Vec<ChannelRef>,
    overrides: HashMap<(ChannelId, RoleId), PermissionProfile>,
    write_faults: HashMap<ChannelId, Fault>,
    read_faults: HashSet<ChannelId>,
    writes: Vec<(ChannelId, PermissionProfile)>,
    lookups: usize,
    reads: usize,
    in_flight: HashMap<ChannelId, usize>,
    max_same_channel_overlap: usize,
}

/// Platform binding backed by process memory
#[derive(Debug)]
pub struct InMemoryPlatform {
    state: Mutex<State>,
    next_id: AtomicU64,
    write_delay: Option<Duration>,
}

impl InMemoryPlatform {
    /// Create an empty platform
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            next_id: AtomicU64::new(1000),
            write_delay: None,
        }
    }

    /// Make every write take `delay`, so overlapping writes become observable
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a text channel and return its handle
    pub fn add_text_channel(&self, guild: GuildId, name: &str) -> ChannelRef {
        let id = ChannelId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let channel = ChannelRef::text(guild, id, name);
        self.add_channel(channel.clone());
        channel
    }

    /// Add a channel handle as-is
    pub fn add_channel(&self, channel: ChannelRef) {
        self.state().channels.push(channel);
    }

    /// Remove a channel and its overrides
    pub fn remove_channel(&self, id: ChannelId) {
        let mut state = self.state();
        state.channels.retain(|c| c.id != id);
        state.overrides.retain(|(channel, _), _| *channel != id);
    }

    /// Replace the live override, as an external user would
    pub fn set_live_override(
        &self,
        channel: &ChannelRef,
        role: &RoleRef,
        profile: PermissionProfile,
    ) {
        self.state().overrides.insert((channel.id, role.id), profile);
    }

    /// Current live override (unset if none)
    pub fn live_override(&self, channel: &ChannelRef, role: &RoleRef) -> PermissionProfile {
        self.state()
            .overrides
            .get(&(channel.id, role.id))
            .copied()
            .unwrap_or_default()
    }

    /// Reject every write to `channel` as forbidden
    pub fn forbid_writes(&self, channel: ChannelId) {
        self.state().write_faults.insert(channel, Fault::Forbidden);
    }

    /// Fail every write to `channel` at transport level
    pub fn fail_writes(&self, channel: ChannelId) {
        self.state().write_faults.insert(channel, Fault::Transport);
    }

    /// Fail every override read on `channel` at transport level
    pub fn fail_reads(&self, channel: ChannelId) {
        self.state().read_faults.insert(channel);
    }

    /// Clear all injected faults
    pub fn clear_faults(&self) {
        let mut state = self.state();
        state.write_faults.clear();
        state.read_faults.clear();
    }

    /// Number of successful writes
    pub fn write_count(&self) -> usize {
        self.state().writes.len()
    }

    /// Successful writes to one channel, oldest first
    pub fn writes_to(&self, channel: ChannelId) -> Vec<PermissionProfile> {
        self.state()
            .writes
            .iter()
            .filter(|(id, _)| *id == channel)
            .map(|(_, profile)| *profile)
            .collect()
    }

    /// Total platform calls of any kind
    pub fn call_count(&self) -> usize {
        let state = self.state();
        state.lookups + state.reads + state.writes.len()
    }

    /// Highest number of writes to a single channel that were ever in flight together
    pub fn max_same_channel_overlap(&self) -> usize {
        self.state().max_same_channel_overlap
    }
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Platform for InMemoryPlatform {
    async fn resolve_channel_by_name(
        &self,
        guild: GuildId,
        name: &str,
    ) -> Result<Option<ChannelRef>, PlatformError> {
        let mut state = self.state();
        state.lookups += 1;
        Ok(state
            .channels
            .iter()
            .find(|c| c.guild == guild && c.is_text() && c.name == name)
            .cloned())
    }

    async fn current_override(
        &self,
        channel: &ChannelRef,
        role: &RoleRef,
    ) -> Result<PermissionProfile, PlatformError> {
        let mut state = self.state();
        state.reads += 1;
        if state.read_faults.contains(&channel.id) {
            return Err(PlatformError::Transport("connection reset".to_string()));
        }
        Ok(state
            .overrides
            .get(&(channel.id, role.id))
            .copied()
            .unwrap_or_default())
    }

    async fn set_override(
        &self,
        channel: &ChannelRef,
        role: &RoleRef,
        profile: &PermissionProfile,
    ) -> Result<(), PlatformError> {
        {
            let mut state = self.state();
            match state.write_faults.get(&channel.id) {
                Some(Fault::Forbidden) => {
                    return Err(PlatformError::Forbidden("Missing Permissions".to_string()))
                }
                Some(Fault::Transport) => {
                    return Err(PlatformError::Transport(
                        "503 Service Unavailable".to_string(),
                    ))
                }
                None => {}
            }
            if !state.channels.iter().any(|c| c.id == channel.id) {
                return Err(PlatformError::Transport("404 Unknown Channel".to_string()));
            }
            let in_flight = state.in_flight.entry(channel.id).or_insert(0);
            *in_flight += 1;
            let overlap = *in_flight;
            state.max_same_channel_overlap = state.max_same_channel_overlap.max(overlap);
        }

        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if let Some(in_flight) = state.in_flight.get_mut(&channel.id) {
            *in_flight -= 1;
        }
        let key = (channel.id, role.id);
        let merged = state
            .overrides
            .get(&key)
            .copied()
            .unwrap_or_default()
            .overlay(profile);
        state.overrides.insert(key, merged);
        state.writes.push((channel.id, *profile));
        Ok(())
    }

    async fn default_role(&self, guild: GuildId) -> RoleRef {
        RoleRef::everyone(guild)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ChannelKind;
    use crate::policy::PermissionFlag;

    #[tokio::test]
    async fn test_resolve_text_channels_only() {
        let platform = InMemoryPlatform::new();
        let guild = GuildId::new(1);
        platform.add_text_channel(guild, "general");
        platform.add_channel(
            ChannelRef::text(guild, ChannelId::new(5), "lounge")
                .with_kind(ChannelKind::Voice),
        );

        assert!(platform
            .resolve_channel_by_name(guild, "general")
            .await
            .unwrap()
            .is_some());
        assert!(platform
            .resolve_channel_by_name(guild, "lounge")
            .await
            .unwrap()
            .is_none());
        assert!(platform
            .resolve_channel_by_name(GuildId::new(2), "general")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_write_leaves_unset_flags_untouched() {
        let platform = InMemoryPlatform::new();
        let guild = GuildId::new(1);
        let channel = platform.add_text_channel(guild, "general");
        let role = RoleRef::everyone(guild);

        platform.set_live_override(
            &channel,
            &role,
            PermissionProfile::unset().with(PermissionFlag::AttachFiles, Some(false)),
        );
        platform
            .set_override(&channel, &role, &PermissionProfile::SEND_DENIED)
            .await
            .unwrap();

        let live = platform.live_override(&channel, &role);
        assert_eq!(live.attach_files, Some(false));
        assert_eq!(live.send, Some(false));
        assert_eq!(platform.write_count(), 1);
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let platform = InMemoryPlatform::new();
        let guild = GuildId::new(1);
        let channel = platform.add_text_channel(guild, "general");
        let role = RoleRef::everyone(guild);

        platform.forbid_writes(channel.id);
        let err = platform
            .set_override(&channel, &role, &PermissionProfile::SEND_ALLOWED)
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::Forbidden(_)));

        platform.clear_faults();
        platform.fail_reads(channel.id);
        assert!(platform.current_override(&channel, &role).await.is_err());
        assert_eq!(platform.write_count(), 0);
    }

    #[tokio::test]
    async fn test_write_to_removed_channel_fails() {
        let platform = InMemoryPlatform::new();
        let guild = GuildId::new(1);
        let channel = platform.add_text_channel(guild, "general");
        platform.remove_channel(channel.id);

        let result = platform
            .set_override(&channel, &RoleRef::everyone(guild), &PermissionProfile::SEND_ALLOWED)
            .await;
        assert!(matches!(result, Err(PlatformError::Transport(_))));
    }
}
