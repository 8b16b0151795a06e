//! Trigger events
//!
//! Every external stimulus reaches the reconciler as one [`Trigger`] value on
//! the event bus. The platform binding translates its own callbacks into
//! these; the scheduler produces `ScheduledTick`.

use crate::platform::{ChannelRef, GuildId, RoleRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What started a reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Startup,
    Manual,
    ScheduledTick,
    ChannelCreated,
    ChannelUpdated,
    RoleUpdated,
}

impl TriggerKind {
    /// Human-readable label carried into reports
    pub fn label(&self) -> &'static str {
        match self {
            TriggerKind::Startup => "Startup",
            TriggerKind::Manual => "Manual",
            TriggerKind::ScheduledTick => "Daily Task",
            TriggerKind::ChannelCreated => "Channel Created",
            TriggerKind::ChannelUpdated => "Self-Heal (Channel Update)",
            TriggerKind::RoleUpdated => "Self-Heal (Role Update)",
        }
    }

    /// Stable snake_case name, used as a metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Startup => "startup",
            TriggerKind::Manual => "manual",
            TriggerKind::ScheduledTick => "scheduled_tick",
            TriggerKind::ChannelCreated => "channel_created",
            TriggerKind::ChannelUpdated => "channel_updated",
            TriggerKind::RoleUpdated => "role_updated",
        }
    }

    /// Drift-driven triggers repair conditionally instead of applying
    pub fn is_drift(&self) -> bool {
        matches!(self, TriggerKind::ChannelUpdated | TriggerKind::RoleUpdated)
    }

    /// Whether the trigger covers every managed channel
    pub fn is_batch(&self) -> bool {
        !matches!(
            self,
            TriggerKind::ChannelCreated | TriggerKind::ChannelUpdated
        )
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An event on the reconciler's bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Process start
    Startup { guild: GuildId },
    /// Operator-requested full pass
    Manual { guild: GuildId },
    /// Fixed-time schedule tick
    ScheduledTick { guild: GuildId },
    /// A channel was created
    ChannelCreated { channel: ChannelRef },
    /// A channel's permission overrides changed
    ChannelUpdated { channel: ChannelRef },
    /// A role definition changed
    RoleUpdated { guild: GuildId, role: RoleRef },
}

impl Trigger {
    pub fn kind(&self) -> TriggerKind {
        match self {
            Trigger::Startup { .. } => TriggerKind::Startup,
            Trigger::Manual { .. } => TriggerKind::Manual,
            Trigger::ScheduledTick { .. } => TriggerKind::ScheduledTick,
            Trigger::ChannelCreated { .. } => TriggerKind::ChannelCreated,
            Trigger::ChannelUpdated { .. } => TriggerKind::ChannelUpdated,
            Trigger::RoleUpdated { .. } => TriggerKind::RoleUpdated,
        }
    }

    /// Guild the event belongs to
    pub fn guild(&self) -> GuildId {
        match self {
            Trigger::Startup { guild }
            | Trigger::Manual { guild }
            | Trigger::ScheduledTick { guild }
            | Trigger::RoleUpdated { guild, .. } => *guild,
            Trigger::ChannelCreated { channel } | Trigger::ChannelUpdated { channel } => {
                channel.guild
            }
        }
    }
}
