//! Platform seam
//!
//! The reconciler never holds a global client. Everything it needs from the
//! collaboration platform goes through the narrow [`Platform`] trait, which
//! the binding implements and injects as an `Arc`.
//!
//! Channel and role references are capability handles supplied by the binding
//! for the duration of one call; the core does not cache them.

pub mod ids;
pub mod memory;

pub use ids::{ChannelId, GuildId, RoleId};
pub use memory::InMemoryPlatform;

use crate::policy::PermissionProfile;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by the platform binding for a single call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The acting credential lacks the right to perform the call
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The request failed at the network or protocol layer
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Kind of a platform channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Text,
    Voice,
    Category,
    Other,
}

/// Handle to a live channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
    pub guild: GuildId,
}

impl ChannelRef {
    /// Create a handle for a text channel
    pub fn text(guild: GuildId, id: ChannelId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: ChannelKind::Text,
            guild,
        }
    }

    /// Set the channel kind
    pub fn with_kind(mut self, kind: ChannelKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_text(&self) -> bool {
        self.kind == ChannelKind::Text
    }
}

/// Handle to a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRef {
    pub id: RoleId,
    pub name: String,
}

impl RoleRef {
    pub fn new(id: RoleId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// The guild's default (@everyone) role
    pub fn everyone(guild: GuildId) -> Self {
        Self::new(RoleId::everyone(guild), "@everyone")
    }
}

/// Narrow platform access consumed by the engine and dispatcher
#[async_trait]
pub trait Platform: Send + Sync {
    /// Find a text channel of `guild` by exact name
    async fn resolve_channel_by_name(
        &self,
        guild: GuildId,
        name: &str,
    ) -> Result<Option<ChannelRef>, PlatformError>;

    /// Read the live override for `role` on `channel`
    async fn current_override(
        &self,
        channel: &ChannelRef,
        role: &RoleRef,
    ) -> Result<PermissionProfile, PlatformError>;

    /// Write the override for `role` on `channel`
    ///
    /// Flags unset in `profile` must be left untouched on the live override.
    async fn set_override(
        &self,
        channel: &ChannelRef,
        role: &RoleRef,
        profile: &PermissionProfile,
    ) -> Result<(), PlatformError>;

    /// The guild's default (open) role
    async fn default_role(&self, guild: GuildId) -> RoleRef;
}
