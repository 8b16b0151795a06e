//! Type-safe ID wrappers for platform objects

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type-safe wrapper for guild (server) IDs
///
/// Prevents mixing up guild IDs with channel or role IDs at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuildId(u64);

/// Type-safe wrapper for channel IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(u64);

/// Type-safe wrapper for role IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(u64);

macro_rules! snowflake_id {
    ($name:ident) => {
        impl $name {
            /// Wrap a raw snowflake
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Get the underlying snowflake
            pub const fn get(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self::new(id)
            }
        }
    };
}

snowflake_id!(GuildId);
snowflake_id!(ChannelId);
snowflake_id!(RoleId);

impl RoleId {
    /// The default (@everyone) role shares its ID with the guild
    pub const fn everyone(guild: GuildId) -> Self {
        Self(guild.get())
    }
}
