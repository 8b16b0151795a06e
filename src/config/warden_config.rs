//! Channelwarden configuration file handling
//!
//! Loads and manages the ~/.config/channelwarden/config.yaml file.

use crate::platform::GuildId;
use crate::policy::PolicyRegistry;
use crate::reconcile::DEFAULT_MAX_CONCURRENT_WRITES;
use crate::warden::DailySchedule;
use crate::{Result, WardenError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Which channels get which profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Channels where the open role may post
    #[serde(default)]
    pub send_allowed: Vec<String>,

    /// Channels the open role may read but not post in
    #[serde(default)]
    pub send_denied: Vec<String>,
}

/// Fixed-time reconciliation schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Times of day in UTC, `HH:MM`
    #[serde(default = "default_times_utc")]
    pub times_utc: Vec<String>,

    /// Run a full apply when the daemon starts
    #[serde(default = "default_reconcile_on_startup")]
    pub reconcile_on_startup: bool,
}

fn default_times_utc() -> Vec<String> {
    // 16:00, 00:00 and 08:00 in Japan.
    vec!["07:00".to_string(), "15:00".to_string(), "23:00".to_string()]
}

fn default_reconcile_on_startup() -> bool {
    true
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            times_utc: default_times_utc(),
            reconcile_on_startup: default_reconcile_on_startup(),
        }
    }
}

/// Runtime limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Channels of one batch reconciled at once
    #[serde(default = "default_max_concurrent_writes")]
    pub max_concurrent_writes: usize,

    /// Trigger dispatches running at once
    #[serde(default = "default_max_inflight_dispatches")]
    pub max_inflight_dispatches: usize,

    /// Capacity of the trigger bus
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_max_concurrent_writes() -> usize {
    DEFAULT_MAX_CONCURRENT_WRITES
}

fn default_max_inflight_dispatches() -> usize {
    16
}

fn default_event_channel_capacity() -> usize {
    1000
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrent_writes: default_max_concurrent_writes(),
            max_inflight_dispatches: default_max_inflight_dispatches(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Channelwarden configuration
///
/// Represents the complete ~/.config/channelwarden/config.yaml file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WardenConfig {
    /// The single guild this reconciler manages
    pub guild_id: u64,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl WardenConfig {
    /// Create a configuration with no managed channels
    pub fn new(guild_id: u64) -> Self {
        Self {
            guild_id,
            policy: PolicyConfig::default(),
            schedule: ScheduleConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }

    /// Builder: add a channel to the send-allowed list
    pub fn allow_send(mut self, channel: impl Into<String>) -> Self {
        self.policy.send_allowed.push(channel.into());
        self
    }

    /// Builder: add a channel to the send-denied list
    pub fn deny_send(mut self, channel: impl Into<String>) -> Self {
        self.policy.send_denied.push(channel.into());
        self
    }

    /// Load configuration from the default path (~/.config/channelwarden/config.yaml)
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path();
        Self::load(&path)
    }

    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(WardenError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading channelwarden configuration");

        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        tracing::debug!(
            guild = config.guild_id,
            send_allowed = config.policy.send_allowed.len(),
            send_denied = config.policy.send_denied.len(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save_default(&self) -> Result<()> {
        let path = Self::default_path();
        self.save(&path)
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "Saving channelwarden configuration");

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    /// Get the default config path (~/.config/channelwarden/config.yaml)
    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("channelwarden");
        path.push("config.yaml");
        path
    }

    pub fn guild(&self) -> GuildId {
        GuildId::new(self.guild_id)
    }

    /// Build the policy registry from the two channel lists
    pub fn build_registry(&self) -> Result<PolicyRegistry> {
        PolicyRegistry::new(&self.policy.send_allowed[..], &self.policy.send_denied[..])
    }

    /// Parse the configured schedule times
    pub fn schedule(&self) -> Result<DailySchedule> {
        DailySchedule::parse(&self.schedule.times_utc[..])
    }
}
