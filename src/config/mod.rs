//! Configuration system
//!
//! Loads ~/.config/channelwarden/config.yaml with support for:
//! - The managed guild
//! - The send-allowed and send-denied channel lists
//! - The daily reconciliation schedule
//! - Runtime concurrency limits

mod warden_config;
pub mod validation;

pub use validation::{validate_config, validate_config_result, ValidationError};
pub use warden_config::{PolicyConfig, RuntimeConfig, ScheduleConfig, WardenConfig};
