//! Channelwarden - desired-state reconciler for channel permission overrides
//!
//! Channelwarden keeps the default role's permission override on a fixed set
//! of named channels equal to a declared policy. Some channels let everyone
//! post, others are read-only. Drift introduced by people or other bots is
//! detected and undone, on a schedule, at startup and whenever the platform
//! reports a relevant change.
//!
//! # Architecture
//!
//! - **policy**: Permission profiles, the channel registry, drift comparison
//! - **platform**: The narrow platform seam and an in-memory binding
//! - **reconcile**: Apply/repair engine with per-channel write exclusion
//! - **dispatch**: Trigger events and their routing to the engine
//! - **report**: Run summaries, audit rows, report sinks
//! - **warden**: Event loop daemon and daily schedule
//! - **config**: YAML configuration and validation

// Core modules
pub mod config;
pub mod error;
pub mod platform;
pub mod policy;

// Reconciliation pipeline
pub mod dispatch;
pub mod reconcile;
pub mod report;

// Runtime
pub mod logging;
pub mod metrics;
pub mod warden;

// Re-exports
pub use error::{Result, WardenError};
