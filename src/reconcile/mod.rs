//! Desired-state reconciliation
//!
//! - [`ReconciliationEngine`]: apply/repair passes over one or many channels
//! - [`ReconciliationResult`] / [`ReconciliationRun`]: structured outcomes
//! - [`ChannelLocks`]: single writer per channel across overlapping triggers

pub mod engine;
pub mod locks;
pub mod result;

pub use engine::{ReconciliationEngine, DEFAULT_MAX_CONCURRENT_WRITES};
pub use locks::{ChannelLease, ChannelLocks};
pub use result::{Action, ReconciliationResult, ReconciliationRun, RunBuilder};
