//! Warden daemon
//!
//! Long-running reconciler for a single guild.
//!
//! # Architecture
//!
//! The platform binding pushes [`Trigger`](crate::dispatch::Trigger)s into
//! the warden's bus. Each trigger is dispatched on its own task, so a slow
//! batch never holds up a drift repair on another channel; writes to the
//! same channel still serialize through the engine's channel locks.
//!
//! ## Inputs
//!
//! - **Trigger bus**: channel and role events from the platform binding
//! - **Daily schedule**: full applies at fixed UTC times
//! - **Command channel**: manual reconcile and shutdown
//! - **Signals**: SIGTERM/SIGINT stop the loop gracefully
//!
//! # Example
//!
//! ```ignore
//! use channelwarden::config::WardenConfig;
//! use channelwarden::warden::Warden;
//!
//! #[tokio::main]
//! async fn main() -> channelwarden::Result<()> {
//!     channelwarden::logging::init()?;
//!
//!     let config = WardenConfig::load_default()?;
//!     let platform = my_binding::connect().await?;
//!     let mut warden = Warden::from_config(&config, platform)?;
//!
//!     let triggers = warden.trigger_sender();
//!     my_binding::forward_events(triggers);
//!
//!     warden.run().await
//! }
//! ```

mod daemon;
pub mod schedule;

pub use daemon::{
    Warden, WardenCommand, WardenEvent, WardenSettings, DEFAULT_EVENT_CHANNEL_CAPACITY,
    DEFAULT_MAX_INFLIGHT_DISPATCHES,
};
pub use schedule::DailySchedule;
