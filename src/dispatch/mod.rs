//! Trigger dispatch
//!
//! [`Trigger`] values describe what happened; the [`Dispatcher`] decides
//! which engine operation answers it.

pub mod dispatcher;
pub mod trigger;

pub use dispatcher::Dispatcher;
pub use trigger::{Trigger, TriggerKind};
