//! Policy definition: desired permission profiles and drift detection
//!
//! This module provides:
//! - The two policy profiles and the tri-state [`PermissionProfile`]
//! - The [`PolicyRegistry`] mapping managed channel names to profiles
//! - The pure comparator used for drift detection
//!
//! # Example
//!
//! ```
//! use channelwarden::policy::{needs_repair, PermissionProfile, PolicyRegistry};
//!
//! let registry = PolicyRegistry::new(&["mute_only"], &["readonly"]).unwrap();
//! let desired = registry.resolve("readonly").unwrap();
//!
//! assert!(needs_repair(&PermissionProfile::SEND_ALLOWED, &desired));
//! ```

pub mod comparator;
pub mod profile;
pub mod registry;

pub use comparator::{drifted_flags, needs_repair};
pub use profile::{PermissionFlag, PermissionProfile, ProfileKind};
pub use registry::{PolicyEntry, PolicyRegistry};
