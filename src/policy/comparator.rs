//! Drift detection between a live override and a desired profile

use super::profile::{PermissionFlag, PermissionProfile};

/// Flags set in `desired` whose live value differs
///
/// Flags unset in `desired` are ignored whatever their live value. A flag
/// that is unset live but set in `desired` counts as drifted.
pub fn drifted_flags(live: &PermissionProfile, desired: &PermissionProfile) -> Vec<PermissionFlag> {
    desired
        .set_flags()
        .filter(|&(flag, value)| live.get(flag) != Some(value))
        .map(|(flag, _)| flag)
        .collect()
}

/// Whether the live override must be rewritten to match `desired`
pub fn needs_repair(live: &PermissionProfile, desired: &PermissionProfile) -> bool {
    desired
        .set_flags()
        .any(|(flag, value)| live.get(flag) != Some(value))
}
