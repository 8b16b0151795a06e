//! Policy registry: which profile each managed channel must carry

use super::profile::{PermissionProfile, ProfileKind};
use crate::{Result, WardenError};
use std::collections::HashMap;

/// A managed channel name and the profile it must carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEntry {
    /// Channel name (case-sensitive)
    pub name: String,
    /// Which policy profile applies
    pub kind: ProfileKind,
}

impl PolicyEntry {
    /// The desired permission profile
    pub fn profile(&self) -> PermissionProfile {
        self.kind.profile()
    }
}

/// Immutable mapping from channel name to desired profile
///
/// Entries keep configuration order: send-allowed names first, then
/// send-denied names.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    entries: Vec<PolicyEntry>,
    index: HashMap<String, usize>,
}

impl PolicyRegistry {
    /// Build the registry from the two configured name lists
    ///
    /// # Errors
    /// Returns [`WardenError::Config`] if a name is blank, repeated within a
    /// list, or present in both lists.
    pub fn new<A, D>(send_allowed: &[A], send_denied: &[D]) -> Result<Self>
    where
        A: AsRef<str>,
        D: AsRef<str>,
    {
        let mut registry = Self::default();

        let allowed = send_allowed
            .iter()
            .map(|n| (n.as_ref(), ProfileKind::SendAllowed));
        let denied = send_denied
            .iter()
            .map(|n| (n.as_ref(), ProfileKind::SendDenied));

        for (name, kind) in allowed.chain(denied) {
            registry.insert(name, kind)?;
        }

        tracing::debug!(
            managed = registry.len(),
            send_allowed = send_allowed.len(),
            send_denied = send_denied.len(),
            "Policy registry built"
        );

        Ok(registry)
    }

    fn insert(&mut self, name: &str, kind: ProfileKind) -> Result<()> {
        if name.trim().is_empty() {
            return Err(WardenError::Config(format!(
                "Blank channel name in {} list",
                kind.name()
            )));
        }

        if let Some(&existing) = self.index.get(name) {
            let existing_kind = self.entries[existing].kind;
            return Err(if existing_kind == kind {
                WardenError::Config(format!(
                    "Channel '{}' listed twice in {} list",
                    name,
                    kind.name()
                ))
            } else {
                WardenError::Config(format!(
                    "Channel '{}' is listed as both {} and {}",
                    name,
                    existing_kind.name(),
                    kind.name()
                ))
            });
        }

        self.index.insert(name.to_string(), self.entries.len());
        self.entries.push(PolicyEntry {
            name: name.to_string(),
            kind,
        });
        Ok(())
    }

    /// Look up the desired profile for a channel name
    pub fn resolve(&self, name: &str) -> Option<PermissionProfile> {
        self.kind_of(name).map(|kind| kind.profile())
    }

    /// Look up which profile kind a channel name uses
    pub fn kind_of(&self, name: &str) -> Option<ProfileKind> {
        self.index.get(name).map(|&i| self.entries[i].kind)
    }

    /// Whether a channel name is managed
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All managed channels in configuration order
    pub fn entries(&self) -> &[PolicyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_both_lists() {
        let registry = PolicyRegistry::new(&["mute_only"], &["readonly"]).unwrap();

        assert_eq!(
            registry.resolve("mute_only"),
            Some(PermissionProfile::SEND_ALLOWED)
        );
        assert_eq!(
            registry.resolve("readonly"),
            Some(PermissionProfile::SEND_DENIED)
        );
        assert_eq!(registry.resolve("announcements"), None);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let registry = PolicyRegistry::new(&["Mute_Only"], &[] as &[&str]).unwrap();
        assert!(registry.contains("Mute_Only"));
        assert!(!registry.contains("mute_only"));
    }

    #[test]
    fn test_entries_keep_configuration_order() {
        let registry = PolicyRegistry::new(&["b", "a"], &["d", "c"]).unwrap();
        let names: Vec<&str> = registry.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "d", "c"]);
        assert_eq!(registry.entries()[2].kind, ProfileKind::SendDenied);
    }

    #[test]
    fn test_overlapping_lists_rejected() {
        let err = PolicyRegistry::new(&["general", "lounge"], &["lounge"]).unwrap_err();
        assert!(matches!(err, WardenError::Config(_)));
        assert!(err.to_string().contains("both send_allowed and send_denied"));
    }

    #[test]
    fn test_duplicate_within_list_rejected() {
        let err = PolicyRegistry::new(&["general", "general"], &[] as &[&str]).unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn test_blank_name_rejected() {
        let err = PolicyRegistry::new(&[] as &[&str], &["  "]).unwrap_err();
        assert!(err.to_string().contains("Blank channel name in send_denied"));
    }

    #[test]
    fn test_empty_registry() {
        let registry = PolicyRegistry::new(&[] as &[&str], &[] as &[&str]).unwrap();
        assert!(registry.is_empty());
    }
}
