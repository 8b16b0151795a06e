//! Permission profiles: tri-state permission overrides for a single role

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single permission that an override can allow, deny, or leave unset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionFlag {
    /// See the channel and read its history
    Read,
    /// Post messages
    Send,
    /// Use @everyone / @here
    MentionEveryone,
    /// Create and edit webhooks
    ManageWebhooks,
    AddReactions,
    AttachFiles,
    EmbedLinks,
    CreatePublicThreads,
}

impl PermissionFlag {
    /// Every flag, in comparison order
    pub const ALL: [PermissionFlag; 8] = [
        PermissionFlag::Read,
        PermissionFlag::Send,
        PermissionFlag::MentionEveryone,
        PermissionFlag::ManageWebhooks,
        PermissionFlag::AddReactions,
        PermissionFlag::AttachFiles,
        PermissionFlag::EmbedLinks,
        PermissionFlag::CreatePublicThreads,
    ];

    /// Stable snake_case name
    pub fn name(&self) -> &'static str {
        match self {
            PermissionFlag::Read => "read",
            PermissionFlag::Send => "send",
            PermissionFlag::MentionEveryone => "mention_everyone",
            PermissionFlag::ManageWebhooks => "manage_webhooks",
            PermissionFlag::AddReactions => "add_reactions",
            PermissionFlag::AttachFiles => "attach_files",
            PermissionFlag::EmbedLinks => "embed_links",
            PermissionFlag::CreatePublicThreads => "create_public_threads",
        }
    }
}

impl fmt::Display for PermissionFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A per-role permission override
///
/// `None` means unset: the flag inherits from the category or guild and is
/// neither compared nor written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention_everyone: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage_webhooks: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_reactions: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attach_files: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_links: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_public_threads: Option<bool>,
}

impl PermissionProfile {
    /// Notifications off, posting allowed
    pub const SEND_ALLOWED: PermissionProfile = PermissionProfile {
        read: Some(true),
        send: Some(true),
        mention_everyone: Some(false),
        manage_webhooks: Some(false),
        add_reactions: None,
        attach_files: None,
        embed_links: None,
        create_public_threads: None,
    };

    /// Notifications off, posting denied
    pub const SEND_DENIED: PermissionProfile = PermissionProfile {
        read: Some(true),
        send: Some(false),
        mention_everyone: Some(false),
        manage_webhooks: Some(false),
        add_reactions: None,
        attach_files: None,
        embed_links: None,
        create_public_threads: None,
    };

    /// A profile with every flag unset
    pub const fn unset() -> Self {
        PermissionProfile {
            read: None,
            send: None,
            mention_everyone: None,
            manage_webhooks: None,
            add_reactions: None,
            attach_files: None,
            embed_links: None,
            create_public_threads: None,
        }
    }

    /// Get the value of a flag
    pub fn get(&self, flag: PermissionFlag) -> Option<bool> {
        match flag {
            PermissionFlag::Read => self.read,
            PermissionFlag::Send => self.send,
            PermissionFlag::MentionEveryone => self.mention_everyone,
            PermissionFlag::ManageWebhooks => self.manage_webhooks,
            PermissionFlag::AddReactions => self.add_reactions,
            PermissionFlag::AttachFiles => self.attach_files,
            PermissionFlag::EmbedLinks => self.embed_links,
            PermissionFlag::CreatePublicThreads => self.create_public_threads,
        }
    }

    /// Return a copy with `flag` set to `value` (`None` unsets it)
    pub fn with(mut self, flag: PermissionFlag, value: Option<bool>) -> Self {
        let slot = match flag {
            PermissionFlag::Read => &mut self.read,
            PermissionFlag::Send => &mut self.send,
            PermissionFlag::MentionEveryone => &mut self.mention_everyone,
            PermissionFlag::ManageWebhooks => &mut self.manage_webhooks,
            PermissionFlag::AddReactions => &mut self.add_reactions,
            PermissionFlag::AttachFiles => &mut self.attach_files,
            PermissionFlag::EmbedLinks => &mut self.embed_links,
            PermissionFlag::CreatePublicThreads => &mut self.create_public_threads,
        };
        *slot = value;
        self
    }

    /// Iterate over the flags that are set, with their values
    pub fn set_flags(&self) -> impl Iterator<Item = (PermissionFlag, bool)> + '_ {
        PermissionFlag::ALL
            .into_iter()
            .filter_map(move |flag| self.get(flag).map(|value| (flag, value)))
    }

    /// Whether no flag is set
    pub fn is_unset(&self) -> bool {
        self.set_flags().next().is_none()
    }

    /// Write the set flags of `other` over `self`, leaving the rest untouched
    pub fn overlay(&self, other: &PermissionProfile) -> PermissionProfile {
        other
            .set_flags()
            .fold(*self, |acc, (flag, value)| acc.with(flag, Some(value)))
    }
}

/// Which of the two policy profiles a managed channel carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    /// Notifications off, posting allowed
    SendAllowed,
    /// Notifications off, posting denied
    SendDenied,
}

impl ProfileKind {
    /// The concrete profile for this kind
    pub fn profile(&self) -> PermissionProfile {
        match self {
            ProfileKind::SendAllowed => PermissionProfile::SEND_ALLOWED,
            ProfileKind::SendDenied => PermissionProfile::SEND_DENIED,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProfileKind::SendAllowed => "send_allowed",
            ProfileKind::SendDenied => "send_denied",
        }
    }
}
