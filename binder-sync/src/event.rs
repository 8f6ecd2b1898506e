//! Wire events and filters.

use crate::tags::{SYNC_KEY_TAG, SyncTag};
use serde::{Deserialize, Serialize};

/// An unsigned event, as handed to a [`Signer`](crate::Signer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTemplate {
    pub kind: u16,
    /// Unix seconds.
    pub created_at: u64,
    pub tags: Vec<Vec<String>>,
    pub content: String,
}

impl EventTemplate {
    /// Template with no tags.
    pub fn new(kind: u16, created_at: u64, content: impl Into<String>) -> Self {
        Self {
            kind,
            created_at,
            tags: Vec::new(),
            content: content.into(),
        }
    }

    /// Appends a tag.
    pub fn with_tag(mut self, tag: SyncTag) -> Self {
        self.tags.push(tag.to_vec());
        self
    }
}

/// A signed event in NIP-01 JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEvent {
    pub id: String,
    pub pubkey: String,
    pub created_at: u64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    pub sig: String,
}

impl SignedEvent {
    /// Tags parsed into [`SyncTag`]s.
    pub fn sync_tags(&self) -> Vec<SyncTag> {
        self.tags.iter().filter_map(|t| SyncTag::parse(t)).collect()
    }

    /// First value of the first tag named `name`.
    pub fn tag_value(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.first().is_some_and(|n| n == name))
            .and_then(|t| t.get(1))
            .map(String::as_str)
    }

    /// `d` coordinate.
    pub fn identifier(&self) -> Option<&str> {
        self.tag_value("d")
    }
}

/// Query for sync events.
///
/// Relays only index single-letter tags, so `sync_key` is not sent to
/// relays; [`EventFilter::matches`] applies it on the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub kinds: Vec<u16>,
    pub authors: Vec<String>,
    /// Accepted `d` values.
    pub identifiers: Vec<String>,
    /// Required value of the sync-key tag.
    pub sync_key: Option<String>,
    pub limit: Option<usize>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = u16>) -> Self {
        self.kinds.extend(kinds);
        self
    }

    pub fn author(mut self, pubkey: impl Into<String>) -> Self {
        self.authors.push(pubkey.into());
        self
    }

    pub fn identifier(mut self, d: impl Into<String>) -> Self {
        self.identifiers.push(d.into());
        self
    }

    pub fn sync_key(mut self, pubkey: impl Into<String>) -> Self {
        self.sync_key = Some(pubkey.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `event` satisfies the constraints a relay can index: kinds,
    /// authors and `#d`. Relays apply `limit` after this and know nothing
    /// about the sync-key tag.
    pub fn matches_indexed(&self, event: &SignedEvent) -> bool {
        if !self.kinds.is_empty() && !self.kinds.contains(&event.kind) {
            return false;
        }
        if !self.authors.is_empty() && !self.authors.contains(&event.pubkey) {
            return false;
        }
        self.identifiers.is_empty()
            || event
                .identifier()
                .is_some_and(|d| self.identifiers.iter().any(|want| want == d))
    }

    /// Whether `event` satisfies every constraint except `limit`.
    pub fn matches(&self, event: &SignedEvent) -> bool {
        if !self.matches_indexed(event) {
            return false;
        }
        match &self.sync_key {
            Some(key) => event.tag_value(SYNC_KEY_TAG) == Some(key.as_str()),
            None => true,
        }
    }
}
