//! Typed view of the tags on sync events.
//!
//! Tags travel as string arrays (`["d", "book-..."]`). They are parsed into
//! [`SyncTag`] at the boundary so the rest of the crate never indexes into
//! raw arrays.

use binder_types::SnapshotAction;

/// Name of the tag that marks an event as Binder sync traffic.
pub const SYNC_MARKER_TAG: &str = "binder-sync";

/// Name of the tag carrying the scope's derived public key.
pub const SYNC_KEY_TAG: &str = "binder-sync-key";

/// Prefix of the `d` coordinate used by chapter history events.
pub const HISTORY_COORDINATE_PREFIX: &str = "binder-history:";

/// What a sync event carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncMarker {
    /// A book with its chapters.
    DraftSnapshot,
    /// The revision history of one chapter.
    ChapterHistory,
}

impl SyncMarker {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DraftSnapshot => "draft-snapshot",
            Self::ChapterHistory => "chapter-history",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft-snapshot" => Some(Self::DraftSnapshot),
            "chapter-history" => Some(Self::ChapterHistory),
            _ => None,
        }
    }
}

/// One tag of a sync event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTag {
    /// `d`: the replaceable coordinate.
    Identifier(String),
    /// Sync marker.
    Marker(SyncMarker),
    /// Public key of the scope the content is encrypted with.
    SyncKey(String),
    /// Payload version.
    Version(u32),
    Action(SnapshotAction),
    /// Anything else, kept verbatim.
    Other(Vec<String>),
}

impl SyncTag {
    /// Parses a raw tag. Returns `None` only for an empty array; tags that
    /// are unknown or whose value does not parse become [`SyncTag::Other`].
    pub fn parse(values: &[String]) -> Option<Self> {
        let (name, rest) = values.split_first()?;
        let value = rest.first().map(String::as_str);

        let parsed = match (name.as_str(), value) {
            ("d", Some(v)) => Some(Self::Identifier(v.to_string())),
            (SYNC_MARKER_TAG, Some(v)) => SyncMarker::parse(v).map(Self::Marker),
            (SYNC_KEY_TAG, Some(v)) => Some(Self::SyncKey(v.to_string())),
            ("version", Some(v)) => v.parse().ok().map(Self::Version),
            ("action", Some(v)) => SnapshotAction::parse(v).map(Self::Action),
            _ => None,
        };
        Some(parsed.unwrap_or_else(|| Self::Other(values.to_vec())))
    }

    /// Raw string-array form.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::Identifier(d) => vec!["d".to_string(), d.clone()],
            Self::Marker(m) => vec![SYNC_MARKER_TAG.to_string(), m.as_str().to_string()],
            Self::SyncKey(k) => vec![SYNC_KEY_TAG.to_string(), k.clone()],
            Self::Version(v) => vec!["version".to_string(), v.to_string()],
            Self::Action(a) => vec!["action".to_string(), a.as_str().to_string()],
            Self::Other(values) => values.clone(),
        }
    }
}

/// `d` coordinate of a chapter's history events.
pub fn history_coordinate(chapter_id: &binder_types::ChapterId) -> String {
    format!("{HISTORY_COORDINATE_PREFIX}{chapter_id}")
}
