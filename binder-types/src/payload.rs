//! Versioned payloads that cross the network boundary (always encrypted).

use crate::{Book, ChapterDraft, ChapterId, DraftSnapshot, Millis};
use serde::{Deserialize, Serialize};

/// Payload version written by this build.
pub const PAYLOAD_VERSION: u32 = 2;

/// Oldest payload version this build still reads. Version 1 books lack
/// `topics`/`coAuthors`, which default to empty.
pub const MIN_SUPPORTED_PAYLOAD_VERSION: u32 = 1;

/// Whether a payload with `version` may be applied.
pub const fn is_supported_version(version: u32) -> bool {
    version >= MIN_SUPPORTED_PAYLOAD_VERSION && version <= PAYLOAD_VERSION
}

/// What a book payload asks receivers to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotAction {
    /// Full state of a book and its chapters.
    Snapshot,
    /// The book was deleted on the sending device.
    Delete,
}

impl SnapshotAction {
    /// Wire spelling, also used for the `action` tag.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Delete => "delete",
        }
    }

    /// Parses the wire spelling.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "snapshot" => Some(Self::Snapshot),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Book sync unit: a book with its chapters, or a deletion notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPayload {
    pub version: u32,
    /// When the payload was built.
    pub timestamp: Millis,
    pub action: SnapshotAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book: Option<Book>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapters: Option<Vec<ChapterDraft>>,
}

impl SnapshotPayload {
    /// Full-state snapshot of `book` and its chapters.
    pub fn snapshot(book: Book, chapters: Vec<ChapterDraft>) -> Self {
        Self {
            version: PAYLOAD_VERSION,
            timestamp: Millis::now(),
            action: SnapshotAction::Snapshot,
            book: Some(book),
            chapters: Some(chapters),
        }
    }

    /// Deletion notice for `book`. Carries no chapters.
    pub fn deletion(book: Book) -> Self {
        Self {
            version: PAYLOAD_VERSION,
            timestamp: Millis::now(),
            action: SnapshotAction::Delete,
            book: Some(book),
            chapters: None,
        }
    }
}

/// Chapter-history sync unit: every revision-history entry of one chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPayload {
    pub version: u32,
    pub timestamp: Millis,
    pub chapter_id: ChapterId,
    #[serde(default)]
    pub snapshots: Vec<DraftSnapshot>,
}

impl HistoryPayload {
    /// Wraps the history of `chapter_id`.
    pub fn new(chapter_id: ChapterId, snapshots: Vec<DraftSnapshot>) -> Self {
        Self {
            version: PAYLOAD_VERSION,
            timestamp: Millis::now(),
            chapter_id,
            snapshots,
        }
    }
}
