//! Core type definitions for Binder draft sync.
//!
//! This crate defines the plain data model shared by every other crate:
//! - Book, chapter and revision-history identifiers
//! - Wall-clock millisecond timestamps used for last-writer-wins
//! - Local drafts (`Book`, `ChapterDraft`, `DraftSnapshot`)
//! - The versioned payloads that cross the network boundary
//! - Publication fingerprints
//!
//! Nothing here performs I/O or cryptography beyond hashing.

mod book;
pub mod fingerprint;
mod ids;
mod payload;
mod timestamp;

pub use book::{Book, ChapterDraft, ChapterStatus, DraftSnapshot};
pub use ids::{BookId, ChapterId, SnapshotId};
pub use payload::{
    HistoryPayload, MIN_SUPPORTED_PAYLOAD_VERSION, PAYLOAD_VERSION, SnapshotAction, SnapshotPayload,
    is_supported_version,
};
pub use timestamp::Millis;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("chapter {0} appears more than once in the chapter order")]
    DuplicateChapter(ChapterId),

    #[error("chapter {chapter} does not belong to book {book}")]
    ForeignChapter { chapter: ChapterId, book: BookId },
}
