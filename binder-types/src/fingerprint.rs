//! Publication fingerprints.
//!
//! A fingerprint is the SHA-256 (hex) of the publish-relevant fields of a
//! draft. Comparing it with the stored `publishedHash` tells whether the
//! draft changed since it was last published.

use crate::{Book, ChapterDraft, ChapterId, ChapterStatus, Millis};
use serde::Serialize;
use sha2::{Digest, Sha256};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BookFields<'a> {
    title: &'a str,
    summary: &'a str,
    cover: &'a str,
    chapter_order: &'a [ChapterId],
    topics: &'a [String],
    co_authors: &'a [String],
    updated_at: Millis,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChapterFields<'a> {
    id: ChapterId,
    d: &'a str,
    title: &'a str,
    status: ChapterStatus,
    content: &'a str,
    updated_at: Millis,
}

/// Fingerprint of a book's publishable metadata.
pub fn book_fingerprint(book: &Book) -> String {
    let fields = BookFields {
        title: &book.title,
        summary: book.summary.as_deref().unwrap_or_default(),
        cover: book.cover.as_deref().unwrap_or_default(),
        chapter_order: &book.chapter_order,
        topics: &book.topics,
        co_authors: &book.co_authors,
        updated_at: book.updated_at,
    };
    hash_json(&fields)
}

/// Fingerprint of a chapter as it would be published. `rendered` is the
/// content that actually goes out (markdown after any rendering step).
pub fn chapter_fingerprint(chapter: &ChapterDraft, rendered: &str) -> String {
    let fields = ChapterFields {
        id: chapter.id,
        d: &chapter.d,
        title: &chapter.title,
        status: chapter.status,
        content: rendered,
        updated_at: chapter.updated_at,
    };
    hash_json(&fields)
}

/// Whether a draft whose current fingerprint is `current` needs publishing.
pub fn needs_publish(published_hash: Option<&str>, current: &str) -> bool {
    published_hash != Some(current)
}

fn hash_json<T: Serialize>(value: &T) -> String {
    // Serializing these borrowed field structs cannot fail.
    let json = serde_json::to_vec(value).unwrap_or_default();
    hex::encode(Sha256::digest(&json))
}
