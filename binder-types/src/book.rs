//! Local draft entities.
//!
//! A `Book` owns an ordered list of chapter ids. Each `ChapterDraft` points
//! back at its book, and each chapter accumulates an append-only revision
//! history of `DraftSnapshot`s.

use crate::ids::short_hex;
use crate::{BookId, ChapterId, Error, Millis, Result, SnapshotId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Maximum length of the title-derived part of a book slug.
const SLUG_MAX_LEN: usize = 50;

/// A book being written locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Opaque unique identifier.
    pub id: BookId,
    /// Stable public slug, used as the `d` tag once published.
    pub d: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Cover image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Topic tags.
    #[serde(default)]
    pub topics: Vec<String>,
    /// Co-author identities (hex public keys).
    #[serde(default)]
    pub co_authors: Vec<String>,
    /// Canonical chapter order.
    #[serde(default)]
    pub chapter_order: Vec<ChapterId>,
    pub created_at: Millis,
    pub updated_at: Millis,
    /// Fingerprint of the last successfully published state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_hash: Option<String>,
}

impl Book {
    /// Creates a new, empty book with a fresh id and `d` slug.
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        let now = Millis::now();
        Self {
            id: BookId::new(),
            d: format!("book-{}-{}", slugify(&title), short_hex(8)),
            title,
            summary: None,
            cover: None,
            tags: Vec::new(),
            topics: Vec::new(),
            co_authors: Vec::new(),
            chapter_order: Vec::new(),
            created_at: now,
            updated_at: now,
            published_hash: None,
        }
    }

    /// Sets the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Sets the cover URL.
    pub fn with_cover(mut self, cover: impl Into<String>) -> Self {
        self.cover = Some(cover.into());
        self
    }

    /// Bumps `updated_at` so it never goes backwards.
    pub fn touch(&mut self) {
        self.updated_at = Millis::tick_after(self.updated_at);
    }

    /// Whether `chapter_id` is part of this book's order.
    pub fn contains_chapter(&self, chapter_id: &ChapterId) -> bool {
        self.chapter_order.contains(chapter_id)
    }

    /// Appends a chapter to the order. Appending an id that is already
    /// present is a no-op.
    pub fn append_chapter(&mut self, chapter_id: ChapterId) {
        if !self.contains_chapter(&chapter_id) {
            self.chapter_order.push(chapter_id);
            self.touch();
        }
    }

    /// Removes a chapter from the order. Returns whether it was present.
    pub fn remove_chapter(&mut self, chapter_id: &ChapterId) -> bool {
        let before = self.chapter_order.len();
        self.chapter_order.retain(|id| id != chapter_id);
        let removed = self.chapter_order.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Replaces the chapter order after checking it has no duplicates.
    pub fn reorder(&mut self, order: Vec<ChapterId>) -> Result<()> {
        check_unique(&order)?;
        self.chapter_order = order;
        self.touch();
        Ok(())
    }

    /// Checks the order has no duplicates and, when `chapters` is given,
    /// that every referenced chapter belongs to this book.
    pub fn validate_chapter_order(&self, chapters: Option<&[ChapterDraft]>) -> Result<()> {
        check_unique(&self.chapter_order)?;
        if let Some(chapters) = chapters {
            for id in &self.chapter_order {
                let owned = chapters
                    .iter()
                    .any(|chapter| chapter.id == *id && chapter.book_id == self.id);
                if !owned {
                    return Err(Error::ForeignChapter {
                        chapter: *id,
                        book: self.id,
                    });
                }
            }
        }
        Ok(())
    }
}

fn check_unique(order: &[ChapterId]) -> Result<()> {
    let mut seen = HashSet::with_capacity(order.len());
    for id in order {
        if !seen.insert(*id) {
            return Err(Error::DuplicateChapter(*id));
        }
    }
    Ok(())
}

/// Lowercases, maps anything outside `[a-z0-9-]` to `-`, collapses runs of
/// dashes and trims them from both ends.
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' };
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }
    let slug = slug.trim_matches('-');
    slug.chars().take(SLUG_MAX_LEN).collect()
}

/// Editing state of a chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChapterStatus {
    #[default]
    Draft,
    Ready,
}

/// A chapter being written locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterDraft {
    pub id: ChapterId,
    /// Stable public slug.
    pub d: String,
    /// Owning book.
    pub book_id: BookId,
    pub title: String,
    /// Markdown body.
    #[serde(default)]
    pub content_md: String,
    #[serde(default)]
    pub status: ChapterStatus,
    pub created_at: Millis,
    pub updated_at: Millis,
    /// Author identity, when it differs from the book owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_hash: Option<String>,
}

impl ChapterDraft {
    /// Creates an empty draft for `book`. The `d` slug numbers the chapter
    /// after the ones already in the book's order.
    pub fn new(book: &Book, title: impl Into<String>) -> Self {
        let index = book.chapter_order.len() + 1;
        let now = Millis::now();
        Self {
            id: ChapterId::new(),
            d: format!("chapter-{index:02}-{}", short_hex(4)),
            book_id: book.id,
            title: title.into(),
            content_md: String::new(),
            status: ChapterStatus::Draft,
            created_at: now,
            updated_at: now,
            pubkey: None,
            published_hash: None,
        }
    }

    /// Sets the markdown body.
    pub fn with_content(mut self, content_md: impl Into<String>) -> Self {
        self.content_md = content_md.into();
        self
    }

    /// Bumps `updated_at` so it never goes backwards.
    pub fn touch(&mut self) {
        self.updated_at = Millis::tick_after(self.updated_at);
    }
}

/// One immutable entry in a chapter's revision history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSnapshot {
    pub id: SnapshotId,
    pub chapter_id: ChapterId,
    pub content_md: String,
    /// Free-text reason (e.g. "autosave", "before import").
    pub reason: String,
    pub created_at: Millis,
}

impl DraftSnapshot {
    /// Captures `content_md` for `chapter_id` at the current time.
    pub fn new(
        chapter_id: ChapterId,
        content_md: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: SnapshotId::new(),
            chapter_id,
            content_md: content_md.into(),
            reason: reason.into(),
            created_at: Millis::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("  Hello, World!  "), "hello-world");
        assert_eq!(slugify("A--B"), "a-b");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn slugify_truncates() {
        let long = "a".repeat(80);
        assert_eq!(slugify(&long).len(), SLUG_MAX_LEN);
    }
}
