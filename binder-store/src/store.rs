//! The storage seam between drafts and sync.

use crate::error::StoreResult;
use async_trait::async_trait;
use binder_types::{Book, BookId, ChapterDraft, ChapterId, DraftSnapshot, SnapshotId};

/// Persistent home of books, chapters and revision history.
///
/// Saves are upserts keyed by id. Deletes of missing ids succeed. Keeping
/// `chapterOrder` consistent with stored chapters is the caller's job.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn get_book(&self, id: &BookId) -> StoreResult<Option<Book>>;

    /// All books, most recently updated first.
    async fn list_books(&self) -> StoreResult<Vec<Book>>;

    async fn save_book(&self, book: &Book) -> StoreResult<()>;

    async fn delete_book(&self, id: &BookId) -> StoreResult<()>;

    async fn get_chapter(&self, id: &ChapterId) -> StoreResult<Option<ChapterDraft>>;

    /// Chapters whose `bookId` is `book_id`, oldest first.
    async fn get_chapters_for_book(&self, book_id: &BookId) -> StoreResult<Vec<ChapterDraft>>;

    async fn save_chapter(&self, chapter: &ChapterDraft) -> StoreResult<()>;

    async fn delete_chapter(&self, id: &ChapterId) -> StoreResult<()>;

    /// Removes every chapter of `book_id`. Returns how many were removed.
    async fn delete_chapters_for_book(&self, book_id: &BookId) -> StoreResult<usize>;

    /// Revision history of a chapter, newest first.
    async fn get_chapter_history(&self, chapter_id: &ChapterId) -> StoreResult<Vec<DraftSnapshot>>;

    async fn save_history_entry(&self, entry: &DraftSnapshot) -> StoreResult<()>;

    /// Removes history entries by id. Returns how many existed.
    async fn delete_history_entries(&self, ids: &[SnapshotId]) -> StoreResult<usize>;
}
