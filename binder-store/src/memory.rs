//! In-memory draft store.

use crate::error::StoreResult;
use crate::store::DraftStore;
use async_trait::async_trait;
use binder_types::{Book, BookId, ChapterDraft, ChapterId, DraftSnapshot, SnapshotId};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    books: HashMap<BookId, Book>,
    chapters: HashMap<ChapterId, ChapterDraft>,
    history: HashMap<SnapshotId, DraftSnapshot>,
}

/// Draft store kept in process memory.
///
/// Counts every mutating call so callers can assert that an operation left
/// storage untouched.
#[derive(Default)]
pub struct MemoryDraftStore {
    tables: RwLock<Tables>,
    writes: AtomicUsize,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of save/delete calls made so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn get_book(&self, id: &BookId) -> StoreResult<Option<Book>> {
        Ok(self.tables.read().await.books.get(id).cloned())
    }

    async fn list_books(&self) -> StoreResult<Vec<Book>> {
        let tables = self.tables.read().await;
        let mut books: Vec<Book> = tables.books.values().cloned().collect();
        books.sort_by_key(|b| Reverse(b.updated_at));
        Ok(books)
    }

    async fn save_book(&self, book: &Book) -> StoreResult<()> {
        self.record_write();
        self.tables.write().await.books.insert(book.id, book.clone());
        Ok(())
    }

    async fn delete_book(&self, id: &BookId) -> StoreResult<()> {
        self.record_write();
        self.tables.write().await.books.remove(id);
        Ok(())
    }

    async fn get_chapter(&self, id: &ChapterId) -> StoreResult<Option<ChapterDraft>> {
        Ok(self.tables.read().await.chapters.get(id).cloned())
    }

    async fn get_chapters_for_book(&self, book_id: &BookId) -> StoreResult<Vec<ChapterDraft>> {
        let tables = self.tables.read().await;
        let mut chapters: Vec<ChapterDraft> = tables
            .chapters
            .values()
            .filter(|c| c.book_id == *book_id)
            .cloned()
            .collect();
        chapters.sort_by_key(|c| (c.created_at, c.id));
        Ok(chapters)
    }

    async fn save_chapter(&self, chapter: &ChapterDraft) -> StoreResult<()> {
        self.record_write();
        self.tables
            .write()
            .await
            .chapters
            .insert(chapter.id, chapter.clone());
        Ok(())
    }

    async fn delete_chapter(&self, id: &ChapterId) -> StoreResult<()> {
        self.record_write();
        self.tables.write().await.chapters.remove(id);
        Ok(())
    }

    async fn delete_chapters_for_book(&self, book_id: &BookId) -> StoreResult<usize> {
        self.record_write();
        let mut tables = self.tables.write().await;
        let before = tables.chapters.len();
        tables.chapters.retain(|_, c| c.book_id != *book_id);
        Ok(before - tables.chapters.len())
    }

    async fn get_chapter_history(&self, chapter_id: &ChapterId) -> StoreResult<Vec<DraftSnapshot>> {
        let tables = self.tables.read().await;
        let mut entries: Vec<DraftSnapshot> = tables
            .history
            .values()
            .filter(|s| s.chapter_id == *chapter_id)
            .cloned()
            .collect();
        entries.sort_by_key(|s| Reverse((s.created_at, s.id)));
        Ok(entries)
    }

    async fn save_history_entry(&self, entry: &DraftSnapshot) -> StoreResult<()> {
        self.record_write();
        self.tables
            .write()
            .await
            .history
            .insert(entry.id, entry.clone());
        Ok(())
    }

    async fn delete_history_entries(&self, ids: &[SnapshotId]) -> StoreResult<usize> {
        self.record_write();
        let mut tables = self.tables.write().await;
        let mut removed = 0;
        for id in ids {
            if tables.history.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
