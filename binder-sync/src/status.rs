//! Per-book sync status.

use binder_types::{BookId, Millis};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Whether a book has unsynced edits and when it last synced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStatus {
    pub dirty: bool,
    pub last_synced_at: Option<Millis>,
}

/// Tracks [`SyncStatus`] for every book touched in this process.
#[derive(Debug, Default)]
pub struct SyncStatusTracker {
    books: RwLock<HashMap<BookId, SyncStatus>>,
}

impl SyncStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a book as edited since its last sync.
    pub async fn mark_dirty(&self, book_id: BookId) {
        self.books.write().await.entry(book_id).or_default().dirty = true;
    }

    /// Marks a book as synced now.
    pub async fn mark_synced(&self, book_id: BookId) {
        self.books.write().await.insert(
            book_id,
            SyncStatus {
                dirty: false,
                last_synced_at: Some(Millis::now()),
            },
        );
    }

    /// Stops tracking a book.
    pub async fn forget(&self, book_id: &BookId) {
        self.books.write().await.remove(book_id);
    }

    /// Status of a book. Untracked books are clean and never synced.
    pub async fn status(&self, book_id: &BookId) -> SyncStatus {
        self.books
            .read()
            .await
            .get(book_id)
            .copied()
            .unwrap_or_default()
    }

    /// Books with unsynced edits.
    pub async fn dirty_books(&self) -> Vec<BookId> {
        let mut dirty: Vec<BookId> = self
            .books
            .read()
            .await
            .iter()
            .filter(|(_, s)| s.dirty)
            .map(|(id, _)| *id)
            .collect();
        dirty.sort();
        dirty
    }
}
