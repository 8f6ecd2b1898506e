//! Snapshot applicator - merges decoded payloads into the draft store.
//!
//! Books and chapters are resolved independently with last-writer-wins on
//! `updatedAt`: a remote copy is written when there is no local copy or the
//! remote one is strictly newer. Ties keep the local copy. Deletions are not
//! subject to last-writer-wins and always remove the book and its chapters.

use crate::error::SyncResult;
use binder_store::DraftStore;
use binder_types::{HistoryPayload, Millis, SnapshotAction, SnapshotPayload};
use tracing::{debug, warn};

/// What an apply changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub books_written: usize,
    pub books_deleted: usize,
    pub chapters_written: usize,
    /// Chapters whose local copy won.
    pub chapters_kept: usize,
    pub chapters_deleted: usize,
    pub history_saved: usize,
}

impl ApplyReport {
    /// Whether nothing was written or deleted.
    pub fn is_noop(&self) -> bool {
        self.books_written == 0
            && self.books_deleted == 0
            && self.chapters_written == 0
            && self.chapters_deleted == 0
            && self.history_saved == 0
    }
}

/// Applies snapshot and history payloads to a [`DraftStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotApplicator;

impl SnapshotApplicator {
    pub fn new() -> Self {
        Self
    }

    /// Applies a book snapshot or deletion.
    pub async fn apply_snapshot(
        &self,
        payload: &SnapshotPayload,
        store: &dyn DraftStore,
    ) -> SyncResult<ApplyReport> {
        let mut report = ApplyReport::default();
        let Some(book) = &payload.book else {
            debug!("Skipping {} payload without a book", payload.action.as_str());
            return Ok(report);
        };

        if payload.action == SnapshotAction::Delete {
            report.chapters_deleted = store.delete_chapters_for_book(&book.id).await?;
            store.delete_book(&book.id).await?;
            report.books_deleted = 1;
            debug!("Deleted book {} by remote request", book.id);
            return Ok(report);
        }

        let local = store.get_book(&book.id).await?;
        if Self::remote_wins(local.map(|b| b.updated_at), book.updated_at) {
            store.save_book(book).await?;
            report.books_written = 1;
            debug!("Wrote remote book {}", book.id);
        }

        for chapter in payload.chapters.iter().flatten() {
            if chapter.book_id != book.id {
                warn!(
                    "Skipping chapter {} that belongs to book {}, not {}",
                    chapter.id, chapter.book_id, book.id
                );
                continue;
            }
            let local = store.get_chapter(&chapter.id).await?;
            if Self::remote_wins(local.map(|c| c.updated_at), chapter.updated_at) {
                store.save_chapter(chapter).await?;
                report.chapters_written += 1;
            } else {
                report.chapters_kept += 1;
            }
        }

        Ok(report)
    }

    /// Saves every entry of a chapter history payload. Entries are
    /// immutable, so re-saving one that exists is harmless.
    pub async fn apply_history(
        &self,
        payload: &HistoryPayload,
        store: &dyn DraftStore,
    ) -> SyncResult<ApplyReport> {
        let mut report = ApplyReport::default();
        for entry in &payload.snapshots {
            if entry.chapter_id != payload.chapter_id {
                warn!(
                    "Skipping history entry {} for chapter {} in payload for {}",
                    entry.id, entry.chapter_id, payload.chapter_id
                );
                continue;
            }
            store.save_history_entry(entry).await?;
            report.history_saved += 1;
        }
        Ok(report)
    }

    /// Last-writer-wins: remote is written when local is absent or older.
    pub fn remote_wins(local: Option<Millis>, remote: Millis) -> bool {
        match local {
            None => true,
            Some(local) => remote > local,
        }
    }
}
