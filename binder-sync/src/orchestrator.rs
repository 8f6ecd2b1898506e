//! Draft sync orchestrator.
//!
//! Publishing is load → encode → sign → fan out, strictly in that order.
//! Restoring is fetch → pick newest → decode → apply. Decoding finishes
//! before anything is written, so a payload that cannot be decoded leaves
//! local state untouched.
//!
//! Sync and deletion notices for the same book are serialized by a per-book
//! lock, and so is applying a restored snapshot of that book. Different
//! books never wait on each other.

use crate::applicator::{ApplyReport, SnapshotApplicator};
use crate::codec;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::event::{EventFilter, EventTemplate, SignedEvent};
use crate::publish::{self, PublishReport};
use crate::session::SyncSession;
use crate::settings::RelaySettings;
use crate::signer::Signer;
use crate::status::SyncStatusTracker;
use crate::tags::{SYNC_MARKER_TAG, SyncMarker, SyncTag, history_coordinate};
use crate::transport::RelayTransport;
use binder_crypto::ScopedKey;
use binder_store::DraftStore;
use binder_types::{
    Book, BookId, ChapterId, HistoryPayload, Millis, PAYLOAD_VERSION, SnapshotAction,
    SnapshotPayload,
};
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

/// Restore-marker key for book snapshots.
const BOOK_RESTORE_TARGET: &str = "book-snapshot";

/// What a restore did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// No candidate events on any relay.
    Noop,
    /// The newest event was already applied in this session.
    AlreadyApplied,
    /// The newest event was decoded and applied.
    Applied(ApplyReport),
}

/// Sequences draft sync between the local store and relays.
pub struct DraftSync {
    store: Arc<dyn DraftStore>,
    signer: Arc<dyn Signer>,
    settings: Arc<dyn RelaySettings>,
    transport: Arc<dyn RelayTransport>,
    session: Arc<SyncSession>,
    config: SyncConfig,
    applicator: SnapshotApplicator,
    status: Arc<SyncStatusTracker>,
    book_locks: BookLocks,
}

impl DraftSync {
    /// Creates an orchestrator with the default configuration.
    pub fn new(
        store: Arc<dyn DraftStore>,
        signer: Arc<dyn Signer>,
        settings: Arc<dyn RelaySettings>,
        transport: Arc<dyn RelayTransport>,
        session: Arc<SyncSession>,
    ) -> Self {
        Self {
            store,
            signer,
            settings,
            transport,
            session,
            config: SyncConfig::default(),
            applicator: SnapshotApplicator::new(),
            status: Arc::new(SyncStatusTracker::new()),
            book_locks: BookLocks::default(),
        }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares an existing status tracker instead of a private one.
    pub fn with_status_tracker(mut self, status: Arc<SyncStatusTracker>) -> Self {
        self.status = status;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SyncSession> {
        &self.session
    }

    pub fn status(&self) -> &Arc<SyncStatusTracker> {
        &self.status
    }

    // ── Book snapshots ───────────────────────────────────────────

    /// Publishes the full state of a book and its chapters.
    pub async fn sync_book(&self, book_id: &BookId) -> SyncResult<PublishReport> {
        self.session.require_pubkey().await?;
        let relays = self.require_relays().await?;

        let _guard = self.lock_book(*book_id).await;
        let book = self
            .store
            .get_book(book_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("book {book_id}")))?;
        let chapters = self.store.get_chapters_for_book(book_id).await?;
        let d = book.d.clone();
        let chapter_count = chapters.len();

        let payload = SnapshotPayload::snapshot(book, chapters);
        let report = self
            .publish_encrypted(
                &relays,
                &self.config.snapshot_scope,
                self.config.snapshot_kind,
                &payload,
                d,
                SyncMarker::DraftSnapshot,
                SnapshotAction::Snapshot,
            )
            .await?;

        self.status.mark_synced(*book_id).await;
        info!(
            "Synced book {} with {} chapters ({}/{} relays)",
            book_id, chapter_count, report.accepted, report.attempted
        );
        Ok(report)
    }

    /// Tells other devices that `book` was deleted. Deletes nothing locally.
    pub async fn notify_book_deletion(&self, book: &Book) -> SyncResult<PublishReport> {
        self.session.require_pubkey().await?;
        let relays = self.require_relays().await?;

        let _guard = self.lock_book(book.id).await;
        let payload = SnapshotPayload::deletion(book.clone());
        let report = self
            .publish_encrypted(
                &relays,
                &self.config.snapshot_scope,
                self.config.snapshot_kind,
                &payload,
                book.d.clone(),
                SyncMarker::DraftSnapshot,
                SnapshotAction::Delete,
            )
            .await?;

        self.status.forget(&book.id).await;
        info!("Published deletion of book {}", book.id);
        Ok(report)
    }

    /// Fetches the newest book snapshot published with this session's key
    /// and merges it into the local store.
    pub async fn restore_latest_snapshot(&self) -> SyncResult<RestoreOutcome> {
        let pubkey = self.session.require_pubkey().await?;
        let relays = self.require_relays().await?;
        let key = self.scoped_key(&self.config.snapshot_scope).await?;

        let filter = EventFilter::new()
            .kinds(self.config.restore_kinds.iter().copied())
            .author(pubkey)
            .sync_key(key.public_key_hex())
            .limit(self.config.restore_limit);
        let Some(latest) = self
            .fetch_latest(&relays, &filter, SyncMarker::DraftSnapshot)
            .await?
        else {
            debug!("No draft snapshots to restore");
            return Ok(RestoreOutcome::Noop);
        };

        let last_applied = self.session.last_applied(BOOK_RESTORE_TARGET).await;
        if last_applied.as_deref() == Some(latest.id.as_str()) {
            debug!("Snapshot {} already applied", latest.id);
            return Ok(RestoreOutcome::AlreadyApplied);
        }

        let payload: SnapshotPayload = codec::decode(&latest.content, &key.conversation_key()?)?;
        let report = {
            let _guard = match &payload.book {
                Some(book) => Some(self.lock_book(book.id).await),
                None => None,
            };
            self.applicator
                .apply_snapshot(&payload, self.store.as_ref())
                .await?
        };

        self.session
            .record_applied(BOOK_RESTORE_TARGET, &latest.id)
            .await;
        info!("Applied draft snapshot {}: {:?}", latest.id, report);
        Ok(RestoreOutcome::Applied(report))
    }

    // ── Chapter history ──────────────────────────────────────────

    /// Publishes the revision history of a chapter.
    pub async fn publish_chapter_snapshots(
        &self,
        chapter_id: &ChapterId,
    ) -> SyncResult<PublishReport> {
        self.session.require_pubkey().await?;
        let relays = self.require_relays().await?;

        if self.store.get_chapter(chapter_id).await?.is_none() {
            return Err(SyncError::NotFound(format!("chapter {chapter_id}")));
        }
        let history = self.store.get_chapter_history(chapter_id).await?;
        let entries = history.len();

        let payload = HistoryPayload::new(*chapter_id, history);
        let report = self
            .publish_encrypted(
                &relays,
                &self.config.history_scope,
                self.config.history_kind,
                &payload,
                history_coordinate(chapter_id),
                SyncMarker::ChapterHistory,
                SnapshotAction::Snapshot,
            )
            .await?;

        info!("Published {} history entries for chapter {}", entries, chapter_id);
        Ok(report)
    }

    /// Fetches the newest history snapshot of a chapter and saves its
    /// entries locally.
    pub async fn restore_chapter_snapshots(
        &self,
        chapter_id: &ChapterId,
    ) -> SyncResult<RestoreOutcome> {
        let pubkey = self.session.require_pubkey().await?;
        let relays = self.require_relays().await?;
        let key = self.scoped_key(&self.config.history_scope).await?;

        let coordinate = history_coordinate(chapter_id);
        let filter = EventFilter::new()
            .kinds(self.config.history_restore_kinds.iter().copied())
            .author(pubkey)
            .identifier(coordinate.clone())
            .sync_key(key.public_key_hex())
            .limit(self.config.restore_limit);
        let Some(latest) = self
            .fetch_latest(&relays, &filter, SyncMarker::ChapterHistory)
            .await?
        else {
            debug!("No history snapshots for chapter {}", chapter_id);
            return Ok(RestoreOutcome::Noop);
        };

        if self.session.last_applied(&coordinate).await.as_deref() == Some(latest.id.as_str()) {
            debug!("History snapshot {} already applied", latest.id);
            return Ok(RestoreOutcome::AlreadyApplied);
        }

        let payload: HistoryPayload = codec::decode(&latest.content, &key.conversation_key()?)?;
        if payload.chapter_id != *chapter_id {
            return Err(SyncError::MalformedPayload(format!(
                "history payload for chapter {} published under {}",
                payload.chapter_id, coordinate
            )));
        }
        let report = self
            .applicator
            .apply_history(&payload, self.store.as_ref())
            .await?;

        self.session.record_applied(&coordinate, &latest.id).await;
        info!(
            "Restored {} history entries for chapter {}",
            report.history_saved, chapter_id
        );
        Ok(RestoreOutcome::Applied(report))
    }

    // ── Internals ────────────────────────────────────────────────

    /// Enabled relays, failing before any signer or network call when
    /// there are none.
    async fn require_relays(&self) -> SyncResult<Vec<String>> {
        let relays = self.settings.enabled_relay_urls().await?;
        if relays.is_empty() {
            return Err(SyncError::NoRelaysConfigured);
        }
        Ok(relays)
    }

    async fn scoped_key(&self, scope: &str) -> SyncResult<ScopedKey> {
        self.session
            .get_scoped_key(scope, self.signer.as_ref(), self.config.seed_timeout)
            .await
    }

    async fn lock_book(&self, book_id: BookId) -> BookLockGuard<'_> {
        self.book_locks.acquire(book_id).await
    }

    async fn publish_encrypted<T: serde::Serialize>(
        &self,
        relays: &[String],
        scope: &str,
        kind: u16,
        payload: &T,
        d: String,
        marker: SyncMarker,
        action: SnapshotAction,
    ) -> SyncResult<PublishReport> {
        let key = self.scoped_key(scope).await?;
        let content = codec::encode(payload, &key.conversation_key()?)?;

        let template = EventTemplate::new(kind, Millis::now().as_unix_seconds(), content)
            .with_tag(SyncTag::Identifier(d))
            .with_tag(SyncTag::Marker(marker))
            .with_tag(SyncTag::SyncKey(key.public_key_hex().to_string()))
            .with_tag(SyncTag::Version(PAYLOAD_VERSION))
            .with_tag(SyncTag::Action(action));

        let event = self.signer.sign_event(template).await?;
        Ok(publish::publish(self.transport.as_ref(), relays, &event).await)
    }

    /// Newest event matching `filter` that carries `marker`.
    ///
    /// Each kind is fetched on its own with its own limit, so a busy kind
    /// (the generic app-data kind other apps also publish) cannot push the
    /// others out of the result. Candidates are re-checked locally since
    /// relays ignore the sync-key constraint.
    async fn fetch_latest(
        &self,
        relays: &[String],
        filter: &EventFilter,
        marker: SyncMarker,
    ) -> SyncResult<Option<SignedEvent>> {
        let filters: Vec<EventFilter> = if filter.kinds.len() <= 1 {
            vec![filter.clone()]
        } else {
            filter
                .kinds
                .iter()
                .map(|kind| EventFilter {
                    kinds: vec![*kind],
                    ..filter.clone()
                })
                .collect()
        };
        let batches = try_join_all(filters.iter().map(|f| self.transport.fetch(relays, f))).await?;

        let candidates: Vec<SignedEvent> = batches.into_iter().flatten().collect();
        let fetched = candidates.len();
        let latest = candidates
            .into_iter()
            .filter(|e| filter.matches(e))
            .filter(|e| e.tag_value(SYNC_MARKER_TAG) == Some(marker.as_str()))
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| b.id.cmp(&a.id)));
        debug!(
            "Fetched {} {} candidates over {} kinds, latest {:?}",
            fetched,
            marker.as_str(),
            filters.len(),
            latest.as_ref().map(|e| &e.id)
        );
        Ok(latest)
    }
}

// ── Per-book locks ───────────────────────────────────────────────

/// Async locks keyed by book. A book has an entry only while some task
/// holds or waits on its lock.
#[derive(Debug, Default)]
struct BookLocks {
    locks: std::sync::Mutex<HashMap<BookId, Arc<Mutex<()>>>>,
}

impl BookLocks {
    async fn acquire(&self, book_id: BookId) -> BookLockGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(book_id).or_default())
        };
        let entry = BookLockEntry {
            locks: self,
            book_id,
            lock,
        };
        let held = Arc::clone(&entry.lock).lock_owned().await;
        BookLockGuard {
            _held: held,
            _entry: entry,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// One task's claim on a book's lock. Dropping the last claim removes the
/// book from the map, including when the task gave up while waiting.
#[derive(Debug)]
struct BookLockEntry<'a> {
    locks: &'a BookLocks,
    book_id: BookId,
    lock: Arc<Mutex<()>>,
}

impl Drop for BookLockEntry<'_> {
    fn drop(&mut self) {
        let mut locks = self
            .locks
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Only the map and this claim still reference the lock.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.book_id);
        }
    }
}

/// Held lock on one book. Fields drop in order: the lock is released
/// before the claim is cleaned up.
#[derive(Debug)]
struct BookLockGuard<'a> {
    _held: OwnedMutexGuard<()>,
    _entry: BookLockEntry<'a>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AuthState;
    use crate::settings::StaticRelaySettings;
    use crate::signer::KeysSigner;
    use crate::transport::mock::MockRelayTransport;
    use binder_store::MemoryDraftStore;
    use binder_types::ChapterDraft;
    use futures::FutureExt;

    const RELAY: &str = "wss://relay.example.com";

    fn draft_sync(store: Arc<MemoryDraftStore>) -> DraftSync {
        let signer = KeysSigner::generate();
        let auth = AuthState::delegated(
            signer.keys().public_key().to_hex(),
            signer.secret_key_hex(),
        );
        DraftSync::new(
            store,
            Arc::new(signer),
            Arc::new(StaticRelaySettings::new([RELAY]).unwrap()),
            Arc::new(MockRelayTransport::new()),
            Arc::new(SyncSession::logged_in(auth)),
        )
    }

    #[tokio::test]
    async fn released_locks_leave_no_entries() {
        let locks = BookLocks::default();
        {
            let _a = locks.acquire(BookId::new()).await;
            let _b = locks.acquire(BookId::new()).await;
            assert_eq!(locks.len(), 2);
        }
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn contended_entry_lives_until_last_holder() {
        let locks = BookLocks::default();
        let id = BookId::new();

        let first = locks.acquire(id).await;
        let mut waiter = Box::pin(locks.acquire(id));
        assert!((&mut waiter).now_or_never().is_none());

        drop(first);
        assert_eq!(locks.len(), 1);
        let second = waiter.await;
        assert_eq!(locks.len(), 1);

        drop(second);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn abandoned_wait_leaves_no_entry() {
        let locks = BookLocks::default();
        let id = BookId::new();

        let first = locks.acquire(id).await;
        let mut waiter = Box::pin(locks.acquire(id));
        assert!((&mut waiter).now_or_never().is_none());
        drop(waiter);
        assert_eq!(locks.len(), 1);

        drop(first);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn syncing_many_books_leaves_no_locks_behind() {
        let store = Arc::new(MemoryDraftStore::new());
        let sync = draft_sync(store.clone());

        let mut ids = Vec::new();
        for i in 0..8 {
            let mut book = Book::new(format!("Book {i}"));
            let chapter = ChapterDraft::new(&book, "Opening");
            book.append_chapter(chapter.id);
            store.save_book(&book).await.unwrap();
            store.save_chapter(&chapter).await.unwrap();
            ids.push(book.id);
        }

        let results = futures::future::join_all(ids.iter().map(|id| sync.sync_book(id))).await;
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(sync.book_locks.len(), 0);

        let book = store.get_book(&ids[0]).await.unwrap().unwrap();
        sync.notify_book_deletion(&book).await.unwrap();
        assert_eq!(sync.book_locks.len(), 0);
    }
}
