//! Chapter revision history.
//!
//! Every capture is followed by a prune: entries older than
//! [`HistoryPolicy::max_age`] go, and of the rest only the newest
//! [`HistoryPolicy::max_entries`] are kept.

use crate::error::StoreResult;
use crate::store::DraftStore;
use binder_types::{ChapterDraft, ChapterId, DraftSnapshot, Millis, SnapshotId};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

/// Retention limits for chapter history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPolicy {
    /// Entries kept per chapter.
    pub max_entries: usize,
    /// Entries older than this are dropped.
    pub max_age: Duration,
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        Self {
            max_entries: 30,
            max_age: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}

/// Captures the chapter's current content as a history entry, then prunes
/// the chapter's history.
///
/// A failed prune is logged and does not fail the capture.
pub async fn create_history_entry(
    store: &dyn DraftStore,
    chapter: &ChapterDraft,
    reason: &str,
    policy: &HistoryPolicy,
) -> StoreResult<DraftSnapshot> {
    let entry = DraftSnapshot::new(chapter.id, chapter.content_md.clone(), reason);
    store.save_history_entry(&entry).await?;

    if let Err(e) = prune_history(store, &chapter.id, policy, Millis::now()).await {
        warn!(chapter = %chapter.id, error = %e, "history prune failed");
    }
    Ok(entry)
}

/// Deletes history entries of `chapter_id` that fall outside `policy` as of
/// `now`. Returns how many were deleted.
pub async fn prune_history(
    store: &dyn DraftStore,
    chapter_id: &ChapterId,
    policy: &HistoryPolicy,
    now: Millis,
) -> StoreResult<usize> {
    let entries = store.get_chapter_history(chapter_id).await?;
    let stale = stale_entries(&entries, policy, now);
    if stale.is_empty() {
        return Ok(0);
    }

    let removed = store.delete_history_entries(&stale).await?;
    debug!(chapter = %chapter_id, removed, "pruned chapter history");
    Ok(removed)
}

fn stale_entries(
    entries: &[DraftSnapshot],
    policy: &HistoryPolicy,
    now: Millis,
) -> Vec<SnapshotId> {
    let max_age_ms = u64::try_from(policy.max_age.as_millis()).unwrap_or(u64::MAX);

    let mut newest_first: Vec<&DraftSnapshot> = entries.iter().collect();
    newest_first.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut stale = Vec::new();
    let mut seen = HashSet::new();
    for (rank, entry) in newest_first.into_iter().enumerate() {
        let expired = now.saturating_since(entry.created_at) > max_age_ms;
        if (expired || rank >= policy.max_entries) && seen.insert(entry.id) {
            stale.push(entry.id);
        }
    }
    stale
}
