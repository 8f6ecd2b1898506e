//! SQLite-backed draft store.
//!
//! Each entity is stored as its wire JSON next to the columns queries filter
//! and sort on. The connection sits behind a mutex and every call runs on the
//! blocking pool.

use crate::error::{StoreError, StoreResult};
use crate::store::DraftStore;
use async_trait::async_trait;
use binder_types::{Book, BookId, ChapterDraft, ChapterId, DraftSnapshot, SnapshotId};
use rusqlite::{Connection, OptionalExtension, params};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS books (
        id TEXT PRIMARY KEY,
        updated_at INTEGER NOT NULL,
        data TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chapters (
        id TEXT PRIMARY KEY,
        book_id TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        data TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_chapters_book ON chapters(book_id);

    CREATE TABLE IF NOT EXISTS history (
        id TEXT PRIMARY KEY,
        chapter_id TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        data TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_history_chapter ON history(chapter_id);
";

/// Persistent draft store backed by SQLite.
#[derive(Clone)]
pub struct SqliteDraftStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDraftStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening draft store");
        Self::init(Connection::open(path)?)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn millis_column(value: u64) -> StoreResult<i64> {
    i64::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("timestamp out of range: {value}")))
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<String>) -> StoreResult<Vec<T>> {
    rows.iter()
        .map(|data| serde_json::from_str(data).map_err(StoreError::from))
        .collect()
}

fn query_single<T: DeserializeOwned>(
    conn: &Connection,
    sql: &str,
    id: String,
) -> StoreResult<Option<T>> {
    let data: Option<String> = conn
        .query_row(sql, params![id], |row| row.get(0))
        .optional()?;
    data.map(|d| serde_json::from_str(&d).map_err(StoreError::from))
        .transpose()
}

fn query_many(conn: &Connection, sql: &str, id: String) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[async_trait]
impl DraftStore for SqliteDraftStore {
    async fn get_book(&self, id: &BookId) -> StoreResult<Option<Book>> {
        let id = id.to_string();
        self.with_conn(move |conn| query_single(conn, "SELECT data FROM books WHERE id = ?1", id))
            .await
    }

    async fn list_books(&self) -> StoreResult<Vec<Book>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT data FROM books ORDER BY updated_at DESC")?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            decode_rows(rows)
        })
        .await
    }

    async fn save_book(&self, book: &Book) -> StoreResult<()> {
        let id = book.id.to_string();
        let updated_at = millis_column(book.updated_at.as_millis())?;
        let data = serde_json::to_string(book)?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO books (id, updated_at, data) VALUES (?1, ?2, ?3)",
                params![id, updated_at, data],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete_book(&self, id: &BookId) -> StoreResult<()> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM books WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
    }

    async fn get_chapter(&self, id: &ChapterId) -> StoreResult<Option<ChapterDraft>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            query_single(conn, "SELECT data FROM chapters WHERE id = ?1", id)
        })
        .await
    }

    async fn get_chapters_for_book(&self, book_id: &BookId) -> StoreResult<Vec<ChapterDraft>> {
        let book_id = book_id.to_string();
        self.with_conn(move |conn| {
            let rows = query_many(
                conn,
                "SELECT data FROM chapters WHERE book_id = ?1 ORDER BY created_at ASC, id ASC",
                book_id,
            )?;
            decode_rows(rows)
        })
        .await
    }

    async fn save_chapter(&self, chapter: &ChapterDraft) -> StoreResult<()> {
        let id = chapter.id.to_string();
        let book_id = chapter.book_id.to_string();
        let created_at = millis_column(chapter.created_at.as_millis())?;
        let data = serde_json::to_string(chapter)?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO chapters (id, book_id, created_at, data)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, book_id, created_at, data],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete_chapter(&self, id: &ChapterId) -> StoreResult<()> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM chapters WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
    }

    async fn delete_chapters_for_book(&self, book_id: &BookId) -> StoreResult<usize> {
        let book_id = book_id.to_string();
        self.with_conn(move |conn| {
            let removed =
                conn.execute("DELETE FROM chapters WHERE book_id = ?1", params![book_id])?;
            Ok(removed)
        })
        .await
    }

    async fn get_chapter_history(&self, chapter_id: &ChapterId) -> StoreResult<Vec<DraftSnapshot>> {
        let chapter_id = chapter_id.to_string();
        self.with_conn(move |conn| {
            let rows = query_many(
                conn,
                "SELECT data FROM history WHERE chapter_id = ?1 ORDER BY created_at DESC, id DESC",
                chapter_id,
            )?;
            decode_rows(rows)
        })
        .await
    }

    async fn save_history_entry(&self, entry: &DraftSnapshot) -> StoreResult<()> {
        let id = entry.id.to_string();
        let chapter_id = entry.chapter_id.to_string();
        let created_at = millis_column(entry.created_at.as_millis())?;
        let data = serde_json::to_string(entry)?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO history (id, chapter_id, created_at, data)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, chapter_id, created_at, data],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete_history_entries(&self, ids: &[SnapshotId]) -> StoreResult<usize> {
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let mut removed = 0;
            {
                let mut stmt = tx.prepare("DELETE FROM history WHERE id = ?1")?;
                for id in &ids {
                    removed += stmt.execute(params![id])?;
                }
            }
            tx.commit()?;
            Ok(removed)
        })
        .await
    }
}
