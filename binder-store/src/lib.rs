//! Local draft storage for Binder.
//!
//! The store exclusively owns persisted drafts. The sync layer reads and
//! writes them only through the [`DraftStore`] trait, which has two
//! implementations:
//!
//! - [`MemoryDraftStore`]: process-local maps, used by tests and embedders
//!   that persist elsewhere
//! - [`SqliteDraftStore`]: drafts as JSON documents in a SQLite file
//!
//! [`history`] adds revision-history capture and pruning on top of any store.

mod error;
pub mod history;
mod memory;
mod sqlite;
mod store;

pub use error::{StoreError, StoreResult};
pub use history::{HistoryPolicy, create_history_entry, prune_history};
pub use memory::MemoryDraftStore;
pub use sqlite::SqliteDraftStore;
pub use store::DraftStore;
