//! Encrypted draft sync for Binder.
//!
//! Books and chapter histories are exported as full-state snapshots,
//! encrypted to a key derived per scope from the user's identity, signed,
//! and published to every enabled relay. Restoring fetches the newest
//! snapshot, decrypts it and merges it into the local store with
//! last-writer-wins.
//!
//! # Architecture
//!
//! - [`SyncSession`] holds who is logged in, the derived-key cache and the
//!   restore de-duplication markers
//! - [`codec`] turns payloads into NIP-44 ciphertext and back
//! - [`publish`] fans a signed event out to relays
//! - [`SnapshotApplicator`] resolves conflicts into the [`DraftStore`]
//! - [`DraftSync`] sequences the whole thing
//! - [`SyncSupervisor`] runs sync work in the background and logs failures
//!
//! Collaborators sit behind traits: [`Signer`], [`RelaySettings`] and
//! [`RelayTransport`]. [`KeysSigner`] and [`NostrRelayTransport`] are the
//! `nostr`-backed implementations.
//!
//! [`DraftStore`]: binder_store::DraftStore

mod applicator;
pub mod codec;
mod config;
mod error;
mod event;
mod nostr_transport;
mod orchestrator;
pub mod publish;
mod session;
mod settings;
mod signer;
mod status;
mod supervisor;
pub mod tags;
pub mod transport;

pub use applicator::{ApplyReport, SnapshotApplicator};
pub use config::{
    CHAPTER_HISTORY_KIND, DRAFT_SNAPSHOT_KIND, LEGACY_DRAFT_SNAPSHOT_KIND, RelayTransportConfig,
    SEED_EVENT_CONTENT, SEED_EVENT_CREATED_AT, SEED_EVENT_KIND, SyncConfig,
};
pub use error::{SyncError, SyncResult};
pub use event::{EventFilter, EventTemplate, SignedEvent};
pub use nostr_transport::NostrRelayTransport;
pub use orchestrator::{DraftSync, RestoreOutcome};
pub use publish::PublishReport;
pub use session::{AuthState, SyncSession};
pub use settings::{RelayEntry, RelaySettings, StaticRelaySettings, validate_relay_url};
pub use signer::{KeysSigner, Signer};
pub use status::{SyncStatus, SyncStatusTracker};
pub use supervisor::{SupervisorReport, SyncCommand, SyncSupervisor};
pub use tags::{SyncMarker, SyncTag};
pub use transport::RelayTransport;
