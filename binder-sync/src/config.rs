//! Compiled-in sync configuration.

use std::time::Duration;

/// Event kind for encrypted book snapshots, shared with the web client.
pub const DRAFT_SNAPSHOT_KIND: u16 = 40012;

/// Event kind for encrypted chapter history.
pub const CHAPTER_HISTORY_KIND: u16 = 40014;

/// Generic app-data kind earlier builds published both streams with. Still
/// read on restore, queried on its own so traffic from other apps cannot
/// crowd out Binder's kinds.
pub const LEGACY_DRAFT_SNAPSHOT_KIND: u16 = 30078;

/// Kind of the fixed template a signer signs to seed scope keys.
pub const SEED_EVENT_KIND: u16 = 40013;

/// Content of the seed template.
pub const SEED_EVENT_CONTENT: &str = "Binder sync key seed";

/// `created_at` of the seed template. Fixed so the signature is stable.
pub const SEED_EVENT_CREATED_AT: u64 = 1;

/// Configuration for draft sync.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Scope for book snapshot keys.
    pub snapshot_scope: String,
    /// Scope for chapter history keys.
    pub history_scope: String,
    /// Kind new book snapshots are published with.
    pub snapshot_kind: u16,
    /// Kinds accepted on book restore, newest protocol first.
    pub restore_kinds: Vec<u16>,
    /// Kind new chapter history is published with.
    pub history_kind: u16,
    /// Kinds accepted on history restore.
    pub history_restore_kinds: Vec<u16>,
    /// Maximum candidate events requested per kind on restore.
    pub restore_limit: usize,
    /// Upper bound on waiting for the seed signature.
    pub seed_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            snapshot_scope: "binder-sync".to_string(),
            history_scope: "binder-sync".to_string(),
            snapshot_kind: DRAFT_SNAPSHOT_KIND,
            restore_kinds: vec![DRAFT_SNAPSHOT_KIND, LEGACY_DRAFT_SNAPSHOT_KIND],
            history_kind: CHAPTER_HISTORY_KIND,
            history_restore_kinds: vec![CHAPTER_HISTORY_KIND, LEGACY_DRAFT_SNAPSHOT_KIND],
            restore_limit: 5,
            seed_timeout: Duration::from_secs(30),
        }
    }
}

/// Timeouts applied by network transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayTransportConfig {
    /// Time allowed to connect to one relay.
    pub connect_timeout: Duration,
    /// Time allowed for one relay to acknowledge a published event.
    pub publish_timeout: Duration,
    /// Time allowed for a fetch to collect events.
    pub fetch_timeout: Duration,
}

impl Default for RelayTransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            publish_timeout: Duration::from_secs(10),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}
