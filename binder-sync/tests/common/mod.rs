//! Shared test helpers for draft sync tests.

#![allow(dead_code)]

use async_trait::async_trait;
use binder_crypto::ScopedKey;
use binder_store::{DraftStore, MemoryDraftStore};
use binder_sync::codec;
use binder_sync::tags::SyncMarker;
use binder_sync::transport::mock::MockRelayTransport;
use binder_sync::{
    AuthState, DRAFT_SNAPSHOT_KIND, DraftSync, EventFilter, EventTemplate, KeysSigner,
    RelayTransport, SignedEvent, Signer, StaticRelaySettings, SyncConfig, SyncError, SyncResult,
    SyncSession, SyncTag,
};
use binder_types::{Book, ChapterDraft, PAYLOAD_VERSION, SnapshotAction};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing_subscriber::EnvFilter;

pub const RELAY_A: &str = "wss://relay-a.example.com";
pub const RELAY_B: &str = "wss://relay-b.example.com";

/// Fixed test identity.
pub const TEST_SECRET: &str = "6b911fd37cdf5c81d4c0adb1ab7fa822ed253ab0ad9aa18d77257c88b29b718e";

/// How a [`RecordingSigner`] responds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerMode {
    Sign,
    Reject,
    Unavailable,
    /// Never answers.
    Hang,
}

/// Signer that counts calls and can be told to misbehave.
pub struct RecordingSigner {
    inner: KeysSigner,
    calls: AtomicUsize,
    mode: Mutex<SignerMode>,
}

impl RecordingSigner {
    pub fn new() -> Self {
        Self {
            inner: KeysSigner::parse(TEST_SECRET).unwrap(),
            calls: AtomicUsize::new(0),
            mode: Mutex::new(SignerMode::Sign),
        }
    }

    pub fn set_mode(&self, mode: SignerMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn pubkey(&self) -> String {
        self.inner.keys().public_key().to_hex()
    }

    pub fn secret_hex(&self) -> String {
        self.inner.secret_key_hex()
    }
}

#[async_trait]
impl Signer for RecordingSigner {
    async fn public_key(&self) -> SyncResult<String> {
        self.inner.public_key().await
    }

    async fn sign_event(&self, template: EventTemplate) -> SyncResult<SignedEvent> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mode = *self.mode.lock().unwrap();
        match mode {
            SignerMode::Sign => self.inner.sign_event(template).await,
            SignerMode::Reject => Err(SyncError::UserRejected),
            SignerMode::Unavailable => Err(SyncError::SignerUnavailable("no extension".into())),
            SignerMode::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Err(SyncError::SignerUnavailable("gave up".into()))
            }
        }
    }
}

/// One device: its own store and session, sharing relays with others.
pub struct Device {
    pub store: Arc<MemoryDraftStore>,
    pub signer: Arc<RecordingSigner>,
    pub transport: Arc<MockRelayTransport>,
    pub session: Arc<SyncSession>,
    pub sync: DraftSync,
}

impl Device {
    /// A delegated session, so every device of the test identity derives the
    /// same scope keys.
    pub fn new(transport: Arc<MockRelayTransport>) -> Self {
        Self::with_relays(transport, &[RELAY_A, RELAY_B])
    }

    pub fn with_relays(transport: Arc<MockRelayTransport>, relays: &[&str]) -> Self {
        let signer = Arc::new(RecordingSigner::new());
        let auth = AuthState::delegated(signer.pubkey(), signer.secret_hex());
        Self::build(transport.clone(), transport, relays, signer, SyncSession::logged_in(auth))
    }

    /// Like [`Device::with_relays`], but the orchestrator talks to relays
    /// through `sync_transport` while `transport` still exposes the shared
    /// relay contents.
    pub fn with_transport(
        transport: Arc<MockRelayTransport>,
        sync_transport: Arc<dyn RelayTransport>,
        relays: &[&str],
    ) -> Self {
        let signer = Arc::new(RecordingSigner::new());
        let auth = AuthState::delegated(signer.pubkey(), signer.secret_hex());
        Self::build(transport, sync_transport, relays, signer, SyncSession::logged_in(auth))
    }

    pub fn logged_out(transport: Arc<MockRelayTransport>) -> Self {
        Self::build(
            transport.clone(),
            transport,
            &[RELAY_A, RELAY_B],
            Arc::new(RecordingSigner::new()),
            SyncSession::new(),
        )
    }

    fn build(
        transport: Arc<MockRelayTransport>,
        sync_transport: Arc<dyn RelayTransport>,
        relays: &[&str],
        signer: Arc<RecordingSigner>,
        session: SyncSession,
    ) -> Self {
        init_tracing();
        let store = Arc::new(MemoryDraftStore::new());
        let session = Arc::new(session);
        let settings = StaticRelaySettings::new(relays.iter().copied()).unwrap();
        let sync = DraftSync::new(
            store.clone(),
            signer.clone(),
            Arc::new(settings),
            sync_transport,
            session.clone(),
        )
        .with_config(SyncConfig {
            seed_timeout: Duration::from_secs(5),
            ..SyncConfig::default()
        });
        Self {
            store,
            signer,
            transport,
            session,
            sync,
        }
    }

    /// Scope key this device's sync uses for book snapshots.
    pub async fn snapshot_key(&self) -> ScopedKey {
        self.session
            .get_scoped_key(
                &self.sync.config().snapshot_scope,
                self.signer.as_ref(),
                Duration::from_secs(5),
            )
            .await
            .unwrap()
    }

    /// Builds and signs a sync event the way another device would, with a
    /// chosen `created_at`.
    pub async fn signed_event<T: Serialize>(
        &self,
        payload: &T,
        d: &str,
        action: SnapshotAction,
        created_at: u64,
    ) -> SignedEvent {
        let key = self.snapshot_key().await;
        let content = codec::encode(payload, &key.conversation_key().unwrap()).unwrap();
        self.signed_raw(&content, d, key.public_key_hex(), action, created_at)
            .await
    }

    /// Signs a book snapshot event around arbitrary `content`.
    pub async fn signed_raw(
        &self,
        content: &str,
        d: &str,
        sync_key: &str,
        action: SnapshotAction,
        created_at: u64,
    ) -> SignedEvent {
        let template = EventTemplate::new(DRAFT_SNAPSHOT_KIND, created_at, content)
            .with_tag(SyncTag::Identifier(d.to_string()))
            .with_tag(SyncTag::Marker(SyncMarker::DraftSnapshot))
            .with_tag(SyncTag::SyncKey(sync_key.to_string()))
            .with_tag(SyncTag::Version(PAYLOAD_VERSION))
            .with_tag(SyncTag::Action(action));
        KeysSigner::parse(TEST_SECRET)
            .unwrap()
            .sign_event(template)
            .await
            .unwrap()
    }
}

/// Relays that park publishes of chosen `d` values until released. All
/// traffic is forwarded to the wrapped mock.
pub struct GatedTransport {
    inner: Arc<MockRelayTransport>,
    held: Mutex<HashSet<String>>,
    entered: Mutex<Vec<String>>,
    gate: Semaphore,
}

impl GatedTransport {
    pub fn new(inner: Arc<MockRelayTransport>) -> Self {
        Self {
            inner,
            held: Mutex::new(HashSet::new()),
            entered: Mutex::new(Vec::new()),
            gate: Semaphore::new(0),
        }
    }

    /// Parks every later publish whose `d` tag is `d`.
    pub fn hold(&self, d: &str) {
        self.held.lock().unwrap().insert(d.to_string());
    }

    /// Lets `count` parked publishes through.
    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }

    /// How many publishes for `d` have reached the relays so far, parked or not.
    pub fn entered(&self, d: &str) -> usize {
        self.entered.lock().unwrap().iter().filter(|e| *e == d).count()
    }

    /// Waits until a publish for `d` has reached the relays.
    pub async fn wait_entered(&self, d: &str) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.entered(d) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("publish never reached the relays");
    }
}

#[async_trait]
impl RelayTransport for GatedTransport {
    async fn publish(&self, relay: &str, event: &SignedEvent) -> SyncResult<()> {
        if let Some(d) = event.identifier() {
            self.entered.lock().unwrap().push(d.to_string());
            let parked = self.held.lock().unwrap().contains(d);
            if parked {
                self.gate.acquire().await.unwrap().forget();
            }
        }
        self.inner.publish(relay, event).await
    }

    async fn fetch(&self, relays: &[String], filter: &EventFilter) -> SyncResult<Vec<SignedEvent>> {
        self.inner.fetch(relays, filter).await
    }
}

/// Routes sync logs to the test output; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A book with `count` chapters, all linked through `chapter_order`.
pub fn book_with_chapters(title: &str, count: usize) -> (Book, Vec<ChapterDraft>) {
    let mut book = Book::new(title);
    let mut chapters = Vec::new();
    for i in 0..count {
        let chapter = ChapterDraft::new(&book, format!("Chapter {}", i + 1))
            .with_content(format!("Once upon a time, part {}.", i + 1));
        book.append_chapter(chapter.id);
        chapters.push(chapter);
    }
    (book, chapters)
}

pub async fn save_all(store: &dyn DraftStore, book: &Book, chapters: &[ChapterDraft]) {
    store.save_book(book).await.unwrap();
    for chapter in chapters {
        store.save_chapter(chapter).await.unwrap();
    }
}

pub fn shared_relays() -> Arc<MockRelayTransport> {
    Arc::new(MockRelayTransport::new())
}

/// Tag value of `name` on `event`.
pub fn tag(event: &SignedEvent, name: &str) -> Option<String> {
    event.tag_value(name).map(str::to_string)
}
