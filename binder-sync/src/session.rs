//! Per-login sync state.
//!
//! Everything that must not outlive a login lives here: who is logged in,
//! the derived scope keys and the ids of the last applied restore events.
//! [`SyncSession::logout`] drops all of it at once so nothing bleeds into
//! the next user's session.

use crate::config::{SEED_EVENT_CONTENT, SEED_EVENT_CREATED_AT, SEED_EVENT_KIND};
use crate::error::{SyncError, SyncResult};
use crate::event::EventTemplate;
use crate::signer::Signer;
use binder_crypto::{ScopedKey, derive_scoped_key};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Who is logged in.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthState {
    /// Hex public key of the user.
    pub pubkey: String,
    /// Secret of a delegated (remote-signer) session's local client key.
    /// When present, scope keys derive from it instead of a seed signature.
    pub local_secret: Option<String>,
}

impl AuthState {
    /// Session where every key derivation asks the signer for a seed.
    pub fn new(pubkey: impl Into<String>) -> Self {
        Self {
            pubkey: pubkey.into(),
            local_secret: None,
        }
    }

    /// Delegated session with a local client secret.
    pub fn delegated(pubkey: impl Into<String>, local_secret: impl Into<String>) -> Self {
        Self {
            pubkey: pubkey.into(),
            local_secret: Some(local_secret.into()),
        }
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("pubkey", &self.pubkey)
            .field(
                "local_secret",
                &self.local_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Session context shared by sync operations.
#[derive(Debug, Default)]
pub struct SyncSession {
    auth: RwLock<Option<AuthState>>,
    /// Derived keys by scope.
    keys: RwLock<HashMap<String, ScopedKey>>,
    /// Last applied restore event id by restore target.
    applied: RwLock<HashMap<String, String>>,
}

impl SyncSession {
    /// Creates a logged-out session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session already logged in as `auth`.
    pub fn logged_in(auth: AuthState) -> Self {
        Self {
            auth: RwLock::new(Some(auth)),
            ..Self::default()
        }
    }

    /// Logs in as `auth`, discarding any state of a previous login.
    pub async fn login(&self, auth: AuthState) {
        self.clear().await;
        info!("Sync session started for {}", auth.pubkey);
        *self.auth.write().await = Some(auth);
    }

    /// Logs out and discards all session state.
    pub async fn logout(&self) {
        self.clear().await;
        *self.auth.write().await = None;
        info!("Sync session ended");
    }

    /// Discards derived keys and restore markers. Must run on logout.
    pub async fn clear(&self) {
        self.keys.write().await.clear();
        self.applied.write().await.clear();
    }

    pub async fn auth(&self) -> Option<AuthState> {
        self.auth.read().await.clone()
    }

    /// Public key of the logged-in user.
    pub async fn require_pubkey(&self) -> SyncResult<String> {
        self.auth
            .read()
            .await
            .as_ref()
            .map(|a| a.pubkey.clone())
            .ok_or(SyncError::NotAuthenticated)
    }

    /// Whether a key for `scope` is cached.
    pub async fn has_key(&self, scope: &str) -> bool {
        self.keys.read().await.contains_key(scope)
    }

    /// Returns the key for `scope`, deriving and caching it on first use.
    ///
    /// A delegated session derives from its local secret. Otherwise the
    /// signer signs the fixed seed template and the signature is the base
    /// secret; that request fails with [`SyncError::Timeout`] after
    /// `seed_timeout`.
    pub async fn get_scoped_key(
        &self,
        scope: &str,
        signer: &dyn Signer,
        seed_timeout: Duration,
    ) -> SyncResult<ScopedKey> {
        if let Some(key) = self.keys.read().await.get(scope) {
            return Ok(key.clone());
        }

        let auth = self.auth().await.ok_or(SyncError::NotAuthenticated)?;
        let base_secret = match auth.local_secret {
            Some(secret) => secret,
            None => seed_signature(signer, seed_timeout).await?,
        };
        let derived = derive_scoped_key(&base_secret, scope)?;

        let mut keys = self.keys.write().await;
        // A concurrent derivation may have won; keep its key so the session
        // never switches keys mid-flight.
        let key = keys.entry(scope.to_string()).or_insert(derived).clone();
        debug!("Derived sync key for scope {}: {}", scope, key.public_key_hex());
        Ok(key)
    }

    /// Id of the last event applied for `target`.
    pub async fn last_applied(&self, target: &str) -> Option<String> {
        self.applied.read().await.get(target).cloned()
    }

    /// Records that `event_id` was applied for `target`.
    pub async fn record_applied(&self, target: &str, event_id: &str) {
        self.applied
            .write()
            .await
            .insert(target.to_string(), event_id.to_string());
    }
}

async fn seed_signature(signer: &dyn Signer, seed_timeout: Duration) -> SyncResult<String> {
    let template = EventTemplate::new(SEED_EVENT_KIND, SEED_EVENT_CREATED_AT, SEED_EVENT_CONTENT);
    let signed = tokio::time::timeout(seed_timeout, signer.sign_event(template))
        .await
        .map_err(|_| SyncError::Timeout)??;
    Ok(signed.sig)
}
