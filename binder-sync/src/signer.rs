//! Event signing.

use crate::error::{SyncError, SyncResult};
use crate::event::{EventTemplate, SignedEvent};
use async_trait::async_trait;
use nostr::{EventBuilder, JsonUtil, Keys, Kind, Tag, Timestamp};
use tracing::debug;

/// Something that can sign events for the logged-in identity.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Hex public key of the identity events are signed as.
    async fn public_key(&self) -> SyncResult<String>;

    /// Signs `template`.
    ///
    /// Fails with [`SyncError::SignerUnavailable`] when the signer cannot be
    /// reached, [`SyncError::UserRejected`] when the user declines and
    /// [`SyncError::SignFailed`] otherwise.
    async fn sign_event(&self, template: EventTemplate) -> SyncResult<SignedEvent>;
}

/// Signs with a local secret key (BIP-340 Schnorr).
#[derive(Clone)]
pub struct KeysSigner {
    keys: Keys,
}

impl KeysSigner {
    pub fn new(keys: Keys) -> Self {
        Self { keys }
    }

    /// Parses a hex or bech32 (`nsec`) secret key.
    pub fn parse(secret_key: &str) -> SyncResult<Self> {
        let keys = Keys::parse(secret_key).map_err(|e| SyncError::SignFailed(e.to_string()))?;
        Ok(Self { keys })
    }

    /// Fresh random identity.
    pub fn generate() -> Self {
        Self {
            keys: Keys::generate(),
        }
    }

    /// Hex secret key. Usable as the local secret of a delegated session.
    pub fn secret_key_hex(&self) -> String {
        self.keys.secret_key().to_secret_hex()
    }

    pub fn keys(&self) -> &Keys {
        &self.keys
    }
}

impl std::fmt::Debug for KeysSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeysSigner")
            .field("public_key", &self.keys.public_key().to_hex())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Signer for KeysSigner {
    async fn public_key(&self) -> SyncResult<String> {
        Ok(self.keys.public_key().to_hex())
    }

    async fn sign_event(&self, template: EventTemplate) -> SyncResult<SignedEvent> {
        let tags = template
            .tags
            .iter()
            .map(|t| Tag::parse(t.as_slice()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SyncError::SignFailed(format!("invalid tag: {e}")))?;

        let event = EventBuilder::new(Kind::Custom(template.kind), template.content)
            .tags(tags)
            .custom_created_at(Timestamp::from(template.created_at))
            .sign_with_keys(&self.keys)
            .map_err(|e| SyncError::SignFailed(e.to_string()))?;

        debug!("Signed event {} (kind={})", event.id, template.kind);
        to_signed_event(&event)
    }
}

/// Converts a `nostr` event into the wire struct.
pub(crate) fn to_signed_event(event: &nostr::Event) -> SyncResult<SignedEvent> {
    serde_json::from_str(&event.as_json())
        .map_err(|e| SyncError::MalformedPayload(format!("unexpected event shape: {e}")))
}

/// Converts the wire struct into a `nostr` event.
pub(crate) fn to_nostr_event(event: &SignedEvent) -> SyncResult<nostr::Event> {
    let json = serde_json::to_string(event)
        .map_err(|e| SyncError::MalformedPayload(e.to_string()))?;
    nostr::Event::from_json(json).map_err(|e| SyncError::MalformedPayload(e.to_string()))
}
