//! Scope-bound key derivation.
//!
//! `private = SHA-256(base_secret ":" scope)`, `public` = BIP-340 x-only
//! public key of `private`. Keys live only in memory and are zeroized on
//! drop.

use crate::cipher::{ConversationKey, derive_conversation_key};
use crate::error::{CryptoError, CryptoResult};
use nostr::{Keys, SecretKey};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of a scope secret key in bytes.
pub const KEY_SIZE: usize = 32;

/// A keypair derived for one scope.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ScopedKey {
    secret: [u8; KEY_SIZE],
    #[zeroize(skip)]
    public_key_hex: String,
    #[zeroize(skip)]
    scope: String,
}

impl ScopedKey {
    /// The scope this key was derived for.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Hex x-only public key. Published in the sync-key tag so restores can
    /// find events sealed with this key.
    pub fn public_key_hex(&self) -> &str {
        &self.public_key_hex
    }

    /// Hex secret key.
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret)
    }

    /// Raw secret key bytes.
    pub fn secret_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.secret
    }

    /// Conversation key this scope encrypts its payloads with.
    pub fn conversation_key(&self) -> CryptoResult<ConversationKey> {
        derive_conversation_key(&self.secret, &self.public_key_hex)
    }
}

impl PartialEq for ScopedKey {
    fn eq(&self, other: &Self) -> bool {
        self.secret == other.secret && self.scope == other.scope
    }
}

impl Eq for ScopedKey {}

impl std::fmt::Debug for ScopedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedKey")
            .field("scope", &self.scope)
            .field("public_key", &self.public_key_hex)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Derives the key for `scope` from `base_secret`.
///
/// The same inputs always produce the same key.
pub fn derive_scoped_key(base_secret: &str, scope: &str) -> CryptoResult<ScopedKey> {
    let mut material = format!("{base_secret}:{scope}");
    let digest = Sha256::digest(material.as_bytes());
    material.zeroize();

    let mut secret = [0u8; KEY_SIZE];
    secret.copy_from_slice(&digest);

    let secret_key = SecretKey::from_slice(&secret)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let public_key = Keys::new(secret_key).public_key();

    Ok(ScopedKey {
        secret,
        public_key_hex: public_key.to_hex(),
        scope: scope.to_string(),
    })
}
