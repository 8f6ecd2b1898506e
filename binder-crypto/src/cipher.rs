//! NIP-44 v2 payload encryption.
//!
//! Key agreement, sealing and opening all come from the `nostr` crate's
//! NIP-44 v2 implementation. Ciphertext travels as standard base64, exactly
//! like NIP-44 event content.

use crate::error::{CryptoError, CryptoResult};
use base64::{Engine, engine::general_purpose::STANDARD};
use nostr::nips::nip44::v2;
use nostr::{PublicKey, SecretKey};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Largest plaintext a single NIP-44 v2 payload can carry.
pub const MAX_PLAINTEXT_SIZE: usize = 65_535;

/// Symmetric key shared by the two sides of a NIP-44 conversation.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ConversationKey {
    bytes: [u8; 32],
}

impl ConversationKey {
    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    fn to_nip44(&self) -> v2::ConversationKey {
        v2::ConversationKey::new(self.bytes)
    }
}

impl std::fmt::Debug for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Agrees the NIP-44 v2 conversation key between `secret` and the x-only
/// public key `public_key_hex`.
pub fn derive_conversation_key(
    secret: &[u8; 32],
    public_key_hex: &str,
) -> CryptoResult<ConversationKey> {
    let secret_key =
        SecretKey::from_slice(secret).map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let public_key = PublicKey::from_hex(public_key_hex)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;

    let derived = v2::ConversationKey::derive(&secret_key, &public_key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let bytes: [u8; 32] = derived
        .as_bytes()
        .try_into()
        .map_err(|_| CryptoError::KeyDerivation("conversation key is not 32 bytes".into()))?;
    Ok(ConversationKey::from_bytes(bytes))
}

/// Encrypts `plaintext` and returns base64 NIP-44 payload.
///
/// Plaintext over [`MAX_PLAINTEXT_SIZE`] yields [`CryptoError::PayloadTooLarge`]
/// so callers can tell "too big" apart from other failures.
pub fn encrypt_string(key: &ConversationKey, plaintext: &str) -> CryptoResult<String> {
    let size = plaintext.len();
    if size > MAX_PLAINTEXT_SIZE {
        return Err(CryptoError::PayloadTooLarge {
            size,
            max: MAX_PLAINTEXT_SIZE,
        });
    }
    if size == 0 {
        return Err(CryptoError::Encryption("plaintext is empty".to_string()));
    }

    let sealed = v2::encrypt_to_bytes(&key.to_nip44(), plaintext.as_bytes())
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    Ok(STANDARD.encode(sealed))
}

/// Decrypts a base64 NIP-44 payload produced by [`encrypt_string`].
pub fn decrypt_string(key: &ConversationKey, encoded: &str) -> CryptoResult<String> {
    let sealed = STANDARD
        .decode(encoded.trim())
        .map_err(|e| CryptoError::Decryption(format!("invalid base64: {e}")))?;
    let plaintext = v2::decrypt_to_bytes(&key.to_nip44(), &sealed)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;
    String::from_utf8(plaintext).map_err(|e| CryptoError::Decryption(format!("invalid UTF-8: {e}")))
}
