//! Error types for the encryption layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// A public key could not be parsed.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Plaintext exceeds what a single NIP-44 payload can carry.
    #[error("payload too large: {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },

    /// Decryption failed (wrong key, tampered or malformed data).
    #[error("decryption failed: {0}")]
    Decryption(String),
}
