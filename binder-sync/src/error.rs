//! Error types for the sync layer.

use binder_crypto::CryptoError;
use binder_store::StoreError;
use thiserror::Error;
use tokio::task::JoinError;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No user is logged in.
    #[error("not authenticated")]
    NotAuthenticated,

    /// A local entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The relay list is empty.
    #[error("no relays configured for draft sync")]
    NoRelaysConfigured,

    /// The signer could not be reached.
    #[error("signer unavailable: {0}")]
    SignerUnavailable(String),

    /// The user declined the signing request.
    #[error("signing request rejected by user")]
    UserRejected,

    /// The signer failed to sign.
    #[error("signing failed: {0}")]
    SignFailed(String),

    /// The scope key could not be derived.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Encryption failed for a reason other than size.
    #[error("failed to encrypt snapshot: {0}")]
    EncryptFailed(String),

    /// The serialized snapshot exceeds what one encrypted event can carry.
    #[error("snapshot too large: {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },

    /// Ciphertext could not be opened (wrong key, tampered or malformed).
    #[error("failed to decrypt snapshot: {0}")]
    DecryptFailed(String),

    /// Decrypted data is not a valid payload.
    #[error("malformed snapshot payload: {0}")]
    MalformedPayload(String),

    /// The payload was written by an unknown protocol version.
    #[error("unsupported snapshot version: {0}")]
    UnsupportedVersion(u64),

    /// A relay operation failed.
    #[error("relay transport failed: {0}")]
    TransportFailed(String),

    /// Timeout.
    #[error("operation timed out")]
    Timeout,

    /// Channel closed.
    #[error("channel closed")]
    ChannelClosed,

    /// A background task panicked or was cancelled.
    #[error("background task failed: {0}")]
    TaskFailed(String),

    /// A relay URL was rejected.
    #[error("invalid relay url: {0}")]
    InvalidRelayUrl(String),

    /// Local storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl From<CryptoError> for SyncError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::PayloadTooLarge { size, max } => Self::PayloadTooLarge { size, max },
            CryptoError::Encryption(msg) => Self::EncryptFailed(msg),
            CryptoError::Decryption(msg) => Self::DecryptFailed(msg),
            CryptoError::KeyDerivation(msg) | CryptoError::InvalidPublicKey(msg) => {
                Self::KeyDerivation(msg)
            }
        }
    }
}

impl From<JoinError> for SyncError {
    fn from(err: JoinError) -> Self {
        Self::TaskFailed(err.to_string())
    }
}
