//! Encryption layer for Binder draft sync.
//!
//! Sync payloads are encrypted to a key that is derived, not stored:
//!
//! 1. A base secret (a delegated signer's local key, or a deterministic
//!    signature from the user's signer) is combined with a *scope* string
//!    and hashed with SHA-256 into a Nostr secret key ([`ScopedKey`]).
//! 2. The scope key agrees a conversation key with its own public key using
//!    the NIP-44 v2 key agreement ([`derive_conversation_key`]).
//! 3. Payloads are sealed with NIP-44 v2 and base64-encoded
//!    ([`encrypt_string`] / [`decrypt_string`]).
//!
//! Different scopes yield unrelated keys, so one sync purpose cannot read
//! another's payloads even though both come from the same identity.

mod cipher;
mod error;
mod key;

pub use cipher::{
    ConversationKey, MAX_PLAINTEXT_SIZE, decrypt_string, derive_conversation_key, encrypt_string,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{KEY_SIZE, ScopedKey, derive_scoped_key};
