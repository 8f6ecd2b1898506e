//! Snapshot codec: payload JSON sealed with NIP-44 v2.
//!
//! The version is read from the decrypted JSON before the payload is
//! decoded into its schema, so an unknown version surfaces as
//! [`SyncError::UnsupportedVersion`] rather than as a schema mismatch.

use crate::error::{SyncError, SyncResult};
use binder_crypto::{ConversationKey, decrypt_string, encrypt_string};
use binder_types::is_supported_version;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Serializes and encrypts `payload`.
pub fn encode<T: Serialize>(payload: &T, key: &ConversationKey) -> SyncResult<String> {
    let json = serde_json::to_string(payload)
        .map_err(|e| SyncError::MalformedPayload(format!("failed to serialize payload: {e}")))?;
    Ok(encrypt_string(key, &json)?)
}

/// Decrypts and decodes a payload, rejecting unsupported versions.
pub fn decode<T: DeserializeOwned>(ciphertext: &str, key: &ConversationKey) -> SyncResult<T> {
    let json = decrypt_string(key, ciphertext)?;
    let value: serde_json::Value =
        serde_json::from_str(&json).map_err(|e| SyncError::MalformedPayload(e.to_string()))?;

    let version = value
        .get("version")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| SyncError::MalformedPayload("missing payload version".to_string()))?;
    let supported = u32::try_from(version).is_ok_and(is_supported_version);
    if !supported {
        return Err(SyncError::UnsupportedVersion(version));
    }

    serde_json::from_value(value).map_err(|e| SyncError::MalformedPayload(e.to_string()))
}
