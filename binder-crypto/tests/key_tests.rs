use binder_crypto::{KEY_SIZE, derive_scoped_key};

// ── Determinism ──────────────────────────────────────────────────

#[test]
fn same_inputs_same_key() {
    let a = derive_scoped_key("base-secret", "binder-sync").unwrap();
    let b = derive_scoped_key("base-secret", "binder-sync").unwrap();
    assert_eq!(a, b);
    assert_eq!(a.private_key_hex(), b.private_key_hex());
    assert_eq!(a.public_key_hex(), b.public_key_hex());
}

#[test]
fn different_scopes_different_keys() {
    let drafts = derive_scoped_key("base-secret", "binder-sync").unwrap();
    let state = derive_scoped_key("base-secret", "binder-state").unwrap();
    assert_ne!(drafts.private_key_hex(), state.private_key_hex());
    assert_ne!(drafts.public_key_hex(), state.public_key_hex());
}

#[test]
fn different_base_secrets_different_keys() {
    let a = derive_scoped_key("alice", "binder-sync").unwrap();
    let b = derive_scoped_key("bob", "binder-sync").unwrap();
    assert_ne!(a.private_key_hex(), b.private_key_hex());
}

// ── Shape ────────────────────────────────────────────────────────

#[test]
fn key_is_sha256_of_material() {
    use sha2_check::expected_secret_hex;
    let key = derive_scoped_key("secret", "scope").unwrap();
    assert_eq!(key.private_key_hex(), expected_secret_hex("secret:scope"));
}

#[test]
fn hex_lengths() {
    let key = derive_scoped_key("secret", "scope").unwrap();
    assert_eq!(key.private_key_hex().len(), KEY_SIZE * 2);
    assert_eq!(key.public_key_hex().len(), 64);
    assert_eq!(key.secret_bytes().len(), KEY_SIZE);
    assert_eq!(key.scope(), "scope");
}

#[test]
fn public_key_matches_nostr_derivation() {
    let key = derive_scoped_key("secret", "scope").unwrap();
    let keys = nostr::Keys::parse(&key.private_key_hex()).unwrap();
    assert_eq!(keys.public_key().to_hex(), key.public_key_hex());
}

#[test]
fn debug_redacts_secret() {
    let key = derive_scoped_key("secret", "scope").unwrap();
    let debug = format!("{key:?}");
    assert!(debug.contains("REDACTED"));
    assert!(!debug.contains(&key.private_key_hex()));
}

mod sha2_check {
    pub fn expected_secret_hex(material: &str) -> String {
        use sha2::{Digest, Sha256};
        hex::encode(Sha256::digest(material.as_bytes()))
    }
}
