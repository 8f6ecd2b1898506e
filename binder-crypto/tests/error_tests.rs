use binder_crypto::CryptoError;

#[test]
fn error_display_key_derivation() {
    let err = CryptoError::KeyDerivation("bad scalar".into());
    assert!(format!("{err}").contains("key derivation failed"));
    assert!(format!("{err}").contains("bad scalar"));
}

#[test]
fn error_display_payload_too_large() {
    let err = CryptoError::PayloadTooLarge { size: 70_000, max: 65_535 };
    let msg = format!("{err}");
    assert!(msg.contains("too large"));
    assert!(msg.contains("70000"));
    assert!(msg.contains("65535"));
}

#[test]
fn error_display_decryption() {
    let err = CryptoError::Decryption("invalid MAC".into());
    assert!(format!("{err}").contains("decryption failed"));
}
