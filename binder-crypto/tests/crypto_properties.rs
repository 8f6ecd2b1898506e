use binder_crypto::{decrypt_string, derive_scoped_key, encrypt_string};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn roundtrip_any_text(text in "\\PC{1,512}") {
        let key = derive_scoped_key("prop-secret", "binder-sync")
            .unwrap()
            .conversation_key()
            .unwrap();
        let sealed = encrypt_string(&key, &text).unwrap();
        prop_assert_eq!(decrypt_string(&key, &sealed).unwrap(), text);
    }

    #[test]
    fn scope_keys_are_deterministic(secret in "[a-f0-9]{8,64}", scope in "[a-z-]{1,24}") {
        let a = derive_scoped_key(&secret, &scope).unwrap();
        let b = derive_scoped_key(&secret, &scope).unwrap();
        prop_assert_eq!(a.public_key_hex(), b.public_key_hex());
    }
}
