use crypto_core::{generate_numeric_code, generate_token, hash_password, sha256_hex, verify_password};

#[test]
fn token_digest_is_stable_and_distinct_from_token() {
    let token = generate_token(32);
    let digest = sha256_hex(&token);
    assert_eq!(digest, sha256_hex(&token));
    assert_ne!(digest, token);
    assert_eq!(digest.len(), 64);
}

#[test]
fn otp_codes_compare_through_digest() {
    let code = generate_numeric_code(6);
    assert_eq!(sha256_hex(&code), sha256_hex(&code.clone()));
}

#[test]
fn password_roundtrip_through_public_api() {
    let hash = hash_password("blog-admin-2024").expect("hash");
    assert!(verify_password("blog-admin-2024", &hash).expect("verify"));
    assert!(!verify_password("blog-admin-2025", &hash).expect("verify"));
}
