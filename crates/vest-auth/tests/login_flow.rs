//! Register, log in and reset a password using only the public API.

use pretty_assertions::assert_eq;
use vest_auth::{
    TokenSigner, bearer_token, generate_reset_token, hash_password, hash_reset_token,
    verify_password,
};
use vest_config::AuthConfig;
use vest_core::enums::Role;

#[test]
fn password_token_roundtrip() {
    let config = AuthConfig {
        jwt_secret: "a-very-long-secret-for-integration-tests".into(),
        ..AuthConfig::default()
    };
    let signer = TokenSigner::from_config(&config).unwrap();

    let stored = hash_password("Sup3r-secret").unwrap();
    assert!(verify_password("Sup3r-secret", &stored).unwrap());

    let issued = signer.issue("usr-0000beef", Role::User).unwrap();
    let header = format!("Bearer {}", issued.token);
    let claims = signer.verify(bearer_token(&header).unwrap()).unwrap();
    let identity = claims.to_identity();
    assert_eq!(identity.user_id, "usr-0000beef");
    assert!(!identity.is_admin());
}

#[test]
fn reset_link_token_matches_stored_digest() {
    let reset = generate_reset_token().unwrap();
    let link = format!("https://app.example.com/reset?token={}", reset.token);
    let from_link = link.rsplit('=').next().unwrap();
    assert_eq!(hash_reset_token(from_link), reset.token_hash);
}
