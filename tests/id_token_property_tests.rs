//! Property-based tests for ID tokens.
//!
//! Property 1: Sign/Verify Round-Trip
//! Property 2: Expiry Boundary
//! Property 3: Tamper Detection
//! Property 4: Key Isolation

mod common;

use account_token::config::JwtAlgorithm;
use account_token::jwt::{make_id_token, verify_id_token, IdTokenKeys};
use account_token::TokenError;
use chrono::{Duration, TimeZone, Utc};
use common::{arb_user, es256_keys, fixture, flip_bit};
use proptest::prelude::*;

/// Generate arbitrary TTL (1 second to 1 day).
fn arb_ttl() -> impl Strategy<Value = i64> {
    1i64..86_400i64
}

/// Generate arbitrary issue times between 2001 and 2065.
fn arb_issued_at() -> impl Strategy<Value = i64> {
    1_000_000_000i64..3_000_000_000i64
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property 1: Sign/Verify Round-Trip
    ///
    /// A freshly signed token yields exactly the user it was made for.
    #[test]
    fn prop_id_token_round_trip(user in arb_user(), ttl in arb_ttl(), iat in arb_issued_at()) {
        let keys = es256_keys();
        let now = Utc.timestamp_opt(iat, 0).unwrap();

        let token = make_id_token(&user, &keys, Duration::seconds(ttl), now).unwrap();
        let verified = verify_id_token(&token, &keys, now).unwrap();

        prop_assert_eq!(verified, user);
    }

    /// Property 2: Expiry Boundary
    ///
    /// Valid through the expiry second, rejected one second later.
    #[test]
    fn prop_id_token_expiry_boundary(user in arb_user(), ttl in arb_ttl(), iat in arb_issued_at()) {
        let keys = es256_keys();
        let now = Utc.timestamp_opt(iat, 0).unwrap();
        let token = make_id_token(&user, &keys, Duration::seconds(ttl), now).unwrap();

        let at_expiry = now + Duration::seconds(ttl);
        prop_assert!(verify_id_token(&token, &keys, at_expiry).is_ok());

        let after_expiry = at_expiry + Duration::seconds(1);
        let result = verify_id_token(&token, &keys, after_expiry);
        prop_assert!(matches!(result, Err(TokenError::InvalidCredential(_))));
    }

    /// Property 3: Tamper Detection
    ///
    /// Flipping any single bit in header, payload or signature makes
    /// verification fail.
    #[test]
    fn prop_id_token_bit_flip_rejected(
        user in arb_user(),
        segment in 0usize..3,
        position in any::<usize>(),
    ) {
        let keys = es256_keys();
        let now = Utc::now();
        let token = make_id_token(&user, &keys, Duration::seconds(300), now).unwrap();

        let tampered = flip_bit(&token, segment, position);

        prop_assert_ne!(&tampered, &token);
        prop_assert!(verify_id_token(&tampered, &keys, now).is_err());
    }

    /// Property 4: Key Isolation
    ///
    /// A token signed with one key pair never verifies under another.
    #[test]
    fn prop_id_token_other_key_rejected(user in arb_user()) {
        let keys = es256_keys();
        let other = IdTokenKeys::generate_es256().unwrap();
        let now = Utc::now();
        let token = make_id_token(&user, &keys, Duration::seconds(300), now).unwrap();

        prop_assert!(verify_id_token(&token, &other, now).is_err());
    }
}

#[test]
fn test_rs256_keys_from_pem() {
    let keys = IdTokenKeys::from_pem(
        JwtAlgorithm::RS256,
        &fixture("rsa_private.pem"),
        &fixture("rsa_public.pem"),
    )
    .unwrap();
    let user = account_token::User::new(uuid::Uuid::new_v4(), "rsa@example.com");
    let now = Utc::now();

    let token = make_id_token(&user, &keys, Duration::seconds(900), now).unwrap();
    let header = jsonwebtoken::decode_header(&token).unwrap();

    assert_eq!(header.alg, jsonwebtoken::Algorithm::RS256);
    assert_eq!(header.kid.as_deref(), Some(keys.key_id()));
    assert_eq!(verify_id_token(&token, &keys, now).unwrap(), user);
}

#[test]
fn test_ps256_shares_rsa_keys() {
    let keys = IdTokenKeys::from_pem(
        JwtAlgorithm::PS256,
        &fixture("rsa_private.pem"),
        &fixture("rsa_public.pem"),
    )
    .unwrap();
    let user = account_token::User::new(uuid::Uuid::new_v4(), "pss@example.com");
    let now = Utc::now();

    let token = make_id_token(&user, &keys, Duration::seconds(900), now).unwrap();

    assert_eq!(verify_id_token(&token, &keys, now).unwrap(), user);
}

#[test]
fn test_es256_keys_from_pem() {
    let keys = IdTokenKeys::from_pem(
        JwtAlgorithm::ES256,
        &fixture("ec_private.pem"),
        &fixture("ec_public.pem"),
    )
    .unwrap();
    let user = account_token::User::new(uuid::Uuid::new_v4(), "ec@example.com");
    let now = Utc::now();

    let token = make_id_token(&user, &keys, Duration::seconds(900), now).unwrap();

    assert_eq!(verify_id_token(&token, &keys, now).unwrap(), user);
}

#[test]
fn test_mismatched_key_family_rejected() {
    let result = IdTokenKeys::from_pem(
        JwtAlgorithm::RS256,
        &fixture("ec_private.pem"),
        &fixture("ec_public.pem"),
    );

    assert!(matches!(result, Err(TokenError::Config(_))));
}

#[test]
fn test_algorithm_confusion_rejected() {
    let rsa = IdTokenKeys::from_pem(
        JwtAlgorithm::RS256,
        &fixture("rsa_private.pem"),
        &fixture("rsa_public.pem"),
    )
    .unwrap();
    let user = account_token::User::new(uuid::Uuid::new_v4(), "mix@example.com");
    let now = Utc::now();

    let token = make_id_token(&user, &es256_keys(), Duration::seconds(900), now).unwrap();

    assert!(verify_id_token(&token, &rsa, now).is_err());
}
