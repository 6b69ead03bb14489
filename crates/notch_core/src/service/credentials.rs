//! Password hashing and bearer-token helpers.
//!
//! Stored hash format: `pbkdf2-sha256$<rounds>$<salt-hex>$<derived-hex>`,
//! where the derived key is PBKDF2-HMAC-SHA256 over the raw salt bytes.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const HASH_SCHEME: &str = "pbkdf2-sha256";
const HASH_ROUNDS: u32 = 29_000;
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Random URL-safe token carrying 32 bytes of entropy.
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hashes `password` with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let salt: [u8; SALT_LEN] = rand::thread_rng().gen();
    let derived = derive(password, &salt, HASH_ROUNDS);
    format!(
        "{HASH_SCHEME}${HASH_ROUNDS}${}${}",
        hex::encode(salt),
        hex::encode(derived)
    )
}

/// Checks `password` against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(rounds), Some(salt_hex), Some(expected_hex), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    if scheme != HASH_SCHEME {
        return false;
    }
    let Ok(rounds) = rounds.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(expected_hex)) else {
        return false;
    };
    if rounds == 0 || salt.is_empty() || expected.len() != KEY_LEN {
        return false;
    }
    let derived = derive(password, &salt, rounds);
    bool::from(derived[..].ct_eq(&expected[..]))
}

/// Constant-time string comparison. Length differences short-circuit.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

fn derive(password: &str, salt: &[u8], rounds: u32) -> [u8; KEY_LEN] {
    let mut derived = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, rounds, &mut derived);
    derived
}

#[cfg(test)]
mod tests {
    use super::{constant_time_eq, derive, generate_token, hash_password, verify_password};

    #[test]
    fn password_round_trip() {
        let stored = hash_password("correct horse");
        assert!(stored.starts_with("pbkdf2-sha256$29000$"));
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("wrong horse", &stored));
    }

    #[test]
    fn derivation_is_standard_pbkdf2_hmac_sha256() {
        // RFC 7914 section 11 test vector, first 32 bytes.
        let derived = derive("passwd", b"salt", 1);
        assert_eq!(
            hex::encode(derived),
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc"
        );
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        assert_ne!(hash_password("pw"), hash_password("pw"));
    }

    #[test]
    fn malformed_hashes_never_verify() {
        assert!(!verify_password("pw", ""));
        assert!(!verify_password("pw", "md5$1$aa$bb"));
        assert!(!verify_password("pw", "pbkdf2-sha256$x$aa$bb"));
        assert!(!verify_password("pw", "pbkdf2-sha256$0$aa$bb"));
        assert!(!verify_password("pw", "pbkdf2-sha256$1$zz$bb"));
        assert!(!verify_password("pw", "pbkdf2-sha256$1$aa$bb"));
        assert!(!verify_password("pw", "sha256$10000$aa$bb"));
    }

    #[test]
    fn tokens_are_url_safe_and_unique() {
        let token = generate_token();
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn constant_time_eq_matches_equality() {
        assert!(constant_time_eq("hello", "hello"));
        assert!(!constant_time_eq("hello", "world"));
        assert!(!constant_time_eq("hello", "hello!"));
    }
}
