//! Password digests stored in the credential file.
//!
//! Two formats can appear in the hash column:
//!
//! - **legacy**: 64 lowercase hex chars, SHA-256 of the password, no salt.
//!   Files written by earlier installs contain only this format.
//! - **salted**: `s256$<rounds>$<salt>$<digest>`, iterated SHA-256 seeded
//!   with a random per-record salt.
//!
//! Neither format contains `:`, so records stay splittable on the first colon.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Marker for the salted format.
const SALTED_TAG: &str = "s256";

/// Iteration count for newly written salted hashes.
pub const DEFAULT_ROUNDS: u32 = 10_000;

/// Which digest format new registrations are written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashScheme {
    /// Unsalted SHA-256 hex, readable by older installs.
    Legacy,
    /// Salted, iterated SHA-256.
    #[default]
    Salted,
}

/// Hash a password for storage using `scheme`.
pub fn hash_password(password: &str, scheme: HashScheme) -> String {
    match scheme {
        HashScheme::Legacy => legacy_digest(password),
        HashScheme::Salted => {
            let salt = uuid::Uuid::new_v4().simple().to_string();
            let digest = iterated_digest(password, &salt, DEFAULT_ROUNDS);
            format!("{SALTED_TAG}${DEFAULT_ROUNDS}${salt}${digest}")
        }
    }
}

/// Check `password` against a stored hash of either format.
///
/// A malformed salted hash never verifies.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    match parts.as_slice() {
        [tag, rounds, salt, digest] if *tag == SALTED_TAG => match rounds.parse::<u32>() {
            Ok(rounds) if rounds > 0 => {
                constant_time_eq(&iterated_digest(password, salt, rounds), digest)
            }
            _ => false,
        },
        _ => constant_time_eq(&legacy_digest(password), stored),
    }
}

fn legacy_digest(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

fn iterated_digest(password: &str, salt: &str, rounds: u32) -> String {
    let mut digest = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize();
    for _ in 1..rounds {
        digest = Sha256::new()
            .chain_update(digest.as_slice())
            .chain_update(password.as_bytes())
            .finalize();
    }
    format!("{:x}", digest)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_digest_matches_plain_sha256() {
        // sha256("123456")
        assert_eq!(
            hash_password("123456", HashScheme::Legacy),
            "8d969eef6ecad3c29a3a629280e686cf0c3f5d5a86aff3ca12020c923adc6c92"
        );
    }

    #[test]
    fn test_legacy_roundtrip() {
        let stored = hash_password("hunter22", HashScheme::Legacy);
        assert!(verify_password("hunter22", &stored));
        assert!(!verify_password("hunter23", &stored));
    }

    #[test]
    fn test_salted_format() {
        let stored = hash_password("hunter22", HashScheme::Salted);
        let parts: Vec<&str> = stored.split('$').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "s256");
        assert_eq!(parts[1], DEFAULT_ROUNDS.to_string());
        assert_eq!(parts[2].len(), 32);
        assert_eq!(parts[3].len(), 64);
        assert!(!stored.contains(':'));
    }

    #[test]
    fn test_salted_roundtrip() {
        let stored = hash_password("correct horse", HashScheme::Salted);
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("correct horsE", &stored));
    }

    #[test]
    fn test_salts_differ_between_records() {
        let a = hash_password("same-password", HashScheme::Salted);
        let b = hash_password("same-password", HashScheme::Salted);
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_salted_hash_never_verifies() {
        assert!(!verify_password("x", "s256$zero$salt$digest"));
        assert!(!verify_password("x", "s256$0$salt$digest"));
        assert!(!verify_password("x", ""));
    }
}
