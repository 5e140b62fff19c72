//! services/web/src/adapters/password.rs
//!
//! Argon2id implementation of the `CredentialStore` port. Hashes are stored
//! in PHC string format, which carries the algorithm parameters and the salt
//! alongside the digest.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use artblog_core::ports::{CredentialStore, CryptoError};

/// Stateless Argon2id hasher. Holds only the algorithm defaults, so it is
/// safe to share across concurrent requests.
#[derive(Clone, Default)]
pub struct Argon2Credentials;

impl CredentialStore for Argon2Credentials {
    fn hash(&self, plaintext: &str) -> Result<String, CryptoError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| CryptoError(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, plaintext: &str, hash: &str) -> bool {
        // A hash we cannot parse can never match, so it is a plain mismatch
        // rather than an error.
        let parsed = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };
        // Argon2 uses constant-time comparison internally.
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let creds = Argon2Credentials;
        let hash = creds.hash("correct horse battery staple").unwrap();

        assert!(creds.verify("correct horse battery staple", &hash));
        assert!(!creds.verify("incorrect horse", &hash));
    }

    #[test]
    fn hash_is_salted_and_never_plaintext() {
        let creds = Argon2Credentials;
        let first = creds.hash("pw1").unwrap();
        let second = creds.hash("pw1").unwrap();

        // PHC format, random salt per call.
        assert!(first.starts_with("$argon2"));
        assert_ne!(first, second);
        assert!(!first.contains("pw1"));
    }

    #[test]
    fn verify_rejects_malformed_hash() {
        let creds = Argon2Credentials;
        assert!(!creds.verify("anything", "not-a-phc-string"));
        assert!(!creds.verify("anything", ""));
    }
}
