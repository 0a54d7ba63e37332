use std::fmt;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Salted password hash in PHC string format. The wrapper has no
/// `Serialize` impl, so the hash can never leak through a response body;
/// callers only get `from_plaintext` and `verify`.
#[derive(Clone, PartialEq, Eq, sqlx::Type)]
#[sqlx(transparent)]
pub struct PasswordCredential(String);

impl PasswordCredential {
    /// Derive a credential from a plaintext password. The plaintext is
    /// dropped as soon as hashing completes and is never logged.
    pub fn from_plaintext(plain: &str) -> anyhow::Result<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(Self(hash))
    }

    /// Check a candidate plaintext against the stored hash. A mismatch is
    /// `Ok(false)`; an error means the stored hash itself is malformed.
    pub fn verify(&self, candidate: &str) -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(&self.0).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            anyhow::anyhow!(e.to_string())
        })?;
        Ok(Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok())
    }
}

impl fmt::Debug for PasswordCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PasswordCredential")
            .field(&"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let credential =
            PasswordCredential::from_plaintext(password).expect("hashing should succeed");
        assert!(credential.verify(password).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let credential = PasswordCredential::from_plaintext("correct-horse-battery-staple")
            .expect("hashing should succeed");
        assert!(!credential
            .verify("wrong-password")
            .expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let credential = PasswordCredential("not-a-valid-hash".into());
        let err = credential.verify("anything").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn same_password_hashes_differently() {
        let a = PasswordCredential::from_plaintext("repeatable").unwrap();
        let b = PasswordCredential::from_plaintext("repeatable").unwrap();
        // Fresh salt per credential.
        assert_ne!(a.0, b.0);
    }

    #[test]
    fn debug_output_is_redacted() {
        let credential = PasswordCredential::from_plaintext("top-secret").unwrap();
        let out = format!("{:?}", credential);
        assert!(out.contains("REDACTED"));
        assert!(!out.contains("top-secret"));
    }
}
