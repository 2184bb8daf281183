//! Argon2 implementation of the [`CredentialHasher`] collaborator.
//!
//! Digests are PHC strings (`$argon2id$v=19$…`), so the parameters and
//! salt travel with the digest and verification needs no configuration.

use argon2::{
  password_hash::SaltString, Argon2, PasswordHash, PasswordHasher,
  PasswordVerifier,
};
use pastoral_core::{credential::CredentialHasher, Error, Result};
use rand_core::OsRng;

/// Hashes and verifies credentials with `Argon2::default()` (argon2id).
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
  fn hash(&self, plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(plaintext.as_bytes(), &salt)
      .map(|hash| hash.to_string())
      .map_err(|e| Error::Credential(e.to_string()))
  }

  fn verify(&self, plaintext: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
      return false;
    };
    Argon2::default()
      .verify_password(plaintext.as_bytes(), &parsed)
      .is_ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_then_verify_roundtrip() {
    let hasher = Argon2Hasher;
    let digest = hasher.hash("correct horse").unwrap();
    assert!(digest.starts_with("$argon2"));
    assert!(hasher.verify("correct horse", &digest));
  }

  #[test]
  fn wrong_password_fails() {
    let hasher = Argon2Hasher;
    let digest = hasher.hash("secret").unwrap();
    assert!(!hasher.verify("not-secret", &digest));
  }

  #[test]
  fn salted_hashes_differ() {
    let hasher = Argon2Hasher;
    assert_ne!(hasher.hash("secret").unwrap(), hasher.hash("secret").unwrap());
  }

  #[test]
  fn malformed_digest_is_just_false() {
    assert!(!Argon2Hasher.verify("secret", "not a phc string"));
  }
}
