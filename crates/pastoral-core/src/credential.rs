//! The credential-hasher collaborator trait.
//!
//! The storage layer calls this on every save, change-password, and
//! validate path and treats the digest as opaque text. The concrete
//! implementation lives in `pastoral-auth`.

use crate::Result;

pub trait CredentialHasher: Send + Sync {
  /// Hash a plaintext credential into a self-describing digest string.
  fn hash(&self, plaintext: &str) -> Result<String>;

  /// Check a plaintext credential against a stored digest. Any failure —
  /// wrong password, malformed digest — is just `false`; no detail leaks
  /// through this path.
  fn verify(&self, plaintext: &str, digest: &str) -> bool;
}
