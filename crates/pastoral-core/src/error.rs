//! Error types for `pastoral-core`.
//!
//! Lookup misses are not errors — accessors signal them with `Option::None`.
//! The variants here are precondition violations checked before a mutating
//! call, plus the deliberately opaque authentication failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Uniform authentication failure. Carries no cause on purpose: callers
  /// must not be able to distinguish a wrong password from an inactive or
  /// unknown account.
  #[error("authentication failed")]
  AuthenticationFailed,

  #[error("a role must carry at least one permission")]
  RoleWithoutPermissions,

  #[error("a staff member must have a role assigned at save time")]
  StaffWithoutRole,

  #[error("role not found: {0}")]
  RoleNotFound(i64),

  #[error("permission not found: {0}")]
  PermissionNotFound(i64),

  #[error("permission {permission_id} is already assigned to role {role_id}")]
  PermissionAlreadyAssigned { role_id: i64, permission_id: i64 },

  #[error("permission {permission_id} is not assigned to role {role_id}")]
  PermissionNotAssigned { role_id: i64, permission_id: i64 },

  /// A list element contains the storage delimiter and would corrupt the
  /// encoded column.
  #[error("list value contains the reserved delimiter: {0:?}")]
  DelimiterInValue(String),

  #[error("credential hashing error: {0}")]
  Credential(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
