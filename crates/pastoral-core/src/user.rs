//! The user hierarchy — one base row, two specializations.
//!
//! The relational store splits users across a base table (shared columns)
//! and one specialization table per kind. In code the split is expressed
//! with composition and a stored discriminator rather than inheritance:
//! [`User`] is the base-row projection, [`Student`] and [`Staff`] wrap it
//! together with their specialization fields.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::role::Role;

// ─── Discriminators ──────────────────────────────────────────────────────────

/// Visibility state of a user row. Deleting a user never removes the row;
/// it flips this to `Inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
  Active,
  Inactive,
}

/// The stored discriminator selecting which specialization table holds the
/// rest of the row. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserKind {
  Student,
  Staff,
}

// ─── Base row ────────────────────────────────────────────────────────────────

/// Shared columns of the `users` table.
///
/// `credential` holds the plaintext password when the struct is handed to
/// `save` (the accessor hashes it before the row is written) and the PHC
/// digest once read back from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id:          i64,
  pub first_name:  String,
  pub last_name:   String,
  pub email:       String,
  pub credential:  String,
  pub document_id: String,
  pub status:      UserStatus,
  pub kind:        UserKind,
}

// ─── Specializations ─────────────────────────────────────────────────────────

/// A student: base row plus the `students` specialization table.
/// `user.kind` must be [`UserKind::Student`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
  pub user:               User,
  pub referral_reason:    String,
  pub program:            String,
  pub cohort:             String,
  pub phone:              String,
  pub street:             String,
  pub door_number:        String,
  pub birth_date:         NaiveDate,
  pub photo:              Option<String>,
  pub health_system:      String,
  pub general_comments:   String,
  // Confidential fields below; access control lives in the policy layer.
  pub health_status:      String,
  pub confidential_notes: Vec<String>,
}

/// A staff member: base row plus the `staff` specialization table.
///
/// The role column is nullable at the row level, but business rules require
/// exactly one role at save time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
  pub user: User,
  pub role: Option<Role>,
}

impl Staff {
  /// Wrap a base-row projection as a staff shell with no role resolved.
  /// Returns `None` when the row is not staff-kind.
  pub fn from_user(user: User) -> Option<Self> {
    matches!(user.kind, UserKind::Staff).then(|| Self { user, role: None })
  }
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// A role attached by the email lookup: id and name only, permissions not
/// loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
  pub id:   i64,
  pub name: String,
}

/// What the email lookup (and therefore authentication) sees: the base row
/// regardless of status, plus the role opportunistically joined for
/// staff-kind rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
  pub user: User,
  pub role: Option<RoleRef>,
}

/// Credential-free projection of a user row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
  pub id:          i64,
  pub first_name:  String,
  pub last_name:   String,
  pub email:       String,
  pub document_id: String,
  pub status:      UserStatus,
  pub kind:        UserKind,
}
