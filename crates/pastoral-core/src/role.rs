//! Roles and permissions.

use serde::{Deserialize, Serialize};

/// A named leaf capability. No relationships of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
  pub id:   i64,
  pub name: String,
}

/// A role with its assigned permissions (many-to-many through an
/// association table). A role must carry at least one permission at
/// creation time; updates replace the whole association set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
  pub id:          i64,
  pub name:        String,
  pub permissions: Vec<Permission>,
}
