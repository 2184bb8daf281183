//! Case categories. Referenced by case rows, not owned by them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
  pub id:          i64,
  pub name:        String,
  pub description: String,
}
