//! The case hierarchy — one flat base row, two specializations.
//!
//! Unlike the user hierarchy, the shared case fields live in a single flat
//! table; only the specialization fields are split out. [`Case`] is the
//! base record with its relations already resolved, [`CommonCase`] and
//! [`Incident`] wrap it with their specialization payloads.

use chrono::{DateTime, Datelike, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{
  category::Category,
  user::{Staff, Student},
};

// ─── Discriminators ──────────────────────────────────────────────────────────

/// How the case reached the institution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
  InPerson,
  Phone,
  Email,
  Other,
}

/// The stored discriminator selecting the specialization table.
/// Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseKind {
  Common,
  Incident,
}

impl CaseKind {
  /// Business default for the stored confidentiality flag. The flag is
  /// always stored explicitly; this is only the value new cases start
  /// from.
  pub fn default_confidentiality(self) -> bool {
    matches!(self, Self::Incident)
  }
}

// ─── Base record ─────────────────────────────────────────────────────────────

/// Shared columns of the `cases` table, with the three foreign keys
/// (category, associated student, creator) resolved into full objects.
///
/// The creator is reconstructed as a staff shell: its role is left
/// unresolved by case reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
  pub id:                i64,
  pub title:             String,
  pub code:              String,
  pub occurred_at:       DateTime<Utc>,
  pub channel:           Channel,
  pub comment:           String,
  pub confidential:      bool,
  pub category:          Category,
  pub student:           Student,
  pub creator:           Staff,
  pub kind:              CaseKind,
  /// Identifier handed back by the external calendar integration, if any.
  /// This layer only persists whatever it is given.
  pub calendar_event_id: Option<String>,
}

// ─── Specializations ─────────────────────────────────────────────────────────

/// A routine case: base record plus the `common_cases` table.
/// `case.kind` must be [`CaseKind::Common`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonCase {
  pub case:       Case,
  pub motivation: String,
}

/// A confidential incident: base record plus the `incidents` table.
/// The reporter is a staff member distinct from the creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
  pub case:     Case,
  pub location: String,
  pub involved: Vec<String>,
  pub reporter: Staff,
}

// ─── Code generation ─────────────────────────────────────────────────────────

/// Generate a display code of the form `CASE-<year>-<4 digits>`.
///
/// The suffix is random and is not checked against existing codes, so two
/// calls may collide within a year.
pub fn generate_case_code() -> String {
  let year = Utc::now().year();
  let suffix = OsRng.next_u32() % 10_000;
  format!("CASE-{year}-{suffix:04}")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn incident_defaults_confidential() {
    assert!(CaseKind::Incident.default_confidentiality());
    assert!(!CaseKind::Common.default_confidentiality());
  }

  #[test]
  fn case_code_format() {
    let year = Utc::now().year().to_string();
    for code in [generate_case_code(), generate_case_code()] {
      let mut parts = code.split('-');
      assert_eq!(parts.next(), Some("CASE"));
      assert_eq!(parts.next(), Some(year.as_str()));
      let suffix = parts.next().expect("suffix");
      assert_eq!(suffix.len(), 4);
      assert!(suffix.chars().all(|c| c.is_ascii_digit()));
      assert_eq!(parts.next(), None);
    }
  }
}
