//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Enum discriminators are stored as uppercase TEXT, timestamps as RFC
//! 3339 strings, dates as `YYYY-MM-DD`, and string lists as one
//! comma-delimited column. A list element containing the delimiter is
//! rejected before anything is written.

use chrono::{DateTime, NaiveDate, Utc};
use pastoral_core::{
  case::{CaseKind, Channel},
  user::{User, UserKind, UserStatus},
};

use crate::{Error, Result};

/// Delimiter used by the list columns (`confidential_notes`, `involved`).
pub const LIST_DELIMITER: char = ',';

// ─── Discriminators ──────────────────────────────────────────────────────────

pub fn encode_status(s: UserStatus) -> &'static str {
  match s {
    UserStatus::Active => "ACTIVE",
    UserStatus::Inactive => "INACTIVE",
  }
}

pub fn decode_status(s: &str) -> Result<UserStatus> {
  match s {
    "ACTIVE" => Ok(UserStatus::Active),
    "INACTIVE" => Ok(UserStatus::Inactive),
    other => Err(Error::Decode(format!("unknown user status: {other:?}"))),
  }
}

pub fn encode_user_kind(k: UserKind) -> &'static str {
  match k {
    UserKind::Student => "STUDENT",
    UserKind::Staff => "STAFF",
  }
}

pub fn decode_user_kind(s: &str) -> Result<UserKind> {
  match s {
    "STUDENT" => Ok(UserKind::Student),
    "STAFF" => Ok(UserKind::Staff),
    other => Err(Error::Decode(format!("unknown user kind: {other:?}"))),
  }
}

pub fn encode_channel(c: Channel) -> &'static str {
  match c {
    Channel::InPerson => "IN_PERSON",
    Channel::Phone => "PHONE",
    Channel::Email => "EMAIL",
    Channel::Other => "OTHER",
  }
}

pub fn decode_channel(s: &str) -> Result<Channel> {
  match s {
    "IN_PERSON" => Ok(Channel::InPerson),
    "PHONE" => Ok(Channel::Phone),
    "EMAIL" => Ok(Channel::Email),
    "OTHER" => Ok(Channel::Other),
    other => Err(Error::Decode(format!("unknown channel: {other:?}"))),
  }
}

pub fn encode_case_kind(k: CaseKind) -> &'static str {
  match k {
    CaseKind::Common => "COMMON",
    CaseKind::Incident => "INCIDENT",
  }
}

pub fn decode_case_kind(s: &str) -> Result<CaseKind> {
  match s {
    "COMMON" => Ok(CaseKind::Common),
    "INCIDENT" => Ok(CaseKind::Incident),
    other => Err(Error::Decode(format!("unknown case kind: {other:?}"))),
  }
}

// ─── Temporal ────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339()
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("bad timestamp {s:?}: {e}")))
}

pub fn encode_date(d: NaiveDate) -> String {
  d.format("%Y-%m-%d").to_string()
}

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("bad date {s:?}: {e}")))
}

// ─── Lists ───────────────────────────────────────────────────────────────────

/// Join list elements into one delimited column value. An element that
/// itself contains the delimiter would corrupt the column on the way back
/// out, so it is rejected here, before any row is written.
pub fn encode_list(values: &[String]) -> Result<String> {
  for value in values {
    if value.contains(LIST_DELIMITER) {
      return Err(Error::Core(pastoral_core::Error::DelimiterInValue(
        value.clone(),
      )));
    }
  }
  Ok(values.join(","))
}

pub fn decode_list(s: &str) -> Vec<String> {
  if s.is_empty() {
    return Vec::new();
  }
  s.split(LIST_DELIMITER).map(str::to_owned).collect()
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub id:          i64,
  pub first_name:  String,
  pub last_name:   String,
  pub email:       String,
  pub credential:  String,
  pub document_id: String,
  pub status:      String,
  pub kind:        String,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:          self.id,
      first_name:  self.first_name,
      last_name:   self.last_name,
      email:       self.email,
      credential:  self.credential,
      document_id: self.document_id,
      status:      decode_status(&self.status)?,
      kind:        decode_user_kind(&self.kind)?,
    })
  }
}

/// Raw strings read directly from a `cases` row.
pub struct RawCase {
  pub id:                i64,
  pub title:             String,
  pub code:              String,
  pub occurred_at:       String,
  pub channel:           String,
  pub comment:           String,
  pub confidential:      bool,
  pub category_id:       i64,
  pub student_id:        i64,
  pub creator_id:        i64,
  pub kind:              String,
  pub calendar_event_id: Option<String>,
}

/// A decoded `cases` row whose foreign keys have not yet been resolved.
pub struct CaseRow {
  pub id:                i64,
  pub title:             String,
  pub code:              String,
  pub occurred_at:       DateTime<Utc>,
  pub channel:           Channel,
  pub comment:           String,
  pub confidential:      bool,
  pub category_id:       i64,
  pub student_id:        i64,
  pub creator_id:        i64,
  pub kind:              CaseKind,
  pub calendar_event_id: Option<String>,
}

impl RawCase {
  pub fn into_row(self) -> Result<CaseRow> {
    Ok(CaseRow {
      id:                self.id,
      title:             self.title,
      code:              self.code,
      occurred_at:       decode_dt(&self.occurred_at)?,
      channel:           decode_channel(&self.channel)?,
      comment:           self.comment,
      confidential:      self.confidential,
      category_id:       self.category_id,
      student_id:        self.student_id,
      creator_id:        self.creator_id,
      kind:              decode_case_kind(&self.kind)?,
      calendar_event_id: self.calendar_event_id,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn list_roundtrip() {
    let values = vec!["needs follow-up".to_string(), "seen 2024".to_string()];
    let encoded = encode_list(&values).unwrap();
    assert_eq!(decode_list(&encoded), values);
  }

  #[test]
  fn empty_list_roundtrip() {
    assert_eq!(encode_list(&[]).unwrap(), "");
    assert!(decode_list("").is_empty());
  }

  #[test]
  fn embedded_delimiter_rejected() {
    let err = encode_list(&["a, b".to_string()]).unwrap_err();
    assert!(matches!(
      err,
      Error::Core(pastoral_core::Error::DelimiterInValue(_))
    ));
  }

  #[test]
  fn unknown_discriminators_fail() {
    assert!(decode_status("GONE").is_err());
    assert!(decode_user_kind("ROBOT").is_err());
    assert!(decode_channel("FAX").is_err());
    assert!(decode_case_kind("WEIRD").is_err());
  }
}
