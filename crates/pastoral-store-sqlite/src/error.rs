//! Error type for `pastoral-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] pastoral_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),

  /// A stored column value could not be decoded into its domain type.
  #[error("stored value could not be decoded: {0}")]
  Decode(String),

  /// A case row references a relation that no longer resolves (deleted,
  /// or hidden by a logical delete). A case is not valid data without its
  /// relations, so this propagates instead of yielding a partial case.
  #[error("case {case_id} references missing {relation} {relation_id}")]
  MissingRelation {
    case_id:     i64,
    relation:    &'static str,
    relation_id: i64,
  },

  /// A case row's creator or reporter resolved to a non-staff user.
  #[error("user {user_id} referenced by case {case_id} is not staff")]
  NotStaff { case_id: i64, user_id: i64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
