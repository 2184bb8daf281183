//! [`CaseStore`] — the accessor for the base table of the case hierarchy.
//!
//! Shared case fields live in one flat table, so `save` is a single
//! insert. Reads reconstruct the discriminator and then resolve the three
//! foreign keys — category, associated student, creator — one nested
//! lookup each. That per-row fan-out is deliberate: it keeps the contract
//! simple, and callers that need bulk performance can query by student or
//! category to narrow the row set first.

use pastoral_core::{case::Case, store::RecordStore, user::Staff};
use rusqlite::OptionalExtension as _;

use crate::{
  categories::CategoryStore,
  db::Db,
  encode::{encode_case_kind, encode_channel, encode_dt, CaseRow, RawCase},
  students::StudentStore,
  users::UserStore,
  Error, Result,
};

// ─── Row helpers ─────────────────────────────────────────────────────────────
//
// Shared with the subtype accessors so their multi-table writes can compose
// the base-row statement inside one transaction.

pub(crate) fn insert_case_row(
  conn: &rusqlite::Connection,
  case: &Case,
) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO cases (title, code, occurred_at, channel, comment, confidential,
                        category_id, student_id, creator_id, kind, calendar_event_id)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    rusqlite::params![
      case.title,
      case.code,
      encode_dt(case.occurred_at),
      encode_channel(case.channel),
      case.comment,
      case.confidential,
      case.category.id,
      case.student.user.id,
      case.creator.user.id,
      encode_case_kind(case.kind),
      case.calendar_event_id,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

/// Rewrite the mutable base columns; the discriminator is immutable.
pub(crate) fn update_case_row(
  conn: &rusqlite::Connection,
  case: &Case,
) -> rusqlite::Result<usize> {
  conn.execute(
    "UPDATE cases
     SET title = ?1, code = ?2, occurred_at = ?3, channel = ?4, comment = ?5,
         confidential = ?6, category_id = ?7, student_id = ?8, creator_id = ?9,
         calendar_event_id = ?10
     WHERE id = ?11",
    rusqlite::params![
      case.title,
      case.code,
      encode_dt(case.occurred_at),
      encode_channel(case.channel),
      case.comment,
      case.confidential,
      case.category.id,
      case.student.user.id,
      case.creator.user.id,
      case.calendar_event_id,
      case.id,
    ],
  )
}

const CASE_COLUMNS: &str = "id, title, code, occurred_at, channel, comment,
                            confidential, category_id, student_id, creator_id,
                            kind, calendar_event_id";

fn map_raw_case(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawCase> {
  Ok(RawCase {
    id:                row.get(0)?,
    title:             row.get(1)?,
    code:              row.get(2)?,
    occurred_at:       row.get(3)?,
    channel:           row.get(4)?,
    comment:           row.get(5)?,
    confidential:      row.get(6)?,
    category_id:       row.get(7)?,
    student_id:        row.get(8)?,
    creator_id:        row.get(9)?,
    kind:              row.get(10)?,
    calendar_event_id: row.get(11)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct CaseStore {
  conn:       tokio_rusqlite::Connection,
  categories: CategoryStore,
  students:   StudentStore,
  users:      UserStore,
}

impl CaseStore {
  pub fn new(
    db: &Db,
    categories: CategoryStore,
    students: StudentStore,
    users: UserStore,
  ) -> Self {
    Self { conn: db.connection(), categories, students, users }
  }

  /// Every case associated with the given student.
  pub async fn find_by_student(&self, student_id: i64) -> Result<Vec<Case>> {
    self.collect_where("student_id", student_id).await
  }

  /// Every case filed under the given category.
  pub async fn find_by_category(&self, category_id: i64) -> Result<Vec<Case>> {
    self.collect_where("category_id", category_id).await
  }

  async fn collect_where(&self, column: &'static str, value: i64) -> Result<Vec<Case>> {
    let raws: Vec<RawCase> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {CASE_COLUMNS} FROM cases WHERE {column} = ?1");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![value], map_raw_case)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut cases = Vec::with_capacity(raws.len());
    for raw in raws {
      cases.push(self.resolve(raw.into_row()?).await?);
    }
    Ok(cases)
  }

  /// Resolve the three foreign keys of a decoded row into full objects.
  ///
  /// A relation that no longer resolves — deleted, or hidden by a logical
  /// delete — makes the whole case unreadable rather than partially
  /// populated. The creator comes back as a staff shell (role
  /// unresolved).
  pub(crate) async fn resolve(&self, row: CaseRow) -> Result<Case> {
    let category = self
      .categories
      .find_by_id(row.category_id)
      .await?
      .ok_or(Error::MissingRelation {
        case_id:     row.id,
        relation:    "category",
        relation_id: row.category_id,
      })?;

    let student = self
      .students
      .find_by_id(row.student_id)
      .await?
      .ok_or(Error::MissingRelation {
        case_id:     row.id,
        relation:    "student",
        relation_id: row.student_id,
      })?;

    let creator_user = self
      .users
      .find_by_id(row.creator_id)
      .await?
      .ok_or(Error::MissingRelation {
        case_id:     row.id,
        relation:    "creator",
        relation_id: row.creator_id,
      })?;
    let creator = Staff::from_user(creator_user).ok_or(Error::NotStaff {
      case_id: row.id,
      user_id: row.creator_id,
    })?;

    Ok(Case {
      id: row.id,
      title: row.title,
      code: row.code,
      occurred_at: row.occurred_at,
      channel: row.channel,
      comment: row.comment,
      confidential: row.confidential,
      category,
      student,
      creator,
      kind: row.kind,
      calendar_event_id: row.calendar_event_id,
    })
  }

  /// Reporter resolution for incidents shares the creator's rules: the
  /// user must exist, be visible, and be staff-kind.
  pub(crate) async fn resolve_staff(&self, case_id: i64, user_id: i64) -> Result<Staff> {
    let user = self
      .users
      .find_by_id(user_id)
      .await?
      .ok_or(Error::MissingRelation {
        case_id,
        relation: "reporter",
        relation_id: user_id,
      })?;
    Staff::from_user(user).ok_or(Error::NotStaff { case_id, user_id })
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for CaseStore {
  type Entity = Case;
  type Error = Error;

  /// Single flat insert — no parent/child split at this level.
  async fn save(&self, case: &Case) -> Result<i64> {
    let case = case.clone();
    let id = self
      .conn
      .call(move |conn| Ok(insert_case_row(conn, &case)?))
      .await?;

    tracing::debug!(id, "case saved");
    Ok(id)
  }

  async fn find_by_id(&self, id: i64) -> Result<Option<Case>> {
    let raw: Option<RawCase> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {CASE_COLUMNS} FROM cases WHERE id = ?1");
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id], map_raw_case)
            .optional()?,
        )
      })
      .await?;

    let Some(raw) = raw else {
      return Ok(None);
    };
    Ok(Some(self.resolve(raw.into_row()?).await?))
  }

  async fn find_all(&self) -> Result<Vec<Case>> {
    let raws: Vec<RawCase> = self
      .conn
      .call(|conn| {
        let sql = format!("SELECT {CASE_COLUMNS} FROM cases");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], map_raw_case)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut cases = Vec::with_capacity(raws.len());
    for raw in raws {
      cases.push(self.resolve(raw.into_row()?).await?);
    }
    Ok(cases)
  }

  async fn update(&self, case: &Case) -> Result<()> {
    let id = case.id;
    let case = case.clone();
    let changed = self
      .conn
      .call(move |conn| Ok(update_case_row(conn, &case)?))
      .await?;

    if changed == 0 {
      tracing::warn!(id, "no case row to update");
    }
    Ok(())
  }

  /// Physical — intentionally asymmetric with the logical deletion used
  /// for users. Specialization rows cascade with the base row.
  async fn delete(&self, id: i64) -> Result<()> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM cases WHERE id = ?1", rusqlite::params![id])?)
      })
      .await?;

    if changed == 0 {
      tracing::warn!(id, "no case row to delete");
    } else {
      tracing::debug!(id, "case deleted");
    }
    Ok(())
  }
}
