//! [`CommonCaseStore`] — the accessor for the routine-case specialization.
//!
//! Delegate-then-specialize over [`CaseStore`]: writes wrap the base-row
//! statement and the `common_cases` insert in one transaction; reads fetch
//! the base case, check the discriminator, and attach the motivation.

use pastoral_core::{
  case::{CaseKind, CommonCase},
  store::RecordStore,
};
use rusqlite::OptionalExtension as _;

use crate::{
  cases::{self, CaseStore},
  db::Db,
  Error, Result,
};

#[derive(Clone)]
pub struct CommonCaseStore {
  conn:  tokio_rusqlite::Connection,
  cases: CaseStore,
}

impl CommonCaseStore {
  pub fn new(db: &Db, cases: CaseStore) -> Self {
    Self { conn: db.connection(), cases }
  }

  async fn motivation(&self, id: i64) -> Result<Option<String>> {
    let motivation = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT motivation FROM common_cases WHERE id = ?1",
              rusqlite::params![id],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(motivation)
  }
}

impl RecordStore for CommonCaseStore {
  type Entity = CommonCase;
  type Error = Error;

  /// One transaction: base insert, then the motivation row keyed by the
  /// generated id.
  async fn save(&self, common: &CommonCase) -> Result<i64> {
    let common = common.clone();
    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let id = cases::insert_case_row(&tx, &common.case)?;
        tx.execute(
          "INSERT INTO common_cases (id, motivation) VALUES (?1, ?2)",
          rusqlite::params![id, common.motivation],
        )?;
        tx.commit()?;
        Ok(id)
      })
      .await?;

    tracing::debug!(id, "common case saved");
    Ok(id)
  }

  /// Delegate, then attach the specialization only if the stored kind
  /// matches — an incident under this id is `None`, never a malformed
  /// common case.
  async fn find_by_id(&self, id: i64) -> Result<Option<CommonCase>> {
    let Some(case) = self.cases.find_by_id(id).await? else {
      return Ok(None);
    };
    if case.kind != CaseKind::Common {
      return Ok(None);
    }
    let Some(motivation) = self.motivation(id).await? else {
      return Ok(None);
    };
    Ok(Some(CommonCase { case, motivation }))
  }

  /// Delegate to the parent for every row and filter client-side by kind.
  async fn find_all(&self) -> Result<Vec<CommonCase>> {
    let cases = self.cases.find_all().await?;
    let mut commons = Vec::new();
    for case in cases {
      if case.kind != CaseKind::Common {
        continue;
      }
      if let Some(motivation) = self.motivation(case.id).await? {
        commons.push(CommonCase { case, motivation });
      }
    }
    Ok(commons)
  }

  /// The same two-table pattern as `save`, under one transaction.
  async fn update(&self, common: &CommonCase) -> Result<()> {
    let common = common.clone();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        cases::update_case_row(&tx, &common.case)?;
        tx.execute(
          "UPDATE common_cases SET motivation = ?1 WHERE id = ?2",
          rusqlite::params![common.motivation, common.case.id],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Delegated physical delete; the specialization row cascades.
  async fn delete(&self, id: i64) -> Result<()> {
    self.cases.delete(id).await
  }
}
