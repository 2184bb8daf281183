//! [`IncidentStore`] — the accessor for the incident specialization.
//!
//! Same delegate-then-specialize shape as the common-case accessor, with
//! two extra relations: the involved-party list (stored as one delimited
//! column) and the reporting staff member, distinct from the creator.

use pastoral_core::{
  case::{CaseKind, Incident},
  store::RecordStore,
};
use rusqlite::OptionalExtension as _;

use crate::{
  cases::{self, CaseStore},
  db::Db,
  encode::{decode_list, encode_list},
  Error, Result,
};

#[derive(Clone)]
pub struct IncidentStore {
  conn:  tokio_rusqlite::Connection,
  cases: CaseStore,
}

impl IncidentStore {
  pub fn new(db: &Db, cases: CaseStore) -> Self {
    Self { conn: db.connection(), cases }
  }

  async fn specialization_row(
    &self,
    id: i64,
  ) -> Result<Option<(String, String, i64)>> {
    let row = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT location, involved, reporter_id FROM incidents WHERE id = ?1",
              rusqlite::params![id],
              |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(row)
  }
}

impl RecordStore for IncidentStore {
  type Entity = Incident;
  type Error = Error;

  /// One transaction: base insert, then the specialization row. The
  /// involved-party list is encoded (and its elements validated) before
  /// anything is written.
  async fn save(&self, incident: &Incident) -> Result<i64> {
    let involved = encode_list(&incident.involved)?;
    let incident = incident.clone();

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let id = cases::insert_case_row(&tx, &incident.case)?;
        tx.execute(
          "INSERT INTO incidents (id, location, involved, reporter_id)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![
            id,
            incident.location,
            involved,
            incident.reporter.user.id,
          ],
        )?;
        tx.commit()?;
        Ok(id)
      })
      .await?;

    tracing::debug!(id, "incident saved");
    Ok(id)
  }

  /// Delegate, check the discriminator, then attach the specialization
  /// fields and resolve the reporter — a common case under this id is
  /// `None`, never a malformed incident.
  async fn find_by_id(&self, id: i64) -> Result<Option<Incident>> {
    let Some(case) = self.cases.find_by_id(id).await? else {
      return Ok(None);
    };
    if case.kind != CaseKind::Incident {
      return Ok(None);
    }
    let Some((location, involved, reporter_id)) = self.specialization_row(id).await?
    else {
      return Ok(None);
    };
    let reporter = self.cases.resolve_staff(id, reporter_id).await?;
    Ok(Some(Incident {
      case,
      location,
      involved: decode_list(&involved),
      reporter,
    }))
  }

  /// Delegate to the parent for every row and filter client-side by kind.
  async fn find_all(&self) -> Result<Vec<Incident>> {
    let cases = self.cases.find_all().await?;
    let mut incidents = Vec::new();
    for case in cases {
      if case.kind != CaseKind::Incident {
        continue;
      }
      let Some((location, involved, reporter_id)) =
        self.specialization_row(case.id).await?
      else {
        continue;
      };
      let reporter = self.cases.resolve_staff(case.id, reporter_id).await?;
      incidents.push(Incident {
        case,
        location,
        involved: decode_list(&involved),
        reporter,
      });
    }
    Ok(incidents)
  }

  /// The same two-table pattern as `save`, under one transaction.
  async fn update(&self, incident: &Incident) -> Result<()> {
    let involved = encode_list(&incident.involved)?;
    let incident = incident.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        cases::update_case_row(&tx, &incident.case)?;
        tx.execute(
          "UPDATE incidents SET location = ?1, involved = ?2, reporter_id = ?3
           WHERE id = ?4",
          rusqlite::params![
            incident.location,
            involved,
            incident.reporter.user.id,
            incident.case.id,
          ],
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
