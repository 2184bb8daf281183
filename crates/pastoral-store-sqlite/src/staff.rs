//! [`StaffStore`] — the accessor for the staff specialization.
//!
//! Same delegate-then-specialize shape as the student accessor, with one
//! extra business rule: the role column is nullable at the row level, but
//! a staff member must have a role at save time.

use pastoral_core::{
  store::RecordStore,
  user::{Staff, UserKind},
};
use rusqlite::OptionalExtension as _;

use crate::{
  db::Db,
  roles::RoleStore,
  users::{self, UserStore},
  Error, Result,
};

#[derive(Clone)]
pub struct StaffStore {
  conn:  tokio_rusqlite::Connection,
  users: UserStore,
  roles: RoleStore,
}

impl StaffStore {
  pub fn new(db: &Db, users: UserStore, roles: RoleStore) -> Self {
    Self { conn: db.connection(), users, roles }
  }

  /// Point a staff member at a different role.
  pub async fn assign_role(&self, staff_id: i64, role_id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE staff SET role_id = ?1 WHERE id = ?2",
          rusqlite::params![role_id, staff_id],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(staff_id, role_id, "role assigned");
    Ok(())
  }

  /// Active staff members holding the named role.
  pub async fn find_by_role(&self, role_name: &str) -> Result<Vec<Staff>> {
    let role_name = role_name.to_owned();
    let ids: Vec<i64> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT u.id FROM users u
           JOIN staff f ON u.id = f.id
           JOIN roles r ON f.role_id = r.id
           WHERE r.name = ?1 AND u.kind = 'STAFF' AND u.status = 'ACTIVE'",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![role_name], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut members = Vec::with_capacity(ids.len());
    for id in ids {
      if let Some(staff) = self.find_by_id(id).await? {
        members.push(staff);
      }
    }
    Ok(members)
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for StaffStore {
  type Entity = Staff;
  type Error = Error;

  /// Requires a role up front, then one transaction for the base insert
  /// plus the specialization insert.
  async fn save(&self, staff: &Staff) -> Result<i64> {
    let Some(role) = &staff.role else {
      return Err(Error::Core(pastoral_core::Error::StaffWithoutRole));
    };
    let role_id = role.id;
    let digest = self.users.hasher().hash(&staff.user.credential)?;
    let user = staff.user.clone();

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let id = users::insert_user_row(&tx, &user, &digest)?;
        tx.execute(
          "INSERT INTO staff (id, role_id) VALUES (?1, ?2)",
          rusqlite::params![id, role_id],
        )?;
        tx.commit()?;
        Ok(id)
      })
      .await?;

    tracing::debug!(id, "staff member saved");
    Ok(id)
  }

  /// Delegate the base lookup, check the discriminator, then read the
  /// specialization row and resolve the full role through the role
  /// accessor.
  async fn find_by_id(&self, id: i64) -> Result<Option<Staff>> {
    let Some(user) = self.users.find_by_id(id).await? else {
      return Ok(None);
    };
    if user.kind != UserKind::Staff {
      return Ok(None);
    }

    let row: Option<Option<i64>> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT role_id FROM staff WHERE id = ?1",
              rusqlite::params![id],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    let Some(role_id) = row else {
      return Ok(None);
    };

    let role = match role_id {
      Some(role_id) => self.roles.find_by_id(role_id).await?,
      None => None,
    };
    Ok(Some(Staff { user, role }))
  }

  async fn find_all(&self) -> Result<Vec<Staff>> {
    let ids: Vec<i64> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT u.id FROM users u JOIN staff f ON u.id = f.id
           WHERE u.kind = 'STAFF' AND u.status = 'ACTIVE'",
        )?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut members = Vec::with_capacity(ids.len());
    for id in ids {
      if let Some(staff) = self.find_by_id(id).await? {
        members.push(staff);
      }
    }
    Ok(members)
  }

  /// Base columns and the role pointer, under one transaction. Unlike
  /// `save`, a missing role is allowed here and clears the column.
  async fn update(&self, staff: &Staff) -> Result<()> {
    let role_id = staff.role.as_ref().map(|role| role.id);
    let user = staff.user.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        users::update_user_row(&tx, &user)?;
        tx.execute(
          "UPDATE staff SET role_id = ?1 WHERE id = ?2",
          rusqlite::params![role_id, user.id],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Logical, delegated wholly to the base accessor.
  async fn delete(&self, id: i64) -> Result<()> {
    self.users.delete_logical(id).await
  }
}
