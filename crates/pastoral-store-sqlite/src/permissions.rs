//! [`PermissionStore`] — plain CRUD over the `permissions` table.

use pastoral_core::{role::Permission, store::RecordStore};
use rusqlite::OptionalExtension as _;

use crate::{db::Db, Error, Result};

#[derive(Clone)]
pub struct PermissionStore {
  conn: tokio_rusqlite::Connection,
}

impl PermissionStore {
  pub fn new(db: &Db) -> Self {
    Self { conn: db.connection() }
  }
}

impl RecordStore for PermissionStore {
  type Entity = Permission;
  type Error = Error;

  async fn save(&self, permission: &Permission) -> Result<i64> {
    let name = permission.name.clone();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO permissions (name) VALUES (?1)",
          rusqlite::params![name],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(id)
  }

  async fn find_by_id(&self, id: i64) -> Result<Option<Permission>> {
    let permission = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, name FROM permissions WHERE id = ?1",
              rusqlite::params![id],
              |row| Ok(Permission { id: row.get(0)?, name: row.get(1)? }),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(permission)
  }

  async fn find_all(&self) -> Result<Vec<Permission>> {
    let permissions = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT id, name FROM permissions")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(Permission { id: row.get(0)?, name: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(permissions)
  }

  async fn update(&self, permission: &Permission) -> Result<()> {
    let permission = permission.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE permissions SET name = ?1 WHERE id = ?2",
          rusqlite::params![permission.name, permission.id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Physical.
  async fn delete(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM permissions WHERE id = ?1", rusqlite::params![id])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
