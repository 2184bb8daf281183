//! [`RoleStore`] — roles and their many-to-many permission association.
//!
//! Association writes are batched: `save` inserts every pair with one
//! multi-row statement, `update` replaces the whole set, and `find_all`
//! loads all associations with a single query and distributes them into
//! the roles in memory — O(roles + associations), not one query per role.

use std::collections::HashMap;

use pastoral_core::{
  role::{Permission, Role},
  store::RecordStore,
};
use rusqlite::OptionalExtension as _;

use crate::{db::Db, Error, Result};

/// Insert every (role, permission) pair as one multi-row statement.
fn insert_associations(
  conn: &rusqlite::Connection,
  role_id: i64,
  permissions: &[Permission],
) -> rusqlite::Result<()> {
  if permissions.is_empty() {
    return Ok(());
  }
  let placeholders = (0..permissions.len())
    .map(|i| format!("(?{}, ?{})", 2 * i + 1, 2 * i + 2))
    .collect::<Vec<_>>()
    .join(", ");
  let sql = format!(
    "INSERT INTO role_permissions (role_id, permission_id) VALUES {placeholders}"
  );

  let params = permissions
    .iter()
    .flat_map(|p| [role_id, p.id])
    .collect::<Vec<_>>();
  conn.execute(&sql, rusqlite::params_from_iter(params))?;
  Ok(())
}

fn load_permissions(
  conn: &rusqlite::Connection,
  role_id: i64,
) -> rusqlite::Result<Vec<Permission>> {
  let mut stmt = conn.prepare(
    "SELECT p.id, p.name FROM permissions p
     JOIN role_permissions rp ON p.id = rp.permission_id
     WHERE rp.role_id = ?1
     ORDER BY p.id",
  )?;
  stmt
    .query_map(rusqlite::params![role_id], |row| {
      Ok(Permission { id: row.get(0)?, name: row.get(1)? })
    })?
    .collect()
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RoleStore {
  conn: tokio_rusqlite::Connection,
}

impl RoleStore {
  pub fn new(db: &Db) -> Self {
    Self { conn: db.connection() }
  }

  /// Role names are unique, so this is the natural lookup for callers
  /// holding a name instead of an id.
  pub async fn find_by_name(&self, name: &str) -> Result<Option<Role>> {
    let name = name.to_owned();
    let role = self
      .conn
      .call(move |conn| {
        let Some((id, name)) = conn
          .query_row(
            "SELECT id, name FROM roles WHERE name = ?1",
            rusqlite::params![name],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
          )
          .optional()?
        else {
          return Ok(None);
        };
        let permissions = load_permissions(conn, id)?;
        Ok(Some(Role { id, name, permissions }))
      })
      .await?;
    Ok(role)
  }

  /// Assign one more permission to a role. Validates every precondition
  /// first and fails with a descriptive error for the one that's violated.
  pub async fn add_permission(&self, role_id: i64, permission_id: i64) -> Result<()> {
    self.check_association_preconditions(role_id, permission_id).await?;

    if self.is_assigned(role_id, permission_id).await? {
      return Err(Error::Core(
        pastoral_core::Error::PermissionAlreadyAssigned { role_id, permission_id },
      ));
    }

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO role_permissions (role_id, permission_id) VALUES (?1, ?2)",
          rusqlite::params![role_id, permission_id],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(role_id, permission_id, "permission assigned");
    Ok(())
  }

  /// Remove one permission from a role, with the mirror-image precondition
  /// checks of [`Self::add_permission`].
  pub async fn remove_permission(&self, role_id: i64, permission_id: i64) -> Result<()> {
    self.check_association_preconditions(role_id, permission_id).await?;

    if !self.is_assigned(role_id, permission_id).await? {
      return Err(Error::Core(pastoral_core::Error::PermissionNotAssigned {
        role_id,
        permission_id,
      }));
    }

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM role_permissions WHERE role_id = ?1 AND permission_id = ?2",
          rusqlite::params![role_id, permission_id],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(role_id, permission_id, "permission removed");
    Ok(())
  }

  /// Whether any staff member still holds this role — the delete-guard
  /// primitive used by the role-management policy layer.
  pub async fn has_staff(&self, role_id: i64) -> Result<bool> {
    let assigned = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM staff WHERE role_id = ?1 LIMIT 1",
              rusqlite::params![role_id],
              |_| Ok(()),
            )
            .optional()?
            .is_some(),
        )
      })
      .await?;
    Ok(assigned)
  }

  async fn check_association_preconditions(
    &self,
    role_id: i64,
    permission_id: i64,
  ) -> Result<()> {
    if self.find_by_id(role_id).await?.is_none() {
      return Err(Error::Core(pastoral_core::Error::RoleNotFound(role_id)));
    }

    let permission_exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM permissions WHERE id = ?1",
              rusqlite::params![permission_id],
              |_| Ok(()),
            )
            .optional()?
            .is_some(),
        )
      })
      .await?;
    if !permission_exists {
      return Err(Error::Core(pastoral_core::Error::PermissionNotFound(
        permission_id,
      )));
    }
    Ok(())
  }

  async fn is_assigned(&self, role_id: i64, permission_id: i64) -> Result<bool> {
    let assigned = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM role_permissions WHERE role_id = ?1 AND permission_id = ?2",
              rusqlite::params![role_id, permission_id],
              |_| Ok(()),
            )
            .optional()?
            .is_some(),
        )
      })
      .await?;
    Ok(assigned)
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for RoleStore {
  type Entity = Role;
  type Error = Error;

  /// A role must carry at least one permission; an empty list fails before
  /// anything is written. Otherwise one transaction inserts the role row
  /// and the whole association batch.
  async fn save(&self, role: &Role) -> Result<i64> {
    if role.permissions.is_empty() {
      return Err(Error::Core(pastoral_core::Error::RoleWithoutPermissions));
    }
    let role = role.clone();

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO roles (name) VALUES (?1)",
          rusqlite::params![role.name],
        )?;
        let id = tx.last_insert_rowid();
        insert_associations(&tx, id, &role.permissions)?;
        tx.commit()?;
        Ok(id)
      })
      .await?;

    tracing::debug!(id, "role saved");
    Ok(id)
  }

  async fn find_by_id(&self, id: i64) -> Result<Option<Role>> {
    let role = self
      .conn
      .call(move |conn| {
        let Some(name) = conn
          .query_row(
            "SELECT name FROM roles WHERE id = ?1",
            rusqlite::params![id],
            |row| row.get::<_, String>(0),
          )
          .optional()?
        else {
          return Ok(None);
        };
        let permissions = load_permissions(conn, id)?;
        Ok(Some(Role { id, name, permissions }))
      })
      .await?;
    Ok(role)
  }

  /// Two queries total, however many roles there are: all roles, then all
  /// associations joined to permissions, distributed by role id.
  async fn find_all(&self) -> Result<Vec<Role>> {
    let roles = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT id, name FROM roles")?;
        let mut roles = stmt
          .query_map([], |row| {
            Ok(Role {
              id:          row.get(0)?,
              name:        row.get(1)?,
              permissions: Vec::new(),
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        if roles.is_empty() {
          return Ok(roles);
        }

        let index: HashMap<i64, usize> = roles
          .iter()
          .enumerate()
          .map(|(i, role)| (role.id, i))
          .collect();

        let mut stmt = conn.prepare(
          "SELECT rp.role_id, p.id, p.name
           FROM role_permissions rp
           JOIN permissions p ON p.id = rp.permission_id
           ORDER BY p.id",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
          let role_id: i64 = row.get(0)?;
          if let Some(&i) = index.get(&role_id) {
            roles[i]
              .permissions
              .push(Permission { id: row.get(1)?, name: row.get(2)? });
          }
        }

        Ok(roles)
      })
      .await?;
    Ok(roles)
  }

  /// Rewrite the name, then replace the association set wholesale — delete
  /// everything, re-insert the new batch — in one transaction.
  async fn update(&self, role: &Role) -> Result<()> {
    let role = role.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE roles SET name = ?1 WHERE id = ?2",
          rusqlite::params![role.name, role.id],
        )?;
        if changed == 0 {
          return Ok(false);
        }
        tx.execute(
          "DELETE FROM role_permissions WHERE role_id = ?1",
          rusqlite::params![role.id],
        )?;
        insert_associations(&tx, role.id, &role.permissions)?;
        tx.commit()?;
        Ok(true)
      })
      .await
      .map(|updated| {
        if !updated {
          tracing::warn!("no role row to update");
        }
      })
      .map_err(Error::from)
  }

  /// Physical. Associations go in the same transaction as the role row.
  async fn delete(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM role_permissions WHERE role_id = ?1",
          rusqlite::params![id],
        )?;
        tx.execute("DELETE FROM roles WHERE id = ?1", rusqlite::params![id])?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
