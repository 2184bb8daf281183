//! [`UserStore`] — the accessor for the base table of the user hierarchy.
//!
//! Reads reconstruct the base-row projection and its discriminator; the
//! subtype accessors ([`crate::StudentStore`], [`crate::StaffStore`])
//! delegate here for shared columns and add their specialization tables.
//! Deletion is logical: rows are deactivated, never removed.

use std::sync::Arc;

use pastoral_core::{
  credential::CredentialHasher,
  store::RecordStore,
  user::{AuthUser, RoleRef, User, UserProfile, UserStatus},
};
use rusqlite::OptionalExtension as _;

use crate::{
  db::Db,
  encode::{decode_status, decode_user_kind, encode_status, encode_user_kind, RawUser},
  Error, Result,
};

// ─── Row helpers ─────────────────────────────────────────────────────────────
//
// Shared with the subtype accessors so their multi-table writes can compose
// the base-row statement inside one transaction.

pub(crate) fn insert_user_row(
  conn: &rusqlite::Connection,
  user: &User,
  digest: &str,
) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO users (first_name, last_name, email, credential, document_id, status, kind)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      user.first_name,
      user.last_name,
      user.email,
      digest,
      user.document_id,
      encode_status(user.status),
      encode_user_kind(user.kind),
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

/// Rewrite the mutable base columns. The discriminator is immutable and
/// the credential is owned by `change_password`; neither is touched here.
pub(crate) fn update_user_row(
  conn: &rusqlite::Connection,
  user: &User,
) -> rusqlite::Result<usize> {
  conn.execute(
    "UPDATE users
     SET first_name = ?1, last_name = ?2, email = ?3, document_id = ?4, status = ?5
     WHERE id = ?6",
    rusqlite::params![
      user.first_name,
      user.last_name,
      user.email,
      user.document_id,
      encode_status(user.status),
      user.id,
    ],
  )
}

fn map_raw_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUser> {
  Ok(RawUser {
    id:          row.get(0)?,
    first_name:  row.get(1)?,
    last_name:   row.get(2)?,
    email:       row.get(3)?,
    credential:  row.get(4)?,
    document_id: row.get(5)?,
    status:      row.get(6)?,
    kind:        row.get(7)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct UserStore {
  conn:   tokio_rusqlite::Connection,
  hasher: Arc<dyn CredentialHasher>,
}

impl UserStore {
  pub fn new(db: &Db, hasher: Arc<dyn CredentialHasher>) -> Self {
    Self { conn: db.connection(), hasher }
  }

  pub(crate) fn hasher(&self) -> &Arc<dyn CredentialHasher> {
    &self.hasher
  }

  /// Look a user up by email, regardless of status.
  ///
  /// Authentication must distinguish an inactive account from a missing
  /// one, so no `ACTIVE` filter is applied here. For staff-kind rows the
  /// role id and name are attached opportunistically through a LEFT JOIN;
  /// the role's permission list is not loaded.
  pub async fn find_by_email(&self, email: &str) -> Result<Option<AuthUser>> {
    let email = email.to_owned();

    let raw: Option<(RawUser, Option<i64>, Option<String>)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT u.id, u.first_name, u.last_name, u.email, u.credential,
                      u.document_id, u.status, u.kind,
                      s.role_id, r.name AS role_name
               FROM users u
               LEFT JOIN staff s ON s.id = u.id
               LEFT JOIN roles r ON r.id = s.role_id
               WHERE u.email = ?1",
              rusqlite::params![email],
              |row| Ok((map_raw_user(row)?, row.get(8)?, row.get(9)?)),
            )
            .optional()?,
        )
      })
      .await?;

    let Some((raw, role_id, role_name)) = raw else {
      return Ok(None);
    };

    let user = raw.into_user()?;
    let role = role_id
      .zip(role_name)
      .map(|(id, name)| RoleRef { id, name });
    Ok(Some(AuthUser { user, role }))
  }

  /// Check a plaintext credential against the stored digest.
  ///
  /// Every failure — unknown email, inactive account, wrong password —
  /// collapses into the same `AuthenticationFailed` error so the caller
  /// learns nothing about which check missed.
  pub async fn validate_credentials(
    &self,
    email: &str,
    plaintext: &str,
  ) -> Result<AuthUser> {
    let Some(auth) = self.find_by_email(email).await? else {
      return Err(Error::Core(pastoral_core::Error::AuthenticationFailed));
    };
    if auth.user.status != UserStatus::Active
      || !self.hasher.verify(plaintext, &auth.user.credential)
    {
      return Err(Error::Core(pastoral_core::Error::AuthenticationFailed));
    }
    Ok(auth)
  }

  /// Hash and store a new credential for the given user.
  pub async fn change_password(&self, id: i64, plaintext: &str) -> Result<()> {
    let digest = self.hasher.hash(plaintext)?;
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET credential = ?1 WHERE id = ?2",
          rusqlite::params![digest, id],
        )?)
      })
      .await?;

    if changed == 0 {
      tracing::warn!(id, "no user row for password change");
    }
    Ok(())
  }

  /// Credential-free projection of a user row; the credential column is
  /// never read. No status filter.
  pub async fn view_non_sensitive(&self, id: i64) -> Result<Option<UserProfile>> {
    let raw: Option<(i64, String, String, String, String, String, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, first_name, last_name, email, document_id, status, kind
               FROM users WHERE id = ?1",
              rusqlite::params![id],
              |row| {
                Ok((
                  row.get(0)?,
                  row.get(1)?,
                  row.get(2)?,
                  row.get(3)?,
                  row.get(4)?,
                  row.get(5)?,
                  row.get(6)?,
                ))
              },
            )
            .optional()?,
        )
      })
      .await?;

    let Some((id, first_name, last_name, email, document_id, status, kind)) = raw
    else {
      return Ok(None);
    };

    Ok(Some(UserProfile {
      id,
      first_name,
      last_name,
      email,
      document_id,
      status: decode_status(&status)?,
      kind: decode_user_kind(&kind)?,
    }))
  }

  /// Flip the row to INACTIVE. The row — and any specialization row —
  /// stays in place so historical references keep resolving at the SQL
  /// level, while generic lookups stop seeing the user.
  pub async fn delete_logical(&self, id: i64) -> Result<()> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET status = 'INACTIVE' WHERE id = ?1",
          rusqlite::params![id],
        )?)
      })
      .await?;

    if changed == 0 {
      tracing::warn!(id, "no user row to deactivate");
    } else {
      tracing::debug!(id, "user deactivated");
    }
    Ok(())
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for UserStore {
  type Entity = User;
  type Error = Error;

  /// Hash the credential through the injected collaborator, then insert
  /// the base row and return the generated id.
  async fn save(&self, user: &User) -> Result<i64> {
    let digest = self.hasher.hash(&user.credential)?;
    let user = user.clone();

    let id = self
      .conn
      .call(move |conn| Ok(insert_user_row(conn, &user, &digest)?))
      .await?;

    tracing::debug!(id, "user saved");
    Ok(id)
  }

  /// Active rows only: a logically deleted user is invisible to generic
  /// lookup even though the row still exists.
  async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, first_name, last_name, email, credential, document_id, status, kind
               FROM users WHERE id = ?1 AND status = 'ACTIVE'",
              rusqlite::params![id],
              map_raw_user,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn find_all(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT id, first_name, last_name, email, credential, document_id, status, kind
           FROM users WHERE status = 'ACTIVE'",
        )?;
        let rows = stmt
          .query_map([], map_raw_user)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn update(&self, user: &User) -> Result<()> {
    let id = user.id;
    let user = user.clone();
    let changed = self
      .conn
      .call(move |conn| Ok(update_user_row(conn, &user)?))
      .await?;

    if changed == 0 {
      tracing::warn!(id, "no user row to update");
    }
    Ok(())
  }

  /// Always logical for users.
  async fn delete(&self, id: i64) -> Result<()> {
    self.delete_logical(id).await
  }
}
