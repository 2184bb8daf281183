//! [`CategoryStore`] — plain CRUD over the `categories` table.

use pastoral_core::{category::Category, store::RecordStore};
use rusqlite::OptionalExtension as _;

use crate::{db::Db, Error, Result};

#[derive(Clone)]
pub struct CategoryStore {
  conn: tokio_rusqlite::Connection,
}

impl CategoryStore {
  pub fn new(db: &Db) -> Self {
    Self { conn: db.connection() }
  }
}

impl RecordStore for CategoryStore {
  type Entity = Category;
  type Error = Error;

  async fn save(&self, category: &Category) -> Result<i64> {
    let category = category.clone();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO categories (name, description) VALUES (?1, ?2)",
          rusqlite::params![category.name, category.description],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(id)
  }

  async fn find_by_id(&self, id: i64) -> Result<Option<Category>> {
    let category = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, name, description FROM categories WHERE id = ?1",
              rusqlite::params![id],
              |row| {
                Ok(Category {
                  id:          row.get(0)?,
                  name:        row.get(1)?,
                  description: row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;
    Ok(category)
  }

  async fn find_all(&self) -> Result<Vec<Category>> {
    let categories = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT id, name, description FROM categories")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(Category {
              id:          row.get(0)?,
              name:        row.get(1)?,
              description: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(categories)
  }

  async fn update(&self, category: &Category) -> Result<()> {
    let category = category.clone();
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE categories SET name = ?1, description = ?2 WHERE id = ?3",
          rusqlite::params![category.name, category.description, category.id],
        )?)
      })
      .await?;

    if changed == 0 {
      tracing::warn!("no category row to update");
    }
    Ok(())
  }

  /// Physical.
  async fn delete(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM categories WHERE id = ?1", rusqlite::params![id])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
