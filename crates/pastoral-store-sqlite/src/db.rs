//! The relational store handle and its configuration.
//!
//! Exactly one underlying SQLite connection is opened per [`Db`]; every
//! accessor holds a cheap clone of the same handle, so all statements run
//! serially against that one connection. The handle is constructed
//! explicitly and passed down — no process-wide singleton — which lets
//! tests substitute an in-memory store.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{schema::SCHEMA, Result};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Externally supplied store configuration, loaded from a TOML file plus
/// `PASTORAL_`-prefixed environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
  /// Filesystem path of the SQLite database.
  pub store_path: PathBuf,
}

impl DbConfig {
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path.as_ref()).required(false))
      .add_source(config::Environment::with_prefix("PASTORAL"))
      .build()?;
    Ok(settings.try_deserialize()?)
  }
}

// ─── Handle ──────────────────────────────────────────────────────────────────

/// A Pastoral store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct Db {
  conn: tokio_rusqlite::Connection,
}

impl Db {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let db = Self { conn };
    db.init_schema().await?;
    Ok(db)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let db = Self { conn };
    db.init_schema().await?;
    Ok(db)
  }

  /// Open the store described by `config`.
  pub async fn from_config(config: &DbConfig) -> Result<Self> {
    Self::open(&config.store_path).await
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub(crate) fn connection(&self) -> tokio_rusqlite::Connection {
    self.conn.clone()
  }
}
