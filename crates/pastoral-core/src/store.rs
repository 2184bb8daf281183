//! The generic `RecordStore` trait.
//!
//! Every concrete accessor in the storage backend implements this uniform
//! create/read/update/delete contract, whatever else it adds on top.
//! Higher layers depend on the trait, not on any concrete backend.

use std::future::Future;

/// Uniform record access, parameterized by entity kind.
///
/// Contract:
/// - `save` returns the store-generated id of the new row(s); the caller
///   is responsible for carrying it forward.
/// - `find_by_id` signals a miss with `None`, never with an error.
/// - `find_all` returns an empty vector when no rows match.
/// - `delete` is physical or logical depending on the entity's lifecycle
///   policy; implementations document which.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes.
pub trait RecordStore: Send + Sync {
  type Entity: Send;
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new entity. Any id already present on `entity` is ignored.
  fn save<'a>(
    &'a self,
    entity: &'a Self::Entity,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + 'a;

  /// Fetch one entity by id. Returns `None` if no visible row matches.
  fn find_by_id(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Self::Entity>, Self::Error>> + Send + '_;

  /// Fetch every visible entity.
  fn find_all(
    &self,
  ) -> impl Future<Output = Result<Vec<Self::Entity>, Self::Error>> + Send + '_;

  /// Rewrite the mutable columns of an existing entity, keyed by its id.
  fn update<'a>(
    &'a self,
    entity: &'a Self::Entity,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove (or deactivate) the entity with the given id.
  fn delete(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
