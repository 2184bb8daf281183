//! SQLite backend for the Pastoral case-tracking store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. One accessor type per
//! entity; subtype accessors compose the base accessor's row helpers so a
//! multi-table write is a single transaction.

mod encode;
mod schema;

pub mod cases;
pub mod categories;
pub mod common_cases;
pub mod db;
pub mod error;
pub mod incidents;
pub mod permissions;
pub mod roles;
pub mod staff;
pub mod students;
pub mod users;

pub use cases::CaseStore;
pub use categories::CategoryStore;
pub use common_cases::CommonCaseStore;
pub use db::{Db, DbConfig};
pub use error::{Error, Result};
pub use incidents::IncidentStore;
pub use permissions::PermissionStore;
pub use roles::RoleStore;
pub use staff::StaffStore;
pub use students::StudentStore;
pub use users::UserStore;

#[cfg(test)]
mod tests;
