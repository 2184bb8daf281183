//! Core types and trait definitions for the Pastoral case-tracking store.
//!
//! This crate is deliberately free of database dependencies. The storage
//! backend (`pastoral-store-sqlite`) and the credential backend
//! (`pastoral-auth`) both depend on it; it depends on nothing heavier than
//! `chrono` and `serde`.

pub mod case;
pub mod category;
pub mod credential;
pub mod error;
pub mod role;
pub mod store;
pub mod user;

pub use error::{Error, Result};
