//! PRP Database — SurrealDB connection management and repository
//! implementations.
//!
//! This crate provides:
//! - Opening the store and building repositories ([`PortalStore`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Error types ([`DbError`])
//! - Implementations of the `prp-core` repository traits ([`repository`])

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, PortalStore};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
