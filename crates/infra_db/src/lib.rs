//! Infrastructure Database Layer
//!
//! This crate provides the database infrastructure for the playhouse site
//! backend, implementing the lead-capture record store on PostgreSQL using
//! SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: repositories encapsulate SQL
//! and row mapping, and the `PostgresLeadStore` adapter exposes them to the
//! domain through the `LeadStorePort` trait. All sync-status mutations are
//! single-row statements; the claim is a conditional UPDATE so concurrent
//! sync paths serialize on the row itself.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, PostgresLeadStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/playhouse")).await?;
//! let store = PostgresLeadStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, create_pool_from_url, DatabaseConfig};
pub use error::DatabaseError;
pub use adapters::PostgresLeadStore;
