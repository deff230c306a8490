//! Domain Adapters
//!
//! This module provides adapter implementations for domain ports,
//! connecting domain interfaces to the PostgreSQL database layer.
//!
//! # Architecture
//!
//! The adapter:
//! - Implements the domain's `LeadStorePort` trait
//! - Translates between domain models and database row types
//! - Uses the repository layer for database operations
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresLeadStore;
//! use domain_leads::LeadStorePort;
//!
//! let store = PostgresLeadStore::new(pool);
//! let contact = store.get_contact(contact_id).await?;
//! ```

pub mod lead_store;

pub use lead_store::PostgresLeadStore;
