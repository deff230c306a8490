//! Repository implementations for domain entities
//!
//! This module provides concrete repository implementations that handle
//! database access for the lead-capture tables. Repositories encapsulate
//! SQL queries and map between database rows and domain types.
//!
//! # Architecture
//!
//! Each repository follows these principles:
//! - Runtime-bound queries (no live database needed at compile time)
//! - Single-row statements for every sync-status mutation
//! - Conditional UPDATEs for claim atomicity

pub mod leads;
pub mod sync_tasks;

pub use leads::{ConsultationRow, ContactRow, LeadRepository};
pub use sync_tasks::{SyncTaskRepository, SyncTaskRow};
