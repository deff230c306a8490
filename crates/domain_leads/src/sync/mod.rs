//! CRM synchronization engine and background worker
//!
//! The engine drains eligible records from the store and pushes them to the
//! CRM; the worker invokes the engine on a fixed interval. Both operate on
//! the port traits, so they run identically against Postgres + the legacy
//! CRM and against the in-memory mocks.

pub mod engine;
pub mod worker;

pub use engine::{SyncAttemptOutcome, SyncEngine, SyncRunReport, SyncSettings};
pub use worker::{SyncWorker, SyncWorkerHandle};
