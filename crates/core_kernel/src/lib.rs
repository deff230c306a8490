//! Core Kernel - Foundational types for the playhouse site backend
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Strongly-typed identifiers for domain entities
//! - Port infrastructure for the hexagonal architecture (ports and adapters)
//! - Common error types

pub mod identifiers;
pub mod error;
pub mod ports;

pub use identifiers::{ContactId, ConsultationId, SyncTaskId};
pub use error::CoreError;
pub use ports::{
    PortError, DomainPort,
    HealthCheckable, HealthCheckResult, AdapterHealth,
};
