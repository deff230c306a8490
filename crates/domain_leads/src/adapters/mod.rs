//! External Adapters for the Lead Domain
//!
//! This module provides adapter implementations for pushing leads into
//! external CRM systems. Adapters implement the `CrmPort` trait, so the sync
//! engine can swap between the real legacy CRM and the scripted mock.
//!
//! # Available Adapters
//!
//! - **LegacyCrmClient**: Speaks the legacy REST dialect of the external CRM
//! - **ScriptedCrm**: In-memory mock for testing (re-exported from the ports module)
//!
//! # Usage
//!
//! Configure the adapter at application startup:
//!
//! ```rust,ignore
//! use domain_leads::adapters::{CrmCapabilities, LegacyCrmClient, LegacyCrmConfig};
//! use domain_leads::CrmPort;
//! use std::sync::Arc;
//!
//! let config = LegacyCrmConfig::new(
//!     "https://crm.example.com",
//!     "site-integration",
//!     "secret",
//! )?;
//!
//! // One-time endpoint discovery, then a fixed mapping from here on.
//! let capabilities = CrmCapabilities::probe(&config).await?;
//! let crm: Arc<dyn CrmPort> = Arc::new(LegacyCrmClient::with_capabilities(config, capabilities)?);
//! ```

pub mod legacy_crm;

pub use legacy_crm::{CrmCapabilities, LegacyCrmClient, LegacyCrmConfig};
