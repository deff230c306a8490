//! API configuration

use std::time::Duration;

use serde::Deserialize;

use domain_leads::SyncSettings;

/// API configuration
///
/// Every field has a default so a development instance runs with no
/// environment at all; production overrides via `APP_`-prefixed variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for admin authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,
    /// Base URL of the legacy CRM
    pub crm_base_url: String,
    /// CRM integration username
    pub crm_username: String,
    /// CRM integration password
    pub crm_password: String,
    /// Per-request CRM timeout in seconds
    pub crm_timeout_secs: u64,
    /// Delay between scheduled sync runs in seconds
    pub sync_interval_secs: u64,
    /// Records per sync batch
    pub sync_batch_size: u32,
    /// Sync attempt ceiling per record
    pub sync_max_attempts: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/playhouse".to_string(),
            log_level: "info".to_string(),
            crm_base_url: "http://localhost:8090".to_string(),
            crm_username: "admin".to_string(),
            crm_password: String::new(),
            crm_timeout_secs: 15,
            sync_interval_secs: 300,
            sync_batch_size: 10,
            sync_max_attempts: 5,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("APP"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The sync engine's tuning knobs
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            batch_size: self.sync_batch_size,
            max_attempts: self.sync_max_attempts,
        }
    }

    /// Delay between scheduled sync runs
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    /// Per-request CRM timeout
    pub fn crm_timeout(&self) -> Duration {
        Duration::from_secs(self.crm_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_operable() {
        let config = ApiConfig::default();

        assert_eq!(config.port, 8080);
        assert_eq!(config.sync_settings().batch_size, 10);
        assert_eq!(config.sync_settings().max_attempts, 5);
        assert_eq!(config.sync_interval(), Duration::from_secs(300));
        assert_eq!(config.crm_timeout(), Duration::from_secs(15));
    }
}
