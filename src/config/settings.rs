//! Application settings loaded from a TOML file with environment overrides.
//!
//! The engine itself is configured per-group (amounts, grace, fees); this file
//! covers the handful of process-wide knobs: the database URL and defaults
//! applied to new groups and withdrawal requests.

use serde::Deserialize;

use crate::errors::Result;

/// Process-wide configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Database connection URL
    #[serde(default = "super::database::get_database_url")]
    pub database_url: String,
    /// Defaults applied when creating groups and withdrawal requests
    #[serde(default)]
    pub defaults: EngineDefaults,
}

/// Default knobs for new groups and withdrawal handling.
#[derive(Clone, Debug, Deserialize)]
pub struct EngineDefaults {
    /// Grace period applied to new groups when the administrator leaves it unset
    pub grace_period_hours: i32,
    /// Late fee applied to new groups when the administrator leaves it unset
    pub late_fee: f64,
    /// Days a pending withdrawal request stays approvable
    pub withdrawal_expiry_days: i64,
}

impl Default for EngineDefaults {
    fn default() -> Self {
        Self {
            grace_period_hours: 24,
            late_fee: 0.0,
            withdrawal_expiry_days: 7,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: super::database::get_database_url(),
            defaults: EngineDefaults::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the file named by `ENGINE_CONFIG`, falling back
    /// to built-in defaults when the variable or file is absent.
    pub fn load() -> Result<Self> {
        let Ok(path) = std::env::var("ENGINE_CONFIG") else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        Ok(config)
    }
}
