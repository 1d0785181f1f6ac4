//! # Engine Configuration
//!
//! Configuration management for the circulation engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STACKS_DB_PATH=/var/lib/stacks/stacks.db                           │
//! │     STACKS_LOAN_PERIOD_DAYS=21                                         │
//! │     STACKS_RENEWAL_DAYS=14                                             │
//! │     STACKS_MAX_RENEWALS=3                                              │
//! │     STACKS_MAX_CONNECTIONS=8                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/stacks/stacks.toml (Linux)                               │
//! │     ~/Library/Application Support/org.stacks.stacks/stacks.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     14-day loans, 14-day renewals, no renewal cap                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # stacks.toml
//! [database]
//! path = "/var/lib/stacks/stacks.db"
//! max_connections = 5
//!
//! [policy]
//! loan_period_days = 14
//! renewal_days = 14
//! max_renewals = 2   # omit for unlimited
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use stacks_core::{LoanPolicy, DEFAULT_LOAN_PERIOD_DAYS, DEFAULT_RENEWAL_DAYS};
use stacks_db::DbConfig;

use crate::error::{CirculationError, CirculationResult};

const CONFIG_FILE: &str = "stacks.toml";
const DATABASE_FILE: &str = "stacks.db";

// =============================================================================
// Database Settings
// =============================================================================

/// Where the record store lives and how many connections it may use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to `stacks.db` in the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Policy Settings
// =============================================================================

/// Loan and renewal periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySettings {
    #[serde(default = "default_loan_period")]
    pub loan_period_days: u32,

    #[serde(default = "default_renewal_days")]
    pub renewal_days: u32,

    /// Renewals allowed per borrow record. `None` means unlimited.
    #[serde(default)]
    pub max_renewals: Option<u32>,
}

fn default_loan_period() -> u32 {
    DEFAULT_LOAN_PERIOD_DAYS
}

fn default_renewal_days() -> u32 {
    DEFAULT_RENEWAL_DAYS
}

impl Default for PolicySettings {
    fn default() -> Self {
        PolicySettings {
            loan_period_days: default_loan_period(),
            renewal_days: default_renewal_days(),
            max_renewals: None,
        }
    }
}

// =============================================================================
// Main Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub policy: PolicySettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`stacks.toml`)
    /// 3. Environment variables
    ///
    /// An explicit `config_path` that does not exist is an error; a missing
    /// file at the default location is not.
    pub fn load(config_path: Option<PathBuf>) -> CirculationResult<Self> {
        let mut config = match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(CirculationError::ConfigLoadFailed(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Self::from_file(&path)?
            }
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    debug!(?path, "Config file not found, using defaults");
                    Self::default()
                }
                None => Self::default(),
            },
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML config file without applying overrides.
    pub fn from_file(path: &Path) -> CirculationResult<Self> {
        info!(?path, "Loading engine config from file");
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> CirculationResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CirculationResult<()> {
        if self.database.max_connections == 0 {
            return Err(CirculationError::InvalidConfig(
                "max_connections must be greater than 0".into(),
            ));
        }

        self.build_policy()
            .validate()
            .map_err(|e| CirculationError::InvalidConfig(e.to_string()))
    }

    /// Applies `STACKS_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup; `lookup` returns `None` for
    /// unset keys. Unparseable numbers are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("STACKS_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(n) = parse_override(&lookup, "STACKS_MAX_CONNECTIONS") {
            self.database.max_connections = n;
        }

        if let Some(days) = parse_override(&lookup, "STACKS_LOAN_PERIOD_DAYS") {
            debug!(days, "Overriding loan period from environment");
            self.policy.loan_period_days = days;
        }

        if let Some(days) = parse_override(&lookup, "STACKS_RENEWAL_DAYS") {
            self.policy.renewal_days = days;
        }

        if let Some(max) = parse_override(&lookup, "STACKS_MAX_RENEWALS") {
            self.policy.max_renewals = Some(max);
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Configured database path, falling back to the platform data dir and
    /// finally to `./stacks.db`.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.data_dir().join(DATABASE_FILE)))
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE))
    }

    /// Pool configuration for `stacks-db`.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path()).max_connections(self.database.max_connections)
    }

    /// Validated loan policy.
    pub fn loan_policy(&self) -> CirculationResult<LoanPolicy> {
        let policy = self.build_policy();
        policy
            .validate()
            .map_err(|e| CirculationError::InvalidConfig(e.to_string()))?;
        Ok(policy)
    }

    fn build_policy(&self) -> LoanPolicy {
        LoanPolicy {
            loan_period_days: self.policy.loan_period_days,
            renewal_days: self.policy.renewal_days,
            max_renewals: self.policy.max_renewals,
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("org", "stacks", "stacks")
}

fn parse_override(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u32> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u32>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring non-numeric override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.policy.loan_period_days, 14);
        assert_eq!(config.policy.renewal_days, 14);
        assert_eq!(config.policy.max_renewals, None);
        assert_eq!(config.database.max_connections, 5);
        assert!(config.validate().is_ok());
        assert!(config.database_path().ends_with("stacks.db"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [policy]
            loan_period_days = 21
            max_renewals = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.policy.loan_period_days, 21);
        assert_eq!(config.policy.renewal_days, 14);
        assert_eq!(config.policy.max_renewals, Some(2));
        assert!(config.database.path.is_none());

        let policy = config.loan_policy().unwrap();
        assert_eq!(policy.max_renewals, Some(2));
    }

    #[test]
    fn test_overrides_take_priority() {
        let mut config = EngineConfig::from_toml(
            r#"
            [database]
            path = "/from/file.db"

            [policy]
            loan_period_days = 21
            "#,
        )
        .unwrap();

        let env: HashMap<&str, &str> = HashMap::from([
            ("STACKS_DB_PATH", "/from/env.db"),
            ("STACKS_LOAN_PERIOD_DAYS", "7"),
            ("STACKS_MAX_RENEWALS", "not-a-number"),
        ]);
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database_path(), PathBuf::from("/from/env.db"));
        assert_eq!(config.policy.loan_period_days, 7);
        assert_eq!(config.policy.max_renewals, None);
    }

    #[test]
    fn test_validation_rejects_non_positive_periods() {
        let mut config = EngineConfig::default();
        config.policy.renewal_days = 0;
        assert!(matches!(
            config.validate(),
            Err(CirculationError::InvalidConfig(_))
        ));

        let mut config = EngineConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let err = EngineConfig::load(Some(PathBuf::from("/nonexistent/stacks.toml"))).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("stacks-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[database]\nmax_connections = 3\n").unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.database.max_connections, 3);
        assert_eq!(config.db_config().max_connections, 3);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_toml_serialization() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[policy]"));
    }
}
