//! # Circulation Error Types
//!
//! The error surface of the coordinator.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Circulation Error Categories                         │
//! │                                                                         │
//! │  ┌──────────────────────┐  ┌─────────────────┐  ┌──────────────────┐   │
//! │  │       Domain         │  │    Database     │  │   Configuration  │   │
//! │  │                      │  │                 │  │                  │   │
//! │  │  NoCopyAvailable     │  │  QueryFailed    │  │  InvalidConfig   │   │
//! │  │  Contention          │  │  PoolExhausted  │  │  ConfigLoad...   │   │
//! │  │  AlreadyClosed       │  │  Migration...   │  │                  │   │
//! │  │  AlreadyFulfilled    │  │                 │  │                  │   │
//! │  │  CopyAvailable ...   │  │                 │  │                  │   │
//! │  └──────────────────────┘  └─────────────────┘  └──────────────────┘   │
//! │                                                                         │
//! │  Domain errors are for the caller to act on (retry, pick another copy, │
//! │  reserve instead). Database errors mean the store itself failed.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use stacks_core::{CoreError, ValidationError};
use stacks_db::DbError;
use thiserror::Error;

/// Result type alias for coordinator operations.
pub type CirculationResult<T> = Result<T, CirculationError>;

/// Everything a coordinator operation can fail with.
#[derive(Debug, Error)]
pub enum CirculationError {
    /// A circulation rule rejected the request.
    #[error(transparent)]
    Domain(CoreError),

    /// The record store failed.
    #[error("Database error: {0}")]
    Database(DbError),

    /// Invalid engine configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read or parse the config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for CirculationError {
    fn from(err: CoreError) -> Self {
        CirculationError::Domain(err)
    }
}

impl From<ValidationError> for CirculationError {
    fn from(err: ValidationError) -> Self {
        CirculationError::Domain(CoreError::Validation(err))
    }
}

/// Repository rejections surface as domain errors; only storage failures
/// stay wrapped as `Database`.
impl From<DbError> for CirculationError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => CirculationError::Domain(core),
            other => CirculationError::Database(other),
        }
    }
}

impl From<std::io::Error> for CirculationError {
    fn from(err: std::io::Error) -> Self {
        CirculationError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for CirculationError {
    fn from(err: toml::de::Error) -> Self {
        CirculationError::ConfigLoadFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl CirculationError {
    /// The domain error, if this is one.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            CirculationError::Domain(err) => Some(err),
            _ => None,
        }
    }

    /// Returns true if the caller may retry the same request unchanged.
    ///
    /// ## Retryable Errors
    /// - Contention on the last copy
    /// - A conditional update lost to a concurrent writer
    /// - Connection pool exhaustion
    pub fn is_retryable(&self) -> bool {
        match self {
            CirculationError::Domain(CoreError::Contention { .. })
            | CirculationError::Domain(CoreError::TransitionConflict { .. }) => true,
            CirculationError::Database(db) => db.is_retryable(),
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CirculationError::InvalidConfig(_) | CirculationError::ConfigLoadFailed(_)
        )
    }

    /// Stable identifier for transports and logs.
    pub fn code(&self) -> &'static str {
        match self {
            CirculationError::Domain(err) => err.code(),
            CirculationError::Database(DbError::PoolExhausted) => "BUSY",
            CirculationError::Database(_) => "DATABASE",
            CirculationError::InvalidConfig(_) | CirculationError::ConfigLoadFailed(_) => {
                "CONFIG"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_rejections_unwrap_to_domain() {
        let err: CirculationError = DbError::Domain(CoreError::AlreadyCancelled {
            reservation_id: "res-1".into(),
        })
        .into();

        assert!(matches!(
            err,
            CirculationError::Domain(CoreError::AlreadyCancelled { .. })
        ));
        assert_eq!(err.code(), "ALREADY_CANCELLED");
    }

    #[test]
    fn test_retryable_errors() {
        let contention: CirculationError = CoreError::Contention {
            isbn: "B001".into(),
            copy_id: "copy-1".into(),
        }
        .into();
        assert!(contention.is_retryable());
        assert!(CirculationError::Database(DbError::PoolExhausted).is_retryable());

        let none: CirculationError = CoreError::NoCopyAvailable {
            isbn: "B001".into(),
        }
        .into();
        assert!(!none.is_retryable());
        assert!(!CirculationError::InvalidConfig("bad".into()).is_retryable());
    }

    #[test]
    fn test_codes() {
        assert_eq!(CirculationError::Database(DbError::PoolExhausted).code(), "BUSY");
        assert_eq!(
            CirculationError::Database(DbError::QueryFailed("x".into())).code(),
            "DATABASE"
        );
        assert_eq!(CirculationError::InvalidConfig("x".into()).code(), "CONFIG");
        assert!(CirculationError::ConfigLoadFailed("x".into()).is_config_error());
    }

    #[test]
    fn test_error_display() {
        let err: CirculationError = CoreError::CopyAvailable {
            isbn: "B001".into(),
            available: 2,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "2 copies of B001 are available; borrow instead of reserving"
        );
    }
}
