//! # Validation Module
//!
//! Input validation for identifiers handed to the circulation engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (catalog UI, request handler)                         │
//! │  └── Identity is trusted; the engine does not authenticate             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Coordinator (Rust)                                           │
//! │  └── THIS MODULE: shape checks on isbn / user id / location            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on status columns                               │
//! │  ├── Partial UNIQUE index: one open borrow per copy                    │
//! │  └── Foreign keys: copies → catalog_entries                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stacks_core::validation::{validate_isbn, validate_user_id};
//!
//! validate_isbn("978-0-13-110362-7").unwrap();
//! validate_user_id("patron-42").unwrap();
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_ISBN_LEN: usize = 32;
const MAX_USER_ID_LEN: usize = 64;
const MAX_LOCATION_LEN: usize = 100;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates an ISBN-like catalog key.
///
/// ## Rules
/// - Must not be empty
/// - At most 32 characters
/// - Letters, digits and hyphens only (local accession keys such as
///   `B001` are accepted alongside ISBN-10/13)
///
/// ## Example
/// ```rust
/// use stacks_core::validation::validate_isbn;
///
/// assert!(validate_isbn("B001").is_ok());
/// assert!(validate_isbn("").is_err());
/// assert!(validate_isbn("978 0131103627").is_err());
/// ```
pub fn validate_isbn(isbn: &str) -> ValidationResult<()> {
    let isbn = isbn.trim();

    if isbn.is_empty() {
        return Err(ValidationError::Required {
            field: "isbn".to_string(),
        });
    }

    if isbn.len() > MAX_ISBN_LEN {
        return Err(ValidationError::TooLong {
            field: "isbn".to_string(),
            max: MAX_ISBN_LEN,
        });
    }

    if !isbn.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::InvalidFormat {
            field: "isbn".to_string(),
            reason: "must contain only letters, digits and hyphens".to_string(),
        });
    }

    Ok(())
}

/// Validates a caller-supplied user id.
pub fn validate_user_id(user_id: &str) -> ValidationResult<()> {
    validate_required_text("user_id", user_id, MAX_USER_ID_LEN)
}

/// Validates a copy's shelf location.
pub fn validate_location(location: &str) -> ValidationResult<()> {
    validate_required_text("location", location, MAX_LOCATION_LEN)
}

/// Validates an id previously issued by the engine (copy, record, reservation).
pub fn validate_record_id(field: &str, id: &str) -> ValidationResult<()> {
    validate_required_text(field, id, MAX_USER_ID_LEN)
}

fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_isbn() {
        assert!(validate_isbn("9780131103627").is_ok());
        assert!(validate_isbn("0-13-110362-8").is_ok());
        assert!(validate_isbn("B002").is_ok());

        assert!(matches!(
            validate_isbn("   "),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_isbn(&"9".repeat(40)),
            Err(ValidationError::TooLong { .. })
        ));
        assert!(matches!(
            validate_isbn("978/013"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_validate_user_id() {
        assert!(validate_user_id("u-1").is_ok());
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_location() {
        assert!(validate_location("Main / Stack 3").is_ok());
        assert!(validate_location("").is_err());
    }

    #[test]
    fn test_validate_record_id_names_field() {
        let err = validate_record_id("reservation_id", "").unwrap_err();
        assert_eq!(err.to_string(), "reservation_id is required");
    }
}
