//! # Validation Module
//!
//! Input validation utilities for Reel Rental.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront form                                              │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Business rule validation (days, quantities, ids, contact info)    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints (status names, positive days/quantity)          │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Functions returning [`CoreError`] map straight onto the rental error
//! taxonomy (`InvalidDays`, `InvalidQuantity`, ...). The rest return
//! [`ValidationError`] and convert with `?`.

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::{MAX_CART_LINES, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Rental Numbers
// =============================================================================

/// Validates a rental period in days.
///
/// ## Rules
/// - Must be at least 1
/// - Must not exceed `max_days`
///
/// ## Example
/// ```rust
/// use reel_core::validation::validate_rental_days;
///
/// assert!(validate_rental_days(3, 90).is_ok());
/// assert!(validate_rental_days(0, 90).is_err());
/// assert!(validate_rental_days(91, 90).is_err());
/// ```
pub fn validate_rental_days(days: i64, max_days: i64) -> CoreResult<()> {
    if days <= 0 || days > max_days {
        return Err(CoreError::InvalidDays {
            requested: days,
            max: max_days,
        });
    }
    Ok(())
}

/// Validates a cart line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> CoreResult<()> {
    if qty <= 0 {
        return Err(CoreError::InvalidQuantity { requested: qty });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(CoreError::QuantityTooLarge {
            requested: qty,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates that one more line fits into a cart of `current_lines`.
pub fn validate_cart_size(current_lines: usize) -> CoreResult<()> {
    if current_lines >= MAX_CART_LINES {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_LINES,
        });
    }
    Ok(())
}

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (promotional titles)
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Identifiers
// =============================================================================

/// Validates an opaque session token.
///
/// The token is never parsed; it only has to be present and bounded.
pub fn validate_session_id(session_id: &str) -> ValidationResult<()> {
    let session_id = session_id.trim();

    if session_id.is_empty() {
        return Err(ValidationError::Required {
            field: "session id".to_string(),
        });
    }

    if session_id.len() > 128 {
        return Err(ValidationError::TooLong {
            field: "session id".to_string(),
            max: 128,
        });
    }

    Ok(())
}

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use reel_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Contact Details
// =============================================================================

/// Validates a first or last name.
pub fn validate_person_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 100,
        });
    }

    Ok(())
}

/// Validates an email address.
///
/// ## Rules
/// - Required
/// - Exactly one `@` with a non-empty local part and a dotted domain
/// - No whitespace inside
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@example.com".to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.') =>
        {
            Ok(())
        }
        _ => Err(invalid()),
    }
}

/// Validates an optional phone number. Blank means "not given".
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Ok(());
    }

    if phone.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max: 32,
        });
    }

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits, spaces, and + - ( )".to_string(),
        });
    }

    Ok(())
}

/// Validates a catalog search query.
///
/// ## Returns
/// The trimmed query string; empty means "no filter".
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rental_days() {
        assert!(validate_rental_days(1, 90).is_ok());
        assert!(validate_rental_days(90, 90).is_ok());

        assert!(matches!(
            validate_rental_days(0, 90),
            Err(CoreError::InvalidDays { requested: 0, .. })
        ));
        assert!(validate_rental_days(-3, 90).is_err());
        assert!(validate_rental_days(91, 90).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());

        assert!(matches!(
            validate_quantity(0),
            Err(CoreError::InvalidQuantity { requested: 0 })
        ));
        assert!(matches!(
            validate_quantity(MAX_ITEM_QUANTITY + 1),
            Err(CoreError::QuantityTooLarge { .. })
        ));
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(0).is_ok());
        assert!(validate_cart_size(MAX_CART_LINES - 1).is_ok());
        assert!(validate_cart_size(MAX_CART_LINES).is_err());
    }

    #[test]
    fn test_validate_session_id() {
        assert!(validate_session_id("3f2a9c").is_ok());
        assert!(validate_session_id("   ").is_err());
        assert!(validate_session_id(&"s".repeat(200)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("anna@example.com").is_ok());
        assert!(validate_email("  anna@mail.example.org ").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("anna").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("anna@example").is_err());
        assert!(validate_email("an na@example.com").is_err());
        assert!(validate_email("a@b@example.com").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("").is_ok());
        assert!(validate_phone("+7 (912) 345-67-89").is_ok());
        assert!(validate_phone("call me").is_err());
    }

    #[test]
    fn test_validate_person_name() {
        assert!(validate_person_name("first name", "Anna").is_ok());
        assert!(validate_person_name("first name", " ").is_err());
        assert!(validate_person_name("last name", &"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_price_and_uuid() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(-1).is_err());
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  matrix ").unwrap(), "matrix");
        assert!(validate_search_query(&"q".repeat(101)).is_err());
    }
}
