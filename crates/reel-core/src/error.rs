//! # Error Types
//!
//! Domain-specific error types for reel-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  reel-core errors (this file)                                          │
//! │  ├── CoreError        - Rental rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  reel-db errors (separate crate)                                       │
//! │  └── DbError          - Database failures, wraps CoreError as Domain   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError::Domain → caller          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Callers branch on the variant, never on the message text.

use thiserror::Error;

use crate::rental::LifecycleAction;
use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Media copy id does not exist.
    #[error("Media copy not found: {0}")]
    CopyNotFound(String),

    /// Title id does not exist.
    #[error("Title not found: {0}")]
    TitleNotFound(String),

    /// Order id does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Cart line does not exist in the given session.
    #[error("Cart line not found: {0}")]
    CartLineNotFound(String),

    /// Checkout was attempted with no cart lines.
    #[error("Cart is empty for session {session_id}")]
    EmptyCart { session_id: String },

    /// Copy is held by another order.
    ///
    /// ## When This Occurs
    /// ```text
    /// Session A cart: copy X        Session B cart: copy X
    ///      │                              │
    ///      ▼                              │
    /// checkout → claims X (1 → 0)         │
    ///                                     ▼
    ///                      checkout → claim X finds 0
    ///                                     │
    ///                                     ▼
    ///                      Unavailable { copy_id: X }, rolled back
    /// ```
    #[error("Media copy {copy_id} is not available")]
    Unavailable { copy_id: String },

    /// Rental days outside `1..=max`.
    #[error("Invalid rental days {requested}: must be between 1 and {max}")]
    InvalidDays { requested: i64, max: i64 },

    /// Quantity is zero or negative.
    #[error("Invalid quantity {requested}: must be positive")]
    InvalidQuantity { requested: i64 },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Cart has reached its line limit.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// The order's current status does not allow the action.
    #[error("Order {order_id} is {from}, cannot {action}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        action: LifecycleAction,
    },

    /// Customer is blocked from renting.
    #[error("Customer {email} is blocked")]
    CustomerBlocked { email: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Whether the error means a referenced id is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::CopyNotFound(_)
                | CoreError::TitleNotFound(_)
                | CoreError::OrderNotFound(_)
                | CoreError::CartLineNotFound(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
