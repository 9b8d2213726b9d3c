//! # Cart Accumulator
//!
//! Pure cart math over persisted cart lines.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Storefront Action        reel-db call               Line change        │
//! │  ─────────────────        ────────────               ───────────        │
//! │                                                                         │
//! │  "Rent" button ─────────► cart().add_item() ───────► insert / qty += 1  │
//! │                                                                         │
//! │  Change days ───────────► cart().update_days() ────► rental_days = n    │
//! │                                                                         │
//! │  Remove ────────────────► cart().remove_item() ────► delete line        │
//! │                                                                         │
//! │  Clear ─────────────────► cart().clear() ──────────► delete session     │
//! │                                                                         │
//! │  Checkout ──────────────► orders().checkout() ─────► lines → order      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by `(session_id, copy_id)`; adding the same copy again
//!   increases quantity
//! - `rental_days` and `quantity` are always positive

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::Money;
use crate::pricing;
use crate::types::CartLine;
use crate::validation::{validate_quantity, validate_rental_days};

// =============================================================================
// Line Mutations
// =============================================================================

impl CartLine {
    /// Adds one more of the same copy to the line.
    pub fn increment(&mut self) -> CoreResult<()> {
        let next = self.quantity + 1;
        validate_quantity(next)?;
        self.quantity = next;
        Ok(())
    }

    /// Overwrites the rental period.
    pub fn set_rental_days(&mut self, days: i64, max_days: i64) -> CoreResult<()> {
        validate_rental_days(days, max_days)?;
        self.rental_days = days;
        Ok(())
    }
}

// =============================================================================
// Cart Item
// =============================================================================

/// A cart line joined with what it costs and what it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartItem {
    pub id: String,
    pub session_id: String,
    pub copy_id: String,
    pub rental_days: i64,
    pub quantity: i64,
    #[ts(as = "String")]
    pub desired_pickup_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
    pub title_id: String,
    pub title_name: String,
    pub format_name: String,
    /// Current daily price of the copy's format, in cents.
    pub daily_price_cents: i64,
}

impl CartItem {
    /// Returns the daily price as Money.
    #[inline]
    pub fn daily_price(&self) -> Money {
        Money::from_cents(self.daily_price_cents)
    }

    /// daily price × rental days × quantity.
    pub fn line_total(&self) -> Money {
        pricing::line_total(self.daily_price(), self.rental_days, self.quantity)
    }

    /// The bare persisted line.
    pub fn line(&self) -> CartLine {
        CartLine {
            id: self.id.clone(),
            session_id: self.session_id.clone(),
            copy_id: self.copy_id.clone(),
            rental_days: self.rental_days,
            quantity: self.quantity,
            desired_pickup_date: self.desired_pickup_date,
            added_at: self.added_at,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Every line of one session's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Cart {
    pub session_id: String,
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Wraps the loaded items of a session.
    pub fn new(session_id: impl Into<String>, items: Vec<CartItem>) -> Self {
        Cart {
            session_id: session_id.into(),
            items,
        }
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Sum of quantities.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Sum of line totals.
    pub fn total(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Finds the line holding a given copy.
    pub fn line_for_copy(&self, copy_id: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.copy_id == copy_id)
    }
}

/// Cart totals summary for the storefront header badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub total_cents: i64,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            total_cents: cart.total().cents(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
