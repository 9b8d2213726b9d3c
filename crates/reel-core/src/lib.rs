//! # reel-core: Pure Business Logic for Reel Rental
//!
//! This crate is the **heart** of Reel Rental. It contains the rental rules
//! as pure functions and value types with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Reel Rental Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Storefront controllers (not in workspace)          │   │
//! │  │   Catalog ──► Cart ──► Checkout ──► Orders back-office          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ reel-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │  types   │ │ pricing  │ │   cart   │ │      rental      │  │   │
//! │  │   │  Order   │ │ line tot │ │ CartItem │ │  state machine   │  │   │
//! │  │   │  Copy    │ │ late fee │ │  Cart    │ │  Pending→...     │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    reel-db (Database Layer)                     │   │
//! │  │       SQLite queries, migrations, transactional transitions     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (MediaCopy, Order, OrderLine, statuses, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Line totals and late fees
//! - [`cart`] - Priced cart lines and cart totals
//! - [`rental`] - The order lifecycle state machine and order display views
//! - [`catalog`] - Title availability summaries, home page rows, search suggestions
//! - [`policy`] - Configurable rental policy
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use reel_core::money::Money;
//! use reel_core::pricing;
//!
//! // DVD at $2.00/day, 3 days, 2 copies
//! let total = pricing::line_total(Money::from_cents(200), 3, 2);
//! assert_eq!(total.cents(), 1200);
//!
//! // Five days late at the default $5.00/day
//! let fee = pricing::late_fee(5, Money::from_cents(reel_core::LATE_FEE_PER_DAY_CENTS));
//! assert_eq!(fee.cents(), 2500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod catalog;
pub mod error;
pub mod money;
pub mod policy;
pub mod pricing;
pub mod rental;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartItem, CartTotals};
pub use catalog::{
    CatalogFilter, CopyInfo, HomePage, NewArrival, PopularTitle, StoreStats, TitleDetails,
    TitleSuggestion, TitleSummary,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use policy::{LateFeeMode, RentalPolicy};
pub use rental::{LifecycleAction, OrderLineView, OrderView, RentalOrder, TransitionOutcome};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Flat late fee charged per day overdue, in cents ($5.00).
pub const LATE_FEE_PER_DAY_CENTS: i64 = 500;

/// Days between adding a copy to the cart and its desired pickup date.
pub const DEFAULT_PICKUP_LEAD_DAYS: i64 = 1;

/// Longest rental period a cart line or confirmation may ask for.
///
/// ## Business Reason
/// Catches typos like 300 instead of 3 before a copy disappears for a year.
pub const MAX_RENTAL_DAYS: i64 = 90;

/// Maximum distinct lines in one session's cart.
pub const MAX_CART_LINES: usize = 50;

/// Maximum quantity on a single cart line.
pub const MAX_ITEM_QUANTITY: i64 = 99;

/// Notes stamped on orders created through the storefront checkout.
pub const ONLINE_ORDER_NOTE: &str = "Online order";

/// Titles shown in the home page's "popular" row.
pub const POPULAR_TITLES_LIMIT: i64 = 6;

/// Copies shown in the home page's "new arrivals" row.
pub const NEW_ARRIVALS_LIMIT: i64 = 8;

/// Suggestions returned while typing in the search box.
pub const AUTOCOMPLETE_LIMIT: i64 = 10;

/// Cover shown for titles without their own image.
pub const DEFAULT_COVER_IMAGE_URL: &str = "/images/default-movie.jpg";
