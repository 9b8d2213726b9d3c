//! # Domain Types
//!
//! Core domain types used throughout Reel Rental.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌───────────────┐    ┌───────────────┐    ┌───────────────┐           │
//! │  │    Title      │◄───│  MediaCopy    │───►│ MediaFormat   │           │
//! │  │  ───────────  │    │  ───────────  │    │  ───────────  │           │
//! │  │  name, genre  │    │  is_available │    │  name (DVD)   │           │
//! │  │  director     │    │  condition    │    │  daily price  │           │
//! │  └───────────────┘    └───────▲───────┘    └───────────────┘           │
//! │                               │                                         │
//! │           ┌───────────────────┼───────────────────┐                    │
//! │           │                   │                   │                    │
//! │  ┌────────┴──────┐    ┌───────┴───────┐    ┌──────┴────────┐           │
//! │  │   CartLine    │    │   OrderLine   │───►│    Order      │           │
//! │  │  session_id   │    │  price snap   │    │  OrderStatus  │           │
//! │  │  rental_days  │    │  LineStatus   │    │  due dates    │           │
//! │  └───────────────┘    └───────────────┘    └──────┬────────┘           │
//! │                                                   │                    │
//! │                                            ┌──────▼────────┐           │
//! │                                            │   Customer    │           │
//! │                                            └───────────────┘           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status Storage
//! Both status enums are stored as lowercase text (`"pending"`, `"rented"`)
//! and parsed with [`std::str::FromStr`] at every boundary. Unknown values
//! are rejected, never carried along as free-form strings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{validate_email, validate_person_name, validate_phone};

// =============================================================================
// Order Status
// =============================================================================

/// The status of a rental order.
///
/// ## State Machine
/// ```text
///   Pending ──confirm──► Confirmed ──mark_rented──► Rented ──return──► Returned
///      │                     │                        │
///      └───────cancel────────┴─────────cancel─────────┴──────────► Cancelled
/// ```
/// `Returned` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Checked out, waiting for staff confirmation.
    Pending,
    /// Confirmed; pickup and due dates are set.
    Confirmed,
    /// Copies handed over to the customer.
    Rented,
    /// Copies back on the shelf.
    Returned,
    /// Order abandoned before return.
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Rented,
        OrderStatus::Returned,
        OrderStatus::Cancelled,
    ];

    /// Storage name of the status.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Rented => "rented",
            OrderStatus::Returned => "returned",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// No transition leaves a terminal status.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Returned | OrderStatus::Cancelled)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    /// Parses a status name, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: OrderStatus::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Line Status
// =============================================================================

/// The status of a single order line.
///
/// Lines mirror their order's status, except that a freshly checked-out
/// line is `Active` through both `Pending` and `Confirmed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    /// Copy reserved by a pending or confirmed order.
    Active,
    /// Copy out with the customer.
    Rented,
    /// Copy returned.
    Returned,
    /// Line cancelled with its order.
    Cancelled,
}

impl LineStatus {
    /// Every line status.
    pub const ALL: [LineStatus; 4] = [
        LineStatus::Active,
        LineStatus::Rented,
        LineStatus::Returned,
        LineStatus::Cancelled,
    ];

    /// Storage name of the status.
    pub const fn as_str(&self) -> &'static str {
        match self {
            LineStatus::Active => "active",
            LineStatus::Rented => "rented",
            LineStatus::Returned => "returned",
            LineStatus::Cancelled => "cancelled",
        }
    }

    /// Whether a line in this status keeps its copy off the shelf.
    pub const fn holds_copy(&self) -> bool {
        matches!(self, LineStatus::Active | LineStatus::Rented)
    }
}

impl fmt::Display for LineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        LineStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "line status".to_string(),
                allowed: LineStatus::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Catalog Entities
// =============================================================================

/// A physical media format with its daily rental price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MediaFormat {
    pub id: String,
    /// "VHS", "DVD", "Blu-Ray", "HD-DVD"
    pub name: String,
    /// Price per rental day in cents.
    pub daily_price_cents: i64,
}

impl MediaFormat {
    /// Returns the daily rental price as Money.
    #[inline]
    pub fn daily_price(&self) -> Money {
        Money::from_cents(self.daily_price_cents)
    }
}

/// A movie in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Title {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub release_year: Option<i64>,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub duration_minutes: Option<i64>,
    /// Review score, display only.
    pub rating: Option<f64>,
    pub cover_image_url: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Title {
    /// A bare catalog entry; fill the optional fields as needed.
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Title {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            release_year: None,
            genre: None,
            director: None,
            duration_minutes: None,
            rating: None,
            cover_image_url: None,
            created_at: now,
        }
    }
}

/// One physical rentable unit of a title in a specific format.
///
/// ## Ownership
/// `is_available` is owned by whichever order currently holds the copy.
/// It only changes through the inventory claim/release primitives, and every
/// flip bumps `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MediaCopy {
    pub id: String,
    pub title_id: String,
    pub format_id: String,
    pub barcode: Option<String>,
    pub is_available: bool,
    pub condition: String,
    pub version: i64,
    /// When the store bought the copy, if recorded.
    #[ts(as = "Option<String>")]
    pub purchase_date: Option<DateTime<Utc>>,
    pub purchase_price_cents: Option<i64>,
}

impl MediaCopy {
    /// A new, available copy with no acquisition record.
    pub fn new(
        title_id: impl Into<String>,
        format_id: impl Into<String>,
        barcode: Option<&str>,
        condition: impl Into<String>,
    ) -> Self {
        MediaCopy {
            id: Uuid::new_v4().to_string(),
            title_id: title_id.into(),
            format_id: format_id.into(),
            barcode: barcode.map(str::to_string),
            is_available: true,
            condition: condition.into(),
            version: 0,
            purchase_date: None,
            purchase_price_cents: None,
        }
    }

    /// Records when and for how much the copy was bought.
    pub fn acquired(mut self, date: DateTime<Utc>, price_cents: Option<i64>) -> Self {
        self.purchase_date = Some(date);
        self.purchase_price_cents = price_cents;
        self
    }

    pub fn purchase_price(&self) -> Option<Money> {
        self.purchase_price_cents.map(Money::from_cents)
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A registered customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: String,
    #[ts(as = "String")]
    pub registration_date: DateTime<Utc>,
    /// Blocked customers cannot check out.
    pub is_blocked: bool,
    /// Short code printed on the membership card.
    pub barcode_id: String,
    pub loyalty_points: i64,
}

impl Customer {
    /// Placeholder address for customers registered at checkout.
    pub const UNKNOWN_ADDRESS: &'static str = "Not specified";

    /// Registers a new customer from checkout details.
    pub fn register(details: &CustomerDetails, now: DateTime<Utc>) -> Self {
        let id = Uuid::new_v4();
        let barcode_id: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();

        Customer {
            id: id.to_string(),
            first_name: details.first_name.trim().to_string(),
            last_name: details.last_name.trim().to_string(),
            email: details.normalized_email(),
            phone: details
                .phone
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            address: Customer::UNKNOWN_ADDRESS.to_string(),
            registration_date: now,
            is_blocked: false,
            barcode_id: barcode_id.to_uppercase(),
            loyalty_points: 0,
        }
    }

    /// "First Last" for display.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Contact details entered on the checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerDetails {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: String,
}

impl CustomerDetails {
    /// Checks every field before the customer lookup runs.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_person_name("first name", &self.first_name)?;
        validate_person_name("last name", &self.last_name)?;
        validate_email(&self.email)?;
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }
        Ok(())
    }

    /// Email as stored and looked up: trimmed and lowercased.
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// One pending selection in a session's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartLine {
    pub id: String,
    /// Opaque per-browser session token.
    pub session_id: String,
    pub copy_id: String,
    pub rental_days: i64,
    pub quantity: i64,
    #[ts(as = "String")]
    pub desired_pickup_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Creates a fresh line with quantity 1.
    pub fn new(
        session_id: &str,
        copy_id: &str,
        rental_days: i64,
        pickup_lead_days: i64,
        now: DateTime<Utc>,
    ) -> Self {
        CartLine {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            copy_id: copy_id.to_string(),
            rental_days,
            quantity: 1,
            desired_pickup_date: now + Duration::days(pickup_lead_days),
            added_at: now,
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A customer's checkout transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub status: OrderStatus,
    #[ts(as = "String")]
    pub order_date: DateTime<Utc>,
    /// Sum of line subtotals at checkout, late fees excluded.
    pub total_cents: i64,
    #[ts(as = "Option<String>")]
    pub pickup_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub return_due_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub actual_return_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl Order {
    /// Returns the checkout total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// An order is overdue while it is out past its due date.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.days_overdue(now) > 0
    }

    /// Whole days (rounded up) the order is past due, 0 unless rented.
    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        match (self.status, self.return_due_date) {
            (OrderStatus::Rented, Some(due)) => crate::pricing::days_late(due, now),
            _ => 0,
        }
    }
}

/// One rented copy within an order.
///
/// ## Snapshot Pattern
/// `daily_price_cents` is frozen at checkout so later price changes on the
/// format never rewrite order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    pub copy_id: String,
    pub rental_days: i64,
    pub quantity: i64,
    /// Daily price in cents at time of checkout (frozen).
    pub daily_price_cents: i64,
    /// daily price × rental days × quantity.
    pub subtotal_cents: i64,
    pub late_fee_cents: i64,
    pub status: LineStatus,
}

impl OrderLine {
    /// Returns the frozen daily price as Money.
    #[inline]
    pub fn daily_price(&self) -> Money {
        Money::from_cents(self.daily_price_cents)
    }

    /// Returns the subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    /// Returns the late fee as Money.
    #[inline]
    pub fn late_fee(&self) -> Money {
        Money::from_cents(self.late_fee_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> CustomerDetails {
        CustomerDetails {
            first_name: " Ivan ".to_string(),
            last_name: "Petrov".to_string(),
            phone: Some("  ".to_string()),
            email: " Ivan@Example.COM ".to_string(),
        }
    }

    #[test]
    fn test_order_status_round_trips_through_str() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert_eq!("Rented".parse::<OrderStatus>().unwrap(), OrderStatus::Rented);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let err = "Reserved".parse::<OrderStatus>().unwrap_err();
        assert!(matches!(err, ValidationError::NotAllowed { .. }));
        assert!("".parse::<LineStatus>().is_err());
    }

    #[test]
    fn test_new_copy_is_available() {
        let bought: DateTime<Utc> = "2024-05-01T12:00:00Z".parse().unwrap();
        let copy = MediaCopy::new("t1", "f1", Some("ALN-001"), "Good").acquired(bought, Some(1999));

        assert!(copy.is_available);
        assert_eq!(copy.version, 0);
        assert_eq!(copy.barcode.as_deref(), Some("ALN-001"));
        assert_eq!(copy.purchase_date, Some(bought));
        assert_eq!(copy.purchase_price(), Some(Money::from_cents(1999)));
        assert!(MediaCopy::new("t1", "f1", None, "Worn").purchase_price().is_none());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Returned.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Rented.is_terminal());
    }

    #[test]
    fn test_line_status_holds_copy() {
        assert!(LineStatus::Active.holds_copy());
        assert!(LineStatus::Rented.holds_copy());
        assert!(!LineStatus::Returned.holds_copy());
        assert!(!LineStatus::Cancelled.holds_copy());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&OrderStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }

    #[test]
    fn test_register_customer_normalizes_details() {
        let now = Utc::now();
        let customer = Customer::register(&details(), now);

        assert_eq!(customer.first_name, "Ivan");
        assert_eq!(customer.email, "ivan@example.com");
        assert_eq!(customer.phone, None);
        assert_eq!(customer.address, Customer::UNKNOWN_ADDRESS);
        assert_eq!(customer.barcode_id.len(), 8);
        assert_eq!(customer.loyalty_points, 0);
        assert!(!customer.is_blocked);
        assert_eq!(customer.full_name(), "Ivan Petrov");
    }

    #[test]
    fn test_cart_line_pickup_date() {
        let now = Utc::now();
        let line = CartLine::new("session-1", "copy-1", 3, 1, now);
        assert_eq!(line.quantity, 1);
        assert_eq!(line.desired_pickup_date - now, Duration::days(1));
    }

    #[test]
    fn test_days_overdue_only_counts_rented_orders() {
        let now = Utc::now();
        let mut order = Order {
            id: "o-1".to_string(),
            customer_id: "c-1".to_string(),
            status: OrderStatus::Rented,
            order_date: now - Duration::days(10),
            total_cents: 600,
            pickup_date: Some(now - Duration::days(5)),
            return_due_date: Some(now - Duration::days(2)),
            actual_return_date: None,
            notes: None,
        };
        assert_eq!(order.days_overdue(now), 2);
        assert!(order.is_overdue(now));

        order.status = OrderStatus::Returned;
        assert_eq!(order.days_overdue(now), 0);
    }
}
