//! # Order Lifecycle
//!
//! The rental state machine, as pure transitions over an order and its lines.
//! `reel-db` loads a [`RentalOrder`], applies one transition, and writes the
//! result back (plus the copy releases it reports) in a single transaction.
//!
//! ## State Machine
//! ```text
//!              confirm            mark rented           return
//!   Pending ─────────────► Confirmed ─────────────► Rented ─────────────► Returned
//!      │                       │                      │
//!      │ cancel                │ cancel               │ cancel
//!      ▼                       ▼                      ▼
//!   ┌──────────────────────────────────────────────────────┐
//!   │                      Cancelled                       │
//!   └──────────────────────────────────────────────────────┘
//!
//!   Returned and Cancelled are terminal: every action fails with
//!   InvalidTransition and the order is left untouched.
//! ```
//!
//! ## Lines and Copies
//! ```text
//! Order status   Line status   Copy is_available
//! ────────────   ───────────   ─────────────────
//! Pending        Active        false (claimed at checkout)
//! Confirmed      Active        false
//! Rented         Rented        false
//! Returned       Returned      true  (released)
//! Cancelled      Cancelled     true  (released)
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::cart::CartItem;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::policy::{LateFeeMode, RentalPolicy};
use crate::pricing;
use crate::types::{LineStatus, Order, OrderLine, OrderStatus};
use crate::validation::validate_rental_days;
use crate::ONLINE_ORDER_NOTE;

// =============================================================================
// Actions
// =============================================================================

/// Something staff (or the storefront) can do to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Confirm,
    MarkRented,
    Return,
    Cancel,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleAction::Confirm => "confirm",
            LifecycleAction::MarkRented => "mark rented",
            LifecycleAction::Return => "return",
            LifecycleAction::Cancel => "cancel",
        };
        f.write_str(s)
    }
}

impl OrderStatus {
    /// Status reached by applying `action`, or `None` when the machine has
    /// no such edge.
    pub const fn after(self, action: LifecycleAction) -> Option<OrderStatus> {
        use LifecycleAction as A;
        use OrderStatus as S;

        match (self, action) {
            (S::Pending, A::Confirm) => Some(S::Confirmed),
            (S::Confirmed, A::MarkRented) => Some(S::Rented),
            (S::Rented, A::Return) => Some(S::Returned),
            (S::Pending | S::Confirmed | S::Rented, A::Cancel) => Some(S::Cancelled),
            _ => None,
        }
    }
}

/// What a successful transition did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransitionOutcome {
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// Copies that must flip back to available.
    pub released_copies: Vec<String>,
}

// =============================================================================
// Rental Order Aggregate
// =============================================================================

/// An order together with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RentalOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

impl RentalOrder {
    /// Builds a Pending order from a session's cart items.
    ///
    /// Prices are snapshotted from the items; claiming the copies and
    /// clearing the cart are the caller's job.
    pub fn checkout(
        customer_id: &str,
        session_id: &str,
        items: &[CartItem],
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        if items.is_empty() {
            return Err(CoreError::EmptyCart {
                session_id: session_id.to_string(),
            });
        }

        let order_id = Uuid::new_v4().to_string();

        let lines: Vec<OrderLine> = items
            .iter()
            .map(|item| OrderLine {
                id: Uuid::new_v4().to_string(),
                order_id: order_id.clone(),
                copy_id: item.copy_id.clone(),
                rental_days: item.rental_days,
                quantity: item.quantity,
                daily_price_cents: item.daily_price_cents,
                subtotal_cents: item.line_total().cents(),
                late_fee_cents: 0,
                status: LineStatus::Active,
            })
            .collect();

        let total: Money = lines.iter().map(OrderLine::subtotal).sum();

        let order = Order {
            id: order_id,
            customer_id: customer_id.to_string(),
            status: OrderStatus::Pending,
            order_date: now,
            total_cents: total.cents(),
            pickup_date: None,
            return_due_date: None,
            actual_return_date: None,
            notes: Some(ONLINE_ORDER_NOTE.to_string()),
        };

        Ok(RentalOrder { order, lines })
    }

    pub fn id(&self) -> &str {
        &self.order.id
    }

    pub fn status(&self) -> OrderStatus {
        self.order.status
    }

    /// Copy ids referenced by the order.
    pub fn copy_ids(&self) -> Vec<String> {
        self.lines.iter().map(|l| l.copy_id.clone()).collect()
    }

    /// Sum of line late fees.
    pub fn total_late_fee(&self) -> Money {
        self.lines.iter().map(OrderLine::late_fee).sum()
    }

    /// Checkout total plus late fees.
    pub fn amount_due(&self) -> Money {
        self.order.total() + self.total_late_fee()
    }

    /// Resolves the target status or fails without touching anything.
    fn target(&self, action: LifecycleAction) -> CoreResult<OrderStatus> {
        self.order
            .status
            .after(action)
            .ok_or_else(|| CoreError::InvalidTransition {
                order_id: self.order.id.clone(),
                from: self.order.status,
                action,
            })
    }

    /// Copy ids of lines still holding their copy.
    fn held_copies(&self) -> Vec<String> {
        self.lines
            .iter()
            .filter(|l| l.status.holds_copy())
            .map(|l| l.copy_id.clone())
            .collect()
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Pending → Confirmed. Starts the rental clock at `now`.
    ///
    /// `rental_days = None` uses the longest line period.
    pub fn confirm(
        &mut self,
        rental_days: Option<i64>,
        now: DateTime<Utc>,
        policy: &RentalPolicy,
    ) -> CoreResult<TransitionOutcome> {
        let to = self.target(LifecycleAction::Confirm)?;

        let days = rental_days
            .or_else(|| self.lines.iter().map(|l| l.rental_days).max())
            .unwrap_or(0);
        validate_rental_days(days, policy.max_rental_days)?;

        let from = self.order.status;
        self.order.status = to;
        self.order.pickup_date = Some(now);
        self.order.return_due_date = Some(now + Duration::days(days));

        Ok(TransitionOutcome {
            from,
            to,
            released_copies: Vec::new(),
        })
    }

    /// Confirmed → Rented. Every line goes out.
    pub fn mark_rented(&mut self) -> CoreResult<TransitionOutcome> {
        let to = self.target(LifecycleAction::MarkRented)?;

        let from = self.order.status;
        self.order.status = to;
        for line in &mut self.lines {
            line.status = LineStatus::Rented;
        }

        Ok(TransitionOutcome {
            from,
            to,
            released_copies: Vec::new(),
        })
    }

    /// Rented → Returned. Charges late fees and releases every copy.
    pub fn mark_returned(
        &mut self,
        now: DateTime<Utc>,
        policy: &RentalPolicy,
    ) -> CoreResult<TransitionOutcome> {
        let to = self.target(LifecycleAction::Return)?;

        let released = self.held_copies();
        let from = self.order.status;

        let order_days_late = self
            .order
            .return_due_date
            .map(|due| pricing::days_late(due, now))
            .unwrap_or(0);
        let pickup = self.order.pickup_date;

        for line in &mut self.lines {
            let days_late = match policy.late_fee_mode {
                LateFeeMode::Uniform => order_days_late,
                LateFeeMode::PerLine => pickup
                    .map(|p| pricing::days_late(p + Duration::days(line.rental_days), now))
                    .unwrap_or(0),
            };
            line.late_fee_cents = pricing::late_fee(days_late, policy.late_fee_per_day).cents();
            line.status = LineStatus::Returned;
        }

        self.order.status = to;
        self.order.actual_return_date = Some(now);

        Ok(TransitionOutcome {
            from,
            to,
            released_copies: released,
        })
    }

    /// Pending | Confirmed | Rented → Cancelled. Releases every copy.
    pub fn cancel(&mut self) -> CoreResult<TransitionOutcome> {
        let to = self.target(LifecycleAction::Cancel)?;

        let released = self.held_copies();
        let from = self.order.status;

        self.order.status = to;
        for line in &mut self.lines {
            line.status = LineStatus::Cancelled;
        }

        Ok(TransitionOutcome {
            from,
            to,
            released_copies: released,
        })
    }
}

// =============================================================================
// Display Views
// =============================================================================

/// An order line with the title and format it rents, for order pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderLineView {
    pub line_id: String,
    pub copy_id: String,
    pub title_name: String,
    pub format_name: String,
    pub rental_days: i64,
    pub quantity: i64,
    pub daily_price_cents: i64,
    pub subtotal_cents: i64,
    pub late_fee_cents: i64,
    pub status: LineStatus,
}

/// An order as the customer and staff pages show it.
///
/// Overdue figures are computed at the `now` the view was built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderView {
    pub order: Order,
    pub customer_name: String,
    pub lines: Vec<OrderLineView>,
    pub is_overdue: bool,
    pub days_overdue: i64,
    /// Late fees charged so far, summed over lines.
    pub late_fee_cents: i64,
}

impl OrderView {
    pub fn new(
        order: Order,
        customer_name: impl Into<String>,
        lines: Vec<OrderLineView>,
        now: DateTime<Utc>,
    ) -> Self {
        let late_fee_cents = lines.iter().map(|l| l.late_fee_cents).sum();
        OrderView {
            is_overdue: order.is_overdue(now),
            days_overdue: order.days_overdue(now),
            order,
            customer_name: customer_name.into(),
            lines,
            late_fee_cents,
        }
    }

    pub fn late_fee(&self) -> Money {
        Money::from_cents(self.late_fee_cents)
    }

    /// Checkout total plus late fees.
    pub fn amount_due(&self) -> Money {
        self.order.total() + self.late_fee()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(copy_id: &str, price_cents: i64, days: i64, qty: i64, now: DateTime<Utc>) -> CartItem {
        CartItem {
            id: format!("line-{copy_id}"),
            session_id: "session-1".to_string(),
            copy_id: copy_id.to_string(),
            rental_days: days,
            quantity: qty,
            desired_pickup_date: now + Duration::days(1),
            added_at: now,
            title_id: "title-1".to_string(),
            title_name: "Solaris".to_string(),
            format_name: "DVD".to_string(),
            daily_price_cents: price_cents,
        }
    }

    fn pending(now: DateTime<Utc>) -> RentalOrder {
        RentalOrder::checkout(
            "customer-1",
            "session-1",
            &[item("c1", 200, 3, 2, now), item("c2", 300, 1, 1, now)],
            now,
        )
        .unwrap()
    }

    fn rented(now: DateTime<Utc>, days: i64) -> RentalOrder {
        let mut order = pending(now);
        order
            .confirm(Some(days), now, &RentalPolicy::default())
            .unwrap();
        order.mark_rented().unwrap();
        order
    }

    #[test]
    fn test_checkout_snapshots_prices() {
        let now = Utc::now();
        let order = pending(now);

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.order.total_cents, 1500);
        assert_eq!(order.order.notes.as_deref(), Some(ONLINE_ORDER_NOTE));
        assert_eq!(order.lines.len(), 2);
        assert!(order.lines.iter().all(|l| l.status == LineStatus::Active));
        assert!(order.lines.iter().all(|l| l.late_fee_cents == 0));
        assert!(order.lines.iter().all(|l| l.order_id == order.order.id));
        assert_eq!(order.lines[0].subtotal_cents, 1200);
        assert_eq!(order.lines[0].daily_price_cents, 200);
    }

    #[test]
    fn test_checkout_empty_cart() {
        let err = RentalOrder::checkout("customer-1", "session-9", &[], Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::EmptyCart { session_id } if session_id == "session-9"));
    }

    #[test]
    fn test_confirm_sets_dates() {
        let now = Utc::now();
        let mut order = pending(now);

        let outcome = order.confirm(Some(3), now, &RentalPolicy::default()).unwrap();
        assert_eq!(outcome.from, OrderStatus::Pending);
        assert_eq!(outcome.to, OrderStatus::Confirmed);
        assert!(outcome.released_copies.is_empty());

        assert_eq!(order.order.pickup_date, Some(now));
        assert_eq!(order.order.return_due_date, Some(now + Duration::days(3)));
    }

    #[test]
    fn test_confirm_defaults_to_longest_line() {
        let now = Utc::now();
        let mut order = pending(now);
        order.confirm(None, now, &RentalPolicy::default()).unwrap();
        assert_eq!(order.order.return_due_date, Some(now + Duration::days(3)));
    }

    #[test]
    fn test_confirm_rejects_bad_days() {
        let now = Utc::now();
        let mut order = pending(now);
        let policy = RentalPolicy::default();

        assert!(matches!(
            order.confirm(Some(0), now, &policy),
            Err(CoreError::InvalidDays { .. })
        ));
        assert!(matches!(
            order.confirm(Some(policy.max_rental_days + 1), now, &policy),
            Err(CoreError::InvalidDays { .. })
        ));
        assert_eq!(order.status(), OrderStatus::Pending);
        assert!(order.order.pickup_date.is_none());
    }

    #[test]
    fn test_mark_rented_flips_lines() {
        let now = Utc::now();
        let order = rented(now, 3);
        assert_eq!(order.status(), OrderStatus::Rented);
        assert!(order.lines.iter().all(|l| l.status == LineStatus::Rented));
    }

    #[test]
    fn test_return_on_time_has_no_fee() {
        let now = Utc::now();
        let mut order = rented(now, 3);

        let outcome = order
            .mark_returned(now + Duration::days(3), &RentalPolicy::default())
            .unwrap();

        assert_eq!(outcome.to, OrderStatus::Returned);
        assert_eq!(outcome.released_copies.len(), 2);
        assert!(order.total_late_fee().is_zero());
        assert!(order.lines.iter().all(|l| l.status == LineStatus::Returned));
        assert_eq!(order.order.actual_return_date, Some(now + Duration::days(3)));
    }

    #[test]
    fn test_return_three_days_late() {
        let now = Utc::now();
        let mut order = rented(now, 3);

        order
            .mark_returned(now + Duration::days(6), &RentalPolicy::default())
            .unwrap();

        assert!(order.lines.iter().all(|l| l.late_fee_cents == 1500));
        assert_eq!(order.total_late_fee().cents(), 3000);
        assert_eq!(order.amount_due().cents(), 4500);
    }

    #[test]
    fn test_worked_example() {
        // DVD $2.00/day, 3 days, qty 2, returned 5 days late
        let now = Utc::now();
        let mut order = RentalOrder::checkout(
            "customer-1",
            "session-1",
            &[item("c1", 200, 3, 2, now)],
            now,
        )
        .unwrap();
        assert_eq!(order.order.total_cents, 1200);

        order.confirm(Some(3), now, &RentalPolicy::default()).unwrap();
        assert_eq!(order.order.return_due_date, Some(now + Duration::days(3)));
        order.mark_rented().unwrap();
        order
            .mark_returned(now + Duration::days(8), &RentalPolicy::default())
            .unwrap();

        assert_eq!(order.lines[0].late_fee_cents, 2500);
    }

    #[test]
    fn test_per_line_late_fees() {
        let now = Utc::now();
        let mut order = rented(now, 3);
        let policy = RentalPolicy::default().late_fee_mode(LateFeeMode::PerLine);

        order.mark_returned(now + Duration::days(5), &policy).unwrap();

        // c1 due after 3 days, c2 after 1 day
        assert_eq!(order.lines[0].late_fee_cents, 1000);
        assert_eq!(order.lines[1].late_fee_cents, 2000);
    }

    #[test]
    fn test_overdue_view() {
        let now = Utc::now();
        let order = rented(now, 3);
        assert!(!order.order.is_overdue(now + Duration::days(3)));
        assert!(order.order.is_overdue(now + Duration::days(4)));
        assert_eq!(order.order.days_overdue(now + Duration::days(5)), 2);
    }

    #[test]
    fn test_order_view() {
        let now = Utc::now();
        let mut order = rented(now, 3);
        let line_view = |line: &OrderLine| OrderLineView {
            line_id: line.id.clone(),
            copy_id: line.copy_id.clone(),
            title_name: "Solaris".to_string(),
            format_name: "DVD".to_string(),
            rental_days: line.rental_days,
            quantity: line.quantity,
            daily_price_cents: line.daily_price_cents,
            subtotal_cents: line.subtotal_cents,
            late_fee_cents: line.late_fee_cents,
            status: line.status,
        };

        let lines = order.lines.iter().map(line_view).collect();
        let view = OrderView::new(order.order.clone(), "Ivan Petrov", lines, now + Duration::days(5));
        assert!(view.is_overdue);
        assert_eq!(view.days_overdue, 2);
        assert!(view.late_fee().is_zero());
        assert_eq!(view.amount_due(), order.order.total());

        order
            .mark_returned(now + Duration::days(5), &RentalPolicy::default())
            .unwrap();
        let lines = order.lines.iter().map(line_view).collect();
        let view = OrderView::new(order.order.clone(), "Ivan Petrov", lines, now + Duration::days(5));
        assert!(!view.is_overdue);
        assert_eq!(view.late_fee_cents, 2 * 1000);
        assert_eq!(view.amount_due(), order.amount_due());
    }

    #[test]
    fn test_cancel_from_every_open_state() {
        let now = Utc::now();
        let policy = RentalPolicy::default();

        let mut from_pending = pending(now);
        let mut from_confirmed = pending(now);
        from_confirmed.confirm(Some(2), now, &policy).unwrap();
        let mut from_rented = rented(now, 2);

        for order in [&mut from_pending, &mut from_confirmed, &mut from_rented] {
            let outcome = order.cancel().unwrap();
            assert_eq!(outcome.to, OrderStatus::Cancelled);
            assert_eq!(outcome.released_copies, vec!["c1".to_string(), "c2".to_string()]);
            assert!(order.lines.iter().all(|l| l.status == LineStatus::Cancelled));
            assert!(order.total_late_fee().is_zero());

            let before = order.clone();
            assert!(matches!(
                order.confirm(Some(1), now, &policy),
                Err(CoreError::InvalidTransition { .. })
            ));
            assert!(order.mark_rented().is_err());
            assert!(order.mark_returned(now, &policy).is_err());
            assert!(order.cancel().is_err());
            assert_eq!(*order, before);
        }
    }

    #[test]
    fn test_invalid_transitions_leave_order_untouched() {
        let now = Utc::now();
        let policy = RentalPolicy::default();
        let mut order = pending(now);
        let before = order.clone();

        assert!(order.mark_rented().is_err());
        assert!(order.mark_returned(now, &policy).is_err());
        assert_eq!(order, before);

        let mut returned = rented(now, 1);
        returned.mark_returned(now, &policy).unwrap();
        let err = returned.cancel().unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Order {} is returned, cannot cancel", returned.id())
        );
    }

    #[test]
    fn test_transition_table() {
        use LifecycleAction as A;
        use OrderStatus as S;

        assert_eq!(S::Pending.after(A::Confirm), Some(S::Confirmed));
        assert_eq!(S::Pending.after(A::Return), None);
        assert_eq!(S::Confirmed.after(A::Confirm), None);
        assert_eq!(S::Rented.after(A::Cancel), Some(S::Cancelled));
        for action in [A::Confirm, A::MarkRented, A::Return, A::Cancel] {
            assert_eq!(S::Returned.after(action), None);
            assert_eq!(S::Cancelled.after(action), None);
        }
    }
}
