//! # Order Repository
//!
//! Checkout and every lifecycle transition, each in ONE transaction.
//!
//! ## Checkout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   SINGLE TRANSACTION                                    │
//! │                                                                         │
//! │  1. SELECT cart lines of the session (priced)   empty → EmptyCart       │
//! │  2. Resolve customer by email / register        blocked → CustomerBlocked│
//! │  3. INSERT INTO orders (status 'pending', total = Σ line totals)        │
//! │  4. For every line:                                                     │
//! │       claim copy (is_available 1 → 0)           lost race → Unavailable │
//! │       INSERT INTO order_lines (price snapshot)                          │
//! │  5. DELETE the session's cart lines                                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//!      │
//!      ▼
//! COMMIT ← all or nothing; on any error the cart is left untouched
//! ```
//!
//! ## Transitions
//! ```text
//! BEGIN → load order + lines → reel-core transition → UPDATE order, lines
//!       → release copies the transition reports → COMMIT
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::{begin_write, cart, customer, inventory};
use reel_core::validation::validate_session_id;
use reel_core::{
    CoreError, CoreResult, CustomerDetails, Order, OrderLine, OrderLineView, OrderStatus,
    OrderView, RentalOrder, RentalPolicy, TransitionOutcome,
};

const ORDER_COLUMNS: &str = "o.id AS id, o.customer_id AS customer_id, o.status AS status, \
                             o.order_date AS order_date, o.total_cents AS total_cents, \
                             o.pickup_date AS pickup_date, o.return_due_date AS return_due_date, \
                             o.actual_return_date AS actual_return_date, o.notes AS notes";

/// Timestamps are RFC 3339 text with a varying number of fractional digits,
/// so they are compared as julian days; rowid breaks ties in insertion order.
const NEWEST_FIRST: &str = "julianday(o.order_date) DESC, o.rowid DESC";

const LINE_VIEW_SELECT: &str = "SELECT ol.id AS line_id, ol.copy_id AS copy_id, \
                                t.name AS title_name, f.name AS format_name, \
                                ol.rental_days AS rental_days, ol.quantity AS quantity, \
                                ol.daily_price_cents AS daily_price_cents, \
                                ol.subtotal_cents AS subtotal_cents, \
                                ol.late_fee_cents AS late_fee_cents, ol.status AS status \
                                FROM order_lines ol \
                                JOIN media_copies c ON c.id = ol.copy_id \
                                JOIN titles t ON t.id = c.title_id \
                                JOIN media_formats f ON f.id = c.format_id";

#[derive(FromRow)]
struct OrderViewRow {
    #[sqlx(flatten)]
    order: Order,
    customer_name: String,
}

fn view_sql(condition: &str) -> String {
    format!(
        "SELECT {ORDER_COLUMNS}, cu.first_name || ' ' || cu.last_name AS customer_name \
         FROM orders o JOIN customers cu ON cu.id = o.customer_id \
         WHERE {condition} \
         ORDER BY {NEWEST_FIRST}"
    )
}

async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, customer_id, status, order_date, total_cents,
            pickup_date, return_due_date, actual_return_date, notes
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&order.id)
    .bind(&order.customer_id)
    .bind(order.status)
    .bind(order.order_date)
    .bind(order.total_cents)
    .bind(order.pickup_date)
    .bind(order.return_due_date)
    .bind(order.actual_return_date)
    .bind(&order.notes)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_line(conn: &mut SqliteConnection, line: &OrderLine) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_lines (
            id, order_id, copy_id, rental_days, quantity,
            daily_price_cents, subtotal_cents, late_fee_cents, status
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&line.id)
    .bind(&line.order_id)
    .bind(&line.copy_id)
    .bind(line.rental_days)
    .bind(line.quantity)
    .bind(line.daily_price_cents)
    .bind(line.subtotal_cents)
    .bind(line.late_fee_cents)
    .bind(line.status)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn fetch_lines(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderLine>> {
    let lines = sqlx::query_as::<_, OrderLine>(
        "SELECT id, order_id, copy_id, rental_days, quantity, daily_price_cents, \
         subtotal_cents, late_fee_cents, status \
         FROM order_lines WHERE order_id = ?1 ORDER BY rowid",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(lines)
}

async fn load(conn: &mut SqliteConnection, order_id: &str) -> DbResult<RentalOrder> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = ?1");
    let order = sqlx::query_as::<_, Order>(&sql)
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;

    let lines = fetch_lines(conn, order_id).await?;
    Ok(RentalOrder { order, lines })
}

async fn save(conn: &mut SqliteConnection, rental: &RentalOrder) -> DbResult<()> {
    let order = &rental.order;
    sqlx::query(
        "UPDATE orders SET status = ?1, pickup_date = ?2, return_due_date = ?3, \
         actual_return_date = ?4 WHERE id = ?5",
    )
    .bind(order.status)
    .bind(order.pickup_date)
    .bind(order.return_due_date)
    .bind(order.actual_return_date)
    .bind(&order.id)
    .execute(&mut *conn)
    .await?;

    for line in &rental.lines {
        sqlx::query("UPDATE order_lines SET status = ?1, late_fee_cents = ?2 WHERE id = ?3")
            .bind(line.status)
            .bind(line.late_fee_cents)
            .bind(&line.id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Repository for orders and their lifecycle.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
    policy: RentalPolicy,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool, policy: RentalPolicy) -> Self {
        OrderRepository { pool, policy }
    }

    // -------------------------------------------------------------------------
    // Checkout
    // -------------------------------------------------------------------------

    /// Turns the session's cart into a Pending order.
    pub async fn checkout(&self, session_id: &str, details: &CustomerDetails) -> DbResult<RentalOrder> {
        self.checkout_at(session_id, details, Utc::now()).await
    }

    /// [`checkout`](Self::checkout) with an explicit clock.
    pub async fn checkout_at(
        &self,
        session_id: &str,
        details: &CustomerDetails,
        now: DateTime<Utc>,
    ) -> DbResult<RentalOrder> {
        validate_session_id(session_id)?;

        let mut tx = begin_write(&self.pool).await?;

        let items = cart::load_items(&mut tx, session_id).await?;
        if items.is_empty() {
            return Err(CoreError::EmptyCart {
                session_id: session_id.to_string(),
            }
            .into());
        }

        let customer = customer::resolve_or_create(&mut tx, details, now).await?;
        let rental = RentalOrder::checkout(&customer.id, session_id, &items, now)?;

        debug!(order_id = %rental.id(), lines = rental.lines.len(), "Checking out cart");

        insert_order(&mut tx, &rental.order).await?;
        for line in &rental.lines {
            inventory::claim(&mut tx, &line.copy_id).await?;
            insert_line(&mut tx, line).await?;
        }
        cart::clear_session(&mut tx, session_id).await?;

        tx.commit().await?;

        info!(
            order_id = %rental.id(),
            customer_id = %customer.id,
            total = %rental.order.total(),
            "Order created"
        );

        Ok(rental)
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    async fn transition<F>(&self, order_id: &str, apply: F) -> DbResult<RentalOrder>
    where
        F: FnOnce(&mut RentalOrder) -> CoreResult<TransitionOutcome>,
    {
        let mut tx = begin_write(&self.pool).await?;

        let mut rental = load(&mut tx, order_id).await?;
        let outcome = apply(&mut rental)?;

        save(&mut tx, &rental).await?;
        for copy_id in &outcome.released_copies {
            inventory::release(&mut tx, copy_id).await?;
        }

        tx.commit().await?;

        info!(
            order_id = %order_id,
            from = %outcome.from,
            to = %outcome.to,
            released = ?outcome.released_copies,
            "Order transitioned"
        );

        Ok(rental)
    }

    /// Pending → Confirmed. `None` uses the longest line period.
    pub async fn confirm(&self, order_id: &str, rental_days: Option<i64>) -> DbResult<RentalOrder> {
        self.confirm_at(order_id, rental_days, Utc::now()).await
    }

    pub async fn confirm_at(
        &self,
        order_id: &str,
        rental_days: Option<i64>,
        now: DateTime<Utc>,
    ) -> DbResult<RentalOrder> {
        let policy = self.policy;
        self.transition(order_id, |rental| rental.confirm(rental_days, now, &policy))
            .await
    }

    /// Confirmed → Rented.
    pub async fn mark_rented(&self, order_id: &str) -> DbResult<RentalOrder> {
        self.transition(order_id, RentalOrder::mark_rented).await
    }

    /// Rented → Returned, charging late fees.
    pub async fn mark_returned(&self, order_id: &str) -> DbResult<RentalOrder> {
        self.mark_returned_at(order_id, Utc::now()).await
    }

    pub async fn mark_returned_at(&self, order_id: &str, now: DateTime<Utc>) -> DbResult<RentalOrder> {
        let policy = self.policy;
        self.transition(order_id, |rental| rental.mark_returned(now, &policy))
            .await
    }

    /// Pending | Confirmed | Rented → Cancelled.
    pub async fn cancel(&self, order_id: &str) -> DbResult<RentalOrder> {
        self.transition(order_id, RentalOrder::cancel).await
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// One order with its lines.
    pub async fn get(&self, order_id: &str) -> DbResult<RentalOrder> {
        let mut conn = self.pool.acquire().await?;
        load(&mut conn, order_id).await
    }

    async fn with_lines(&self, orders: Vec<Order>) -> DbResult<Vec<RentalOrder>> {
        let mut conn = self.pool.acquire().await?;
        let mut result = Vec::with_capacity(orders.len());
        for order in orders {
            let lines = fetch_lines(&mut conn, &order.id).await?;
            result.push(RentalOrder { order, lines });
        }
        Ok(result)
    }

    /// Orders, newest first, optionally of one status.
    pub async fn list(&self, status: Option<OrderStatus>) -> DbResult<Vec<RentalOrder>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders o \
             WHERE ?1 IS NULL OR o.status = ?1 \
             ORDER BY {NEWEST_FIRST}"
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        self.with_lines(orders).await
    }

    /// Orders of every customer registered under the email, newest first.
    pub async fn list_for_customer(&self, email: &str) -> DbResult<Vec<RentalOrder>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders o \
             JOIN customers c ON c.id = o.customer_id \
             WHERE c.email = ?1 \
             ORDER BY {NEWEST_FIRST}"
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_all(&self.pool)
            .await?;

        self.with_lines(orders).await
    }

    // -------------------------------------------------------------------------
    // Display Views
    // -------------------------------------------------------------------------

    async fn with_line_views(&self, rows: Vec<OrderViewRow>, now: DateTime<Utc>) -> DbResult<Vec<OrderView>> {
        let sql = format!("{LINE_VIEW_SELECT} WHERE ol.order_id = ?1 ORDER BY ol.rowid");
        let mut conn = self.pool.acquire().await?;
        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            let lines = sqlx::query_as::<_, OrderLineView>(&sql)
                .bind(&row.order.id)
                .fetch_all(&mut *conn)
                .await?;
            views.push(OrderView::new(row.order, row.customer_name, lines, now));
        }
        Ok(views)
    }

    /// Order details page: the order with customer name, titles and formats.
    pub async fn view(&self, order_id: &str, now: DateTime<Utc>) -> DbResult<OrderView> {
        let row = sqlx::query_as::<_, OrderViewRow>(&view_sql("o.id = ?1"))
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;

        let mut views = self.with_line_views(vec![row], now).await?;
        views
            .pop()
            .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()).into())
    }

    /// Staff order list, newest first, optionally of one status.
    pub async fn views(&self, status: Option<OrderStatus>, now: DateTime<Utc>) -> DbResult<Vec<OrderView>> {
        let rows = sqlx::query_as::<_, OrderViewRow>(&view_sql("?1 IS NULL OR o.status = ?1"))
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        self.with_line_views(rows, now).await
    }

    /// "My orders" page for an email, newest first.
    pub async fn views_for_customer(&self, email: &str, now: DateTime<Utc>) -> DbResult<Vec<OrderView>> {
        let rows = sqlx::query_as::<_, OrderViewRow>(&view_sql("cu.email = ?1"))
            .bind(email.trim().to_lowercase())
            .fetch_all(&self.pool)
            .await?;

        self.with_line_views(rows, now).await
    }

    /// Rented orders past their due date at `now`, most overdue first.
    pub async fn overdue(&self, now: DateTime<Utc>) -> DbResult<Vec<RentalOrder>> {
        let mut overdue: Vec<RentalOrder> = self
            .list(Some(OrderStatus::Rented))
            .await?
            .into_iter()
            .filter(|rental| rental.order.is_overdue(now))
            .collect();

        overdue.sort_by_key(|rental| std::cmp::Reverse(rental.order.days_overdue(now)));
        Ok(overdue)
    }
}
