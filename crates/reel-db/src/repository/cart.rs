//! # Cart Repository
//!
//! Session carts persisted in `cart_lines`. The session id is an explicit
//! argument everywhere; lines from another session are invisible.
//!
//! ## Add Item
//! ```text
//! add_item(session, copy, days)
//!   │
//!   ├── days outside 1..=max_rental_days ─────────► InvalidDays
//!   ├── copy missing ─────────────────────────────► CopyNotFound
//!   ├── copy not available ───────────────────────► Unavailable
//!   │
//!   ├── line (session, copy) exists ──► quantity + 1 (QuantityTooLarge at max)
//!   └── otherwise ────────────────────► new line, quantity 1,
//!                                       pickup = now + lead days
//!                                       (CartTooLarge at MAX_CART_LINES)
//! ```
//!
//! Adding does not reserve the copy; the claim happens at checkout.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::{begin_write, inventory};
use reel_core::validation::{validate_cart_size, validate_rental_days, validate_session_id};
use reel_core::{Cart, CartItem, CartLine, CoreError, Money, RentalPolicy};

const CART_ITEM_SELECT: &str = r#"
    SELECT
        l.id AS id, l.session_id AS session_id, l.copy_id AS copy_id,
        l.rental_days AS rental_days, l.quantity AS quantity,
        l.desired_pickup_date AS desired_pickup_date, l.added_at AS added_at,
        t.id AS title_id, t.name AS title_name,
        f.name AS format_name, f.daily_price_cents AS daily_price_cents
    FROM cart_lines l
    JOIN media_copies c ON c.id = l.copy_id
    JOIN titles t ON t.id = c.title_id
    JOIN media_formats f ON f.id = c.format_id
"#;

/// Priced lines of a session, oldest first.
pub(crate) async fn load_items(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> DbResult<Vec<CartItem>> {
    let sql = format!("{CART_ITEM_SELECT} WHERE l.session_id = ?1 ORDER BY l.added_at, l.id");
    let items = sqlx::query_as::<_, CartItem>(&sql)
        .bind(session_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(items)
}

/// Deletes every line of a session.
pub(crate) async fn clear_session(conn: &mut SqliteConnection, session_id: &str) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM cart_lines WHERE session_id = ?1")
        .bind(session_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

async fn fetch_line(
    conn: &mut SqliteConnection,
    session_id: &str,
    line_id: &str,
) -> DbResult<CartLine> {
    let line = sqlx::query_as::<_, CartLine>(
        "SELECT id, session_id, copy_id, rental_days, quantity, desired_pickup_date, added_at \
         FROM cart_lines WHERE id = ?1 AND session_id = ?2",
    )
    .bind(line_id)
    .bind(session_id)
    .fetch_optional(&mut *conn)
    .await?;

    line.ok_or_else(|| CoreError::CartLineNotFound(line_id.to_string()).into())
}

/// Repository for session carts.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
    policy: RentalPolicy,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool, policy: RentalPolicy) -> Self {
        CartRepository { pool, policy }
    }

    /// Adds a copy to the session's cart.
    pub async fn add_item(&self, session_id: &str, copy_id: &str, days: i64) -> DbResult<CartLine> {
        self.add_item_at(session_id, copy_id, days, Utc::now()).await
    }

    /// [`add_item`](Self::add_item) with an explicit clock.
    pub async fn add_item_at(
        &self,
        session_id: &str,
        copy_id: &str,
        days: i64,
        now: DateTime<Utc>,
    ) -> DbResult<CartLine> {
        validate_session_id(session_id)?;
        validate_rental_days(days, self.policy.max_rental_days)?;

        let mut tx = begin_write(&self.pool).await?;

        let copy = inventory::fetch_copy(&mut tx, copy_id)
            .await?
            .ok_or_else(|| CoreError::CopyNotFound(copy_id.to_string()))?;
        if !copy.is_available {
            return Err(CoreError::Unavailable {
                copy_id: copy_id.to_string(),
            }
            .into());
        }

        let existing = sqlx::query_as::<_, CartLine>(
            "SELECT id, session_id, copy_id, rental_days, quantity, desired_pickup_date, added_at \
             FROM cart_lines WHERE session_id = ?1 AND copy_id = ?2",
        )
        .bind(session_id)
        .bind(copy_id)
        .fetch_optional(&mut *tx)
        .await?;

        let line = match existing {
            Some(mut line) => {
                line.increment()?;
                debug!(session_id = %session_id, copy_id = %copy_id, quantity = line.quantity, "Cart line incremented");

                sqlx::query("UPDATE cart_lines SET quantity = ?1 WHERE id = ?2")
                    .bind(line.quantity)
                    .bind(&line.id)
                    .execute(&mut *tx)
                    .await?;
                line
            }
            None => {
                let count: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM cart_lines WHERE session_id = ?1")
                        .bind(session_id)
                        .fetch_one(&mut *tx)
                        .await?;
                validate_cart_size(count as usize)?;

                let line = CartLine::new(session_id, copy_id, days, self.policy.pickup_lead_days, now);
                debug!(session_id = %session_id, copy_id = %copy_id, days, "Cart line added");

                sqlx::query(
                    "INSERT INTO cart_lines \
                     (id, session_id, copy_id, rental_days, quantity, desired_pickup_date, added_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )
                .bind(&line.id)
                .bind(&line.session_id)
                .bind(&line.copy_id)
                .bind(line.rental_days)
                .bind(line.quantity)
                .bind(line.desired_pickup_date)
                .bind(line.added_at)
                .execute(&mut *tx)
                .await?;
                line
            }
        };

        tx.commit().await?;
        Ok(line)
    }

    /// Changes the rental period of one line.
    pub async fn update_days(&self, session_id: &str, line_id: &str, days: i64) -> DbResult<CartLine> {
        validate_rental_days(days, self.policy.max_rental_days)?;

        let mut tx = begin_write(&self.pool).await?;
        let mut line = fetch_line(&mut tx, session_id, line_id).await?;
        line.set_rental_days(days, self.policy.max_rental_days)?;

        sqlx::query("UPDATE cart_lines SET rental_days = ?1 WHERE id = ?2")
            .bind(line.rental_days)
            .bind(&line.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!(session_id = %session_id, line_id = %line_id, days, "Cart line days updated");
        Ok(line)
    }

    /// Removes one line.
    pub async fn remove_item(&self, session_id: &str, line_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE id = ?1 AND session_id = ?2")
            .bind(line_id)
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::CartLineNotFound(line_id.to_string()).into());
        }

        debug!(session_id = %session_id, line_id = %line_id, "Cart line removed");
        Ok(())
    }

    /// Empties the cart; returns how many lines went.
    pub async fn clear(&self, session_id: &str) -> DbResult<u64> {
        let mut conn = self.pool.acquire().await?;
        let removed = clear_session(&mut conn, session_id).await?;
        debug!(session_id = %session_id, removed, "Cart cleared");
        Ok(removed)
    }

    pub async fn items(&self, session_id: &str) -> DbResult<Vec<CartItem>> {
        let mut conn = self.pool.acquire().await?;
        load_items(&mut conn, session_id).await
    }

    pub async fn cart(&self, session_id: &str) -> DbResult<Cart> {
        Ok(Cart::new(session_id, self.items(session_id).await?))
    }

    /// Sum of line totals.
    pub async fn total(&self, session_id: &str) -> DbResult<Money> {
        Ok(self.cart(session_id).await?.total())
    }
}
