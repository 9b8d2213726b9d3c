//! # Inventory Ledger
//!
//! `media_copies.is_available` and the two primitives allowed to flip it.
//!
//! ## Compare-and-Swap Claim
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Checkout A (tx)                       Checkout B (tx)                  │
//! │                                                                         │
//! │  UPDATE media_copies                                                    │
//! │     SET is_available = 0,                                               │
//! │         version = version + 1                                           │
//! │   WHERE id = 'X' AND is_available = 1                                   │
//! │  → 1 row   ✓ claimed                                                    │
//! │  COMMIT                                                                 │
//! │                                        UPDATE ... WHERE id = 'X'        │
//! │                                          AND is_available = 1           │
//! │                                        → 0 rows ✗ Unavailable           │
//! │                                        ROLLBACK (order, lines, cart     │
//! │                                        deletion all undone)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `claim` and `release` take the caller's connection so they run inside the
//! lifecycle transaction. Nothing else writes `is_available`.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::DbResult;
use reel_core::{CoreError, MediaCopy};

/// A copy whose availability flag disagrees with the order lines holding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AvailabilityDiscrepancy {
    pub copy_id: String,
    pub is_available: bool,
    /// Active or rented lines on open orders referencing the copy.
    pub holding_lines: i64,
}

/// Marks a copy as taken. Fails unless it was available.
pub async fn claim(conn: &mut SqliteConnection, copy_id: &str) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE media_copies SET is_available = 0, version = version + 1 \
         WHERE id = ?1 AND is_available = 1",
    )
    .bind(copy_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        debug!(copy_id = %copy_id, "Copy claimed");
        return Ok(());
    }

    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM media_copies WHERE id = ?1")
        .bind(copy_id)
        .fetch_optional(&mut *conn)
        .await?;

    match exists {
        Some(_) => Err(CoreError::Unavailable {
            copy_id: copy_id.to_string(),
        }
        .into()),
        None => Err(CoreError::CopyNotFound(copy_id.to_string()).into()),
    }
}

/// Puts a copy back on the shelf.
pub async fn release(conn: &mut SqliteConnection, copy_id: &str) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE media_copies SET is_available = 1, version = version + 1 WHERE id = ?1",
    )
    .bind(copy_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::CopyNotFound(copy_id.to_string()).into());
    }

    debug!(copy_id = %copy_id, "Copy released");
    Ok(())
}

pub(crate) const COPY_COLUMNS: &str = "id, title_id, format_id, barcode, is_available, condition, \
                                       version, purchase_date, purchase_price_cents";

/// Loads one copy.
pub(crate) async fn fetch_copy(
    conn: &mut SqliteConnection,
    copy_id: &str,
) -> DbResult<Option<MediaCopy>> {
    let sql = format!("SELECT {COPY_COLUMNS} FROM media_copies WHERE id = ?1");
    let copy = sqlx::query_as::<_, MediaCopy>(&sql)
        .bind(copy_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(copy)
}

/// Read side of the ledger.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Whether a copy can be rented right now.
    pub async fn is_available(&self, copy_id: &str) -> DbResult<bool> {
        let flag: Option<bool> =
            sqlx::query_scalar("SELECT is_available FROM media_copies WHERE id = ?1")
                .bind(copy_id)
                .fetch_optional(&self.pool)
                .await?;

        flag.ok_or_else(|| CoreError::CopyNotFound(copy_id.to_string()).into())
    }

    /// Available copies of a title, by barcode.
    pub async fn available_copies(&self, title_id: &str) -> DbResult<Vec<MediaCopy>> {
        let sql = format!(
            "SELECT {COPY_COLUMNS} FROM media_copies \
             WHERE title_id = ?1 AND is_available = 1 \
             ORDER BY barcode, id"
        );
        let copies = sqlx::query_as::<_, MediaCopy>(&sql)
            .bind(title_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(copies)
    }

    /// Copies violating the availability invariant.
    ///
    /// A copy must be unavailable exactly when one active or rented line on
    /// an open order holds it. An empty result means the ledger is clean.
    pub async fn audit(&self) -> DbResult<Vec<AvailabilityDiscrepancy>> {
        let discrepancies = sqlx::query_as::<_, AvailabilityDiscrepancy>(
            r#"
            SELECT copy_id, is_available, holding_lines
            FROM (
                SELECT
                    c.id AS copy_id,
                    c.is_available AS is_available,
                    (
                        SELECT COUNT(*)
                        FROM order_lines ol
                        JOIN orders o ON o.id = ol.order_id
                        WHERE ol.copy_id = c.id
                          AND ol.status IN ('active', 'rented')
                          AND o.status IN ('pending', 'confirmed', 'rented')
                    ) AS holding_lines
                FROM media_copies c
            )
            WHERE (is_available = 1 AND holding_lines > 0)
               OR (is_available = 0 AND holding_lines <> 1)
            ORDER BY copy_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        if !discrepancies.is_empty() {
            warn!(count = discrepancies.len(), "Availability audit found discrepancies");
        }

        Ok(discrepancies)
    }
}
