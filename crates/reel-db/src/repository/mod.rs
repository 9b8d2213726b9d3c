//! # Repository Module
//!
//! Database repository implementations for Reel Rental.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and Their Tables                        │
//! │                                                                         │
//! │  db.catalog()    ──► media_formats, titles, media_copies (insert/read) │
//! │  db.inventory()  ──► media_copies.is_available (claim/release/audit)   │
//! │  db.customers()  ──► customers                                         │
//! │  db.cart()       ──► cart_lines                                        │
//! │  db.orders()     ──► orders, order_lines                               │
//! │                      + cart, customer, inventory helpers inside        │
//! │                        the same transaction                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Helpers that must run inside a caller's transaction take
//! `&mut SqliteConnection`; public repository methods own their pool
//! connection or transaction.
//!
//! ## Write Transactions
//! ```text
//! BEGIN (deferred)                     BEGIN IMMEDIATE
//! ────────────────                     ───────────────
//! A reads cart     B reads cart        A takes write lock
//! A writes, commits                    B waits (busy_timeout)
//! B upgrades → SQLITE_BUSY             A commits
//!                                      B reads fresh rows → claim fails
//!                                        → Unavailable
//! ```
//! Every read-then-write operation opens with [`begin_write`].

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::DbResult;

pub mod cart;
pub mod catalog;
pub mod customer;
pub mod inventory;
pub mod order;

/// Opens a transaction that holds the database write lock from its first
/// statement, so concurrent writers queue instead of failing mid-transaction.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    let tx = pool.begin_with("BEGIN IMMEDIATE").await?;
    Ok(tx)
}

#[cfg(test)]
pub(crate) mod test_support;
