//! # Customer Repository
//!
//! Customers are keyed by normalized email. Checkout resolves the email to
//! the oldest matching customer, registering a new one when none exists.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::begin_write;
use reel_core::{CoreError, Customer, CustomerDetails};

const CUSTOMER_COLUMNS: &str = "id, first_name, last_name, email, phone, address, \
                                registration_date, is_blocked, barcode_id, loyalty_points";

async fn fetch_by_email(conn: &mut SqliteConnection, email: &str) -> DbResult<Option<Customer>> {
    let sql = format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE email = ?1 \
         ORDER BY registration_date, id LIMIT 1"
    );
    let customer = sqlx::query_as::<_, Customer>(&sql)
        .bind(email.trim().to_lowercase())
        .fetch_optional(&mut *conn)
        .await?;

    Ok(customer)
}

async fn insert_customer(conn: &mut SqliteConnection, customer: &Customer) -> DbResult<()> {
    debug!(id = %customer.id, email = %customer.email, "Inserting customer");

    sqlx::query(
        r#"
        INSERT INTO customers (
            id, first_name, last_name, email, phone, address,
            registration_date, is_blocked, barcode_id, loyalty_points
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&customer.id)
    .bind(&customer.first_name)
    .bind(&customer.last_name)
    .bind(&customer.email)
    .bind(&customer.phone)
    .bind(&customer.address)
    .bind(customer.registration_date)
    .bind(customer.is_blocked)
    .bind(&customer.barcode_id)
    .bind(customer.loyalty_points)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Finds the customer behind the checkout details, or registers one.
///
/// Blocked customers are refused with `CustomerBlocked`.
pub(crate) async fn resolve_or_create(
    conn: &mut SqliteConnection,
    details: &CustomerDetails,
    now: DateTime<Utc>,
) -> DbResult<Customer> {
    details.validate()?;

    let customer = match fetch_by_email(conn, &details.normalized_email()).await? {
        Some(existing) => existing,
        None => {
            let created = Customer::register(details, now);
            insert_customer(conn, &created).await?;
            info!(id = %created.id, "Registered customer at checkout");
            created
        }
    };

    if customer.is_blocked {
        return Err(CoreError::CustomerBlocked {
            email: customer.email,
        }
        .into());
    }

    Ok(customer)
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Oldest customer registered under the email (case-insensitive).
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_email(&mut conn, email).await
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_customer(&mut conn, customer).await
    }

    /// Resolve-or-create outside of a checkout.
    pub async fn resolve(&self, details: &CustomerDetails) -> DbResult<Customer> {
        let mut tx = begin_write(&self.pool).await?;
        let customer = resolve_or_create(&mut tx, details, Utc::now()).await?;
        tx.commit().await?;
        Ok(customer)
    }

    /// Blocks or unblocks a customer.
    pub async fn set_blocked(&self, id: &str, blocked: bool) -> DbResult<()> {
        debug!(id = %id, blocked, "Updating customer block flag");

        let result = sqlx::query("UPDATE customers SET is_blocked = ?1 WHERE id = ?2")
            .bind(blocked)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(crate::error::DbError::not_found("Customer", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Duration;

    fn details(email: &str) -> CustomerDetails {
        CustomerDetails {
            first_name: "Anna".to_string(),
            last_name: "Karenina".to_string(),
            phone: None,
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_resolve_registers_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let first = db.customers().resolve(&details("Anna@Example.com")).await.unwrap();
        let second = db.customers().resolve(&details(" anna@example.com ")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.email, "anna@example.com");
        assert_eq!(first.address, Customer::UNKNOWN_ADDRESS);
        assert_eq!(first.barcode_id.len(), 8);
        assert_eq!(first.loyalty_points, 0);
    }

    #[tokio::test]
    async fn test_find_by_email_takes_oldest() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();

        let newer = Customer::register(&details("dup@example.com"), now);
        let older = Customer::register(&details("dup@example.com"), now - Duration::days(30));
        db.customers().insert(&newer).await.unwrap();
        db.customers().insert(&older).await.unwrap();

        let found = db.customers().find_by_email("DUP@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, older.id);
        assert!(db.customers().find_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blocked_customer_refused() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = db.customers().resolve(&details("bad@example.com")).await.unwrap();
        db.customers().set_blocked(&customer.id, true).await.unwrap();

        let err = db.customers().resolve(&details("bad@example.com")).await.unwrap_err();
        assert!(matches!(err.domain(), Some(CoreError::CustomerBlocked { .. })));

        let reloaded = db.customers().get_by_id(&customer.id).await.unwrap().unwrap();
        assert!(reloaded.is_blocked);
        assert!(db.customers().set_blocked("missing", true).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_details_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.customers().resolve(&details("not-an-email")).await.unwrap_err();
        assert!(matches!(err.domain(), Some(CoreError::Validation(_))));
    }
}
