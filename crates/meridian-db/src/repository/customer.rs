//! # Customer Repository
//!
//! Database operations for customers.
//!
//! Customers are the root of the order graph: orders reference them by id,
//! so deleting a customer with orders fails with a foreign key violation
//! rather than orphaning history.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use meridian_core::validation::{validate_code, validate_email, validate_name};
use meridian_core::{Customer, NewCustomer};

/// Repository for customer database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = CustomerRepository::new(pool);
///
/// let customer = repo.create(draft).await?;
/// let found = repo.get_by_code("CUST-0042").await?;
/// ```
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Creates a customer.
    ///
    /// ## Returns
    /// * `Ok(Customer)` - Inserted customer with its assigned id
    /// * `Err(DbError::UniqueViolation)` - Code already exists
    /// * `Err(DbError::Validation)` - Draft rejected before any SQL ran
    pub async fn create(&self, draft: NewCustomer) -> DbResult<Customer> {
        validate_code("customer code", &draft.code)?;
        validate_name(&draft.name)?;
        if let Some(email) = &draft.email {
            validate_email(email)?;
        }

        debug!(code = %draft.code, "Inserting customer");

        let registered_at = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO customers (code, name, email, phone, address, registered_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&draft.code)
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(&draft.phone)
        .bind(&draft.address)
        .bind(registered_at)
        .execute(&self.pool)
        .await?;

        Ok(Customer {
            id: result.last_insert_rowid(),
            code: draft.code,
            name: draft.name,
            email: draft.email,
            phone: draft.phone,
            address: draft.address,
            registered_at,
        })
    }

    /// Gets a customer by its id.
    ///
    /// ## Returns
    /// * `Ok(Some(Customer))` - Customer found
    /// * `Ok(None)` - Customer not found
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, code, name, email, phone, address, registered_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Gets a customer by its business code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, code, name, email, phone, address, registered_at
            FROM customers
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Lists all customers, sorted by name.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, code, name, email, phone, address, registered_at
            FROM customers
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Updates a customer's fields by id.
    ///
    /// `registered_at` is immutable and not part of the update.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Customer doesn't exist
    pub async fn update(&self, customer: &Customer) -> DbResult<()> {
        validate_code("customer code", &customer.code)?;
        validate_name(&customer.name)?;
        if let Some(email) = &customer.email {
            validate_email(email)?;
        }

        debug!(id = %customer.id, "Updating customer");

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                code = ?2,
                name = ?3,
                email = ?4,
                phone = ?5,
                address = ?6
            WHERE id = ?1
            "#,
        )
        .bind(customer.id)
        .bind(&customer.code)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", customer.id.to_string()));
        }

        Ok(())
    }

    /// Deletes a customer.
    ///
    /// ## Returns
    /// * `Ok(())` - Deleted
    /// * `Err(DbError::NotFound)` - Customer doesn't exist
    /// * `Err(DbError::ForeignKeyViolation)` - Customer still has orders
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id = %id, "Deleting customer");

        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id.to_string()));
        }

        Ok(())
    }

    /// Counts customers (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn draft(code: &str, name: &str) -> NewCustomer {
        NewCustomer {
            code: code.to_string(),
            name: name.to_string(),
            email: Some(format!("{}@example.com", code.to_lowercase())),
            phone: None,
            address: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;

        let created = db.customers().create(draft("CUST-1", "Acme Corp")).await.unwrap();
        assert!(created.id > 0);

        let by_id = db.customers().get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.code, "CUST-1");
        assert_eq!(by_id.name, "Acme Corp");
        assert_eq!(by_id.email.as_deref(), Some("cust-1@example.com"));

        let by_code = db.customers().get_by_code("CUST-1").await.unwrap().unwrap();
        assert_eq!(by_code.id, created.id);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let db = test_db().await;
        assert!(db.customers().get_by_id(999).await.unwrap().is_none());
        assert!(db.customers().get_by_code("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = test_db().await;
        db.customers().create(draft("CUST-1", "First")).await.unwrap();

        let err = db.customers().create(draft("CUST-1", "Second")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_invalid_draft_rejected_before_sql() {
        let db = test_db().await;

        let mut bad = draft("CUST-1", "Acme");
        bad.name = "   ".to_string();
        let err = db.customers().create(bad).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));

        assert_eq!(db.customers().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update() {
        let db = test_db().await;
        let mut customer = db.customers().create(draft("CUST-1", "Acme")).await.unwrap();

        customer.name = "Acme Industries".to_string();
        customer.phone = Some("555-0100".to_string());
        db.customers().update(&customer).await.unwrap();

        let reloaded = db.customers().get_by_id(customer.id).await.unwrap().unwrap();
        assert_eq!(reloaded.name, "Acme Industries");
        assert_eq!(reloaded.phone.as_deref(), Some("555-0100"));
        assert_eq!(reloaded.registered_at, customer.registered_at);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let db = test_db().await;
        let ghost = Customer {
            id: 42,
            code: "CUST-42".to_string(),
            name: "Ghost".to_string(),
            email: None,
            phone: None,
            address: None,
            registered_at: Utc::now(),
        };

        let err = db.customers().update(&ghost).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete() {
        let db = test_db().await;
        let customer = db.customers().create(draft("CUST-1", "Acme")).await.unwrap();

        db.customers().delete(customer.id).await.unwrap();
        assert!(db.customers().get_by_id(customer.id).await.unwrap().is_none());

        let err = db.customers().delete(customer.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let db = test_db().await;
        db.customers().create(draft("CUST-2", "Zenith")).await.unwrap();
        db.customers().create(draft("CUST-1", "Acme")).await.unwrap();

        let all = db.customers().list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Acme");
        assert_eq!(all[1].name, "Zenith");
    }
}
