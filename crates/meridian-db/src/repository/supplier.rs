//! # Supplier Repository
//!
//! Database operations for suppliers. Products reference suppliers by id,
//! so a supplier with products cannot be deleted.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use meridian_core::validation::{validate_code, validate_email, validate_name};
use meridian_core::{NewSupplier, Supplier};

/// Repository for supplier database operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    /// Creates a new SupplierRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    /// Creates a supplier.
    pub async fn create(&self, draft: NewSupplier) -> DbResult<Supplier> {
        validate_code("supplier code", &draft.code)?;
        validate_name(&draft.name)?;
        if let Some(email) = &draft.email {
            validate_email(email)?;
        }

        debug!(code = %draft.code, "Inserting supplier");

        let result = sqlx::query(
            r#"
            INSERT INTO suppliers (code, name, contact_name, email, phone, address)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&draft.code)
        .bind(&draft.name)
        .bind(&draft.contact_name)
        .bind(&draft.email)
        .bind(&draft.phone)
        .bind(&draft.address)
        .execute(&self.pool)
        .await?;

        Ok(Supplier {
            id: result.last_insert_rowid(),
            code: draft.code,
            name: draft.name,
            contact_name: draft.contact_name,
            email: draft.email,
            phone: draft.phone,
            address: draft.address,
        })
    }

    /// Gets a supplier by its id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, code, name, contact_name, email, phone, address
            FROM suppliers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(supplier)
    }

    /// Gets a supplier by its business code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, code, name, contact_name, email, phone, address
            FROM suppliers
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(supplier)
    }

    /// Lists all suppliers, sorted by name.
    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, code, name, contact_name, email, phone, address
            FROM suppliers
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(suppliers)
    }

    /// Updates a supplier's fields by id.
    pub async fn update(&self, supplier: &Supplier) -> DbResult<()> {
        validate_code("supplier code", &supplier.code)?;
        validate_name(&supplier.name)?;
        if let Some(email) = &supplier.email {
            validate_email(email)?;
        }

        debug!(id = %supplier.id, "Updating supplier");

        let result = sqlx::query(
            r#"
            UPDATE suppliers SET
                code = ?2,
                name = ?3,
                contact_name = ?4,
                email = ?5,
                phone = ?6,
                address = ?7
            WHERE id = ?1
            "#,
        )
        .bind(supplier.id)
        .bind(&supplier.code)
        .bind(&supplier.name)
        .bind(&supplier.contact_name)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", supplier.id.to_string()));
        }

        Ok(())
    }

    /// Deletes a supplier.
    ///
    /// Fails with `ForeignKeyViolation` when products still reference it.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id = %id, "Deleting supplier");

        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id.to_string()));
        }

        Ok(())
    }

    /// Counts suppliers (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suppliers")
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

    fn draft(code: &str, name: &str) -> NewSupplier {
        NewSupplier {
            code: code.to_string(),
            name: name.to_string(),
            contact_name: Some("Sam Vendor".to_string()),
            email: None,
            phone: None,
            address: None,
        }
    }

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let db = test_db().await;

        let mut supplier = db.suppliers().create(draft("SUP-1", "Parts Inc")).await.unwrap();
        assert!(supplier.id > 0);

        supplier.contact_name = Some("Pat Vendor".to_string());
        db.suppliers().update(&supplier).await.unwrap();

        let reloaded = db.suppliers().get_by_code("SUP-1").await.unwrap().unwrap();
        assert_eq!(reloaded.contact_name.as_deref(), Some("Pat Vendor"));

        db.suppliers().delete(supplier.id).await.unwrap();
        assert!(db.suppliers().get_by_id(supplier.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = test_db().await;
        db.suppliers().create(draft("SUP-1", "First")).await.unwrap();

        let err = db.suppliers().create(draft("SUP-1", "Second")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let db = test_db().await;
        db.suppliers().create(draft("SUP-B", "Beta Supply")).await.unwrap();
        db.suppliers().create(draft("SUP-A", "Alpha Supply")).await.unwrap();

        let all = db.suppliers().list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Alpha Supply");
        assert_eq!(db.suppliers().count().await.unwrap(), 2);
    }
}
