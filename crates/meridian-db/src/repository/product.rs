//! # Product Repository
//!
//! Database operations for products and their stock levels.
//!
//! ## Stock Bookkeeping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Guarded Stock Updates                                │
//! │                                                                         │
//! │  ❌ WRONG: read-then-write (races can drive stock negative)            │
//! │     let s = SELECT stock_quantity ...;                                 │
//! │     UPDATE products SET stock_quantity = s - 3 ...;                    │
//! │                                                                         │
//! │  ✅ CORRECT: single guarded delta                                      │
//! │     UPDATE products                                                    │
//! │     SET stock_quantity = stock_quantity + ?delta                       │
//! │     WHERE id = ? AND stock_quantity + ?delta >= 0                      │
//! │                                                                         │
//! │  Zero rows affected is then disambiguated with one SELECT:             │
//! │    product missing      → NotFound                                     │
//! │    guard refused        → InsufficientStock { code, available, ... }   │
//! │                                                                         │
//! │  Positive deltas (restores) always pass the guard. The schema-level    │
//! │  CHECK (stock_quantity >= 0) is a backstop, never the primary guard.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All stock changes - here and in the order paths - go through
//! [`apply_stock_delta`] so the guard cannot be bypassed.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use meridian_core::validation::{
    validate_code, validate_name, validate_price_cents, validate_stock_quantity,
};
use meridian_core::{NewProduct, Product};

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let product = repo.create(draft).await?;
/// repo.adjust_stock(product.id, 25).await?;   // restock
/// repo.adjust_stock(product.id, -3).await?;   // guarded take
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with its assigned id
    /// * `Err(DbError::UniqueViolation)` - Code already exists
    /// * `Err(DbError::ForeignKeyViolation)` - Unknown supplier_id
    /// * `Err(DbError::Validation)` - Draft rejected before any SQL ran
    pub async fn create(&self, draft: NewProduct) -> DbResult<Product> {
        validate_code("product code", &draft.code)?;
        validate_name(&draft.name)?;
        validate_price_cents(draft.price_cents)?;
        validate_stock_quantity(draft.stock_quantity)?;

        debug!(code = %draft.code, "Inserting product");

        let result = sqlx::query(
            r#"
            INSERT INTO products (code, name, description, price_cents, stock_quantity, category, supplier_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&draft.code)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.price_cents)
        .bind(draft.stock_quantity)
        .bind(&draft.category)
        .bind(draft.supplier_id)
        .execute(&self.pool)
        .await?;

        Ok(Product {
            id: result.last_insert_rowid(),
            code: draft.code,
            name: draft.name,
            description: draft.description,
            price_cents: draft.price_cents,
            stock_quantity: draft.stock_quantity,
            category: draft.category,
            supplier_id: draft.supplier_id,
        })
    }

    /// Gets a product by its id.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, code, name, description, price_cents, stock_quantity, category, supplier_id
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its business code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, code, name, description, price_cents, stock_quantity, category, supplier_id
            FROM products
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists all products, sorted by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, code, name, description, price_cents, stock_quantity, category, supplier_id
            FROM products
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Lists products in a category, sorted by name.
    pub async fn list_by_category(&self, category: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, code, name, description, price_cents, stock_quantity, category, supplier_id
            FROM products
            WHERE category = ?1
            ORDER BY name
            "#,
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Lists products purchased from a supplier.
    pub async fn list_by_supplier(&self, supplier_id: i64) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, code, name, description, price_cents, stock_quantity, category, supplier_id
            FROM products
            WHERE supplier_id = ?1
            ORDER BY name
            "#,
        )
        .bind(supplier_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Lists products at or below a stock threshold, lowest first.
    ///
    /// The inventory-visibility query behind restock decisions.
    pub async fn low_stock(&self, threshold: i64) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, code, name, description, price_cents, stock_quantity, category, supplier_id
            FROM products
            WHERE stock_quantity <= ?1
            ORDER BY stock_quantity, name
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Updates a product's descriptive fields by id.
    ///
    /// `stock_quantity` is NOT updated here; the entity's field is ignored.
    /// Stock changes only through [`ProductRepository::adjust_stock`] and the
    /// order item paths, so the guard always applies.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        validate_code("product code", &product.code)?;
        validate_name(&product.name)?;
        validate_price_cents(product.price_cents)?;

        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                code = ?2,
                name = ?3,
                description = ?4,
                price_cents = ?5,
                category = ?6,
                supplier_id = ?7
            WHERE id = ?1
            "#,
        )
        .bind(product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(&product.category)
        .bind(product.supplier_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product.id.to_string()));
        }

        Ok(())
    }

    /// Applies a signed stock delta (negative for takes, positive for
    /// restocks) with the non-negativity guard.
    ///
    /// ## Returns
    /// * `Ok(())` - Stock adjusted
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    /// * `Err(DbError::InsufficientStock)` - Take larger than current stock
    pub async fn adjust_stock(&self, id: i64, delta: i64) -> DbResult<()> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let mut conn = self.pool.acquire().await?;
        apply_stock_delta(&mut conn, id, delta).await
    }

    /// Deletes a product.
    ///
    /// Fails with `ForeignKeyViolation` when order items still reference it.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id.to_string()));
        }

        Ok(())
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Applies a signed stock delta on an explicit connection.
///
/// Used directly by [`ProductRepository::adjust_stock`] and by the order
/// item paths, which pass their open transaction so the stock change
/// commits or rolls back with the rest of the work.
///
/// The guard `stock_quantity + delta >= 0` makes a negative result
/// impossible: positive deltas always pass, negative deltas only when the
/// product has enough stock. Zero rows affected is disambiguated with a
/// follow-up SELECT on the same connection.
pub(crate) async fn apply_stock_delta(
    conn: &mut SqliteConnection,
    product_id: i64,
    delta: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity + ?2
        WHERE id = ?1 AND stock_quantity + ?2 >= 0
        "#,
    )
    .bind(product_id)
    .bind(delta)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        // Either the product is missing or the guard refused the take.
        let current = sqlx::query_as::<_, (String, i64)>(
            "SELECT code, stock_quantity FROM products WHERE id = ?1",
        )
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

        return Err(match current {
            None => DbError::not_found("Product", product_id.to_string()),
            Some((code, available)) => DbError::InsufficientStock {
                code,
                available,
                requested: -delta,
            },
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use meridian_core::NewSupplier;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn draft(code: &str, price_cents: i64, stock: i64) -> NewProduct {
        NewProduct {
            code: code.to_string(),
            name: format!("Product {}", code),
            description: None,
            price_cents,
            stock_quantity: stock,
            category: None,
            supplier_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;

        let created = db.products().create(draft("WID-1", 1099, 5)).await.unwrap();
        assert!(created.id > 0);

        let loaded = db.products().get_by_code("WID-1").await.unwrap().unwrap();
        assert_eq!(loaded.price_cents, 1099);
        assert_eq!(loaded.stock_quantity, 5);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = test_db().await;
        db.products().create(draft("WID-1", 100, 1)).await.unwrap();

        let err = db.products().create(draft("WID-1", 200, 2)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_negative_price_rejected() {
        let db = test_db().await;
        let err = db.products().create(draft("WID-1", -1, 0)).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_supplier_rejected() {
        let db = test_db().await;
        let mut bad = draft("WID-1", 100, 1);
        bad.supplier_id = Some(999);

        let err = db.products().create(bad).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_adjust_stock_up_and_down() {
        let db = test_db().await;
        let product = db.products().create(draft("WID-1", 100, 10)).await.unwrap();

        db.products().adjust_stock(product.id, 15).await.unwrap();
        db.products().adjust_stock(product.id, -5).await.unwrap();

        let stock = db.products().get_by_id(product.id).await.unwrap().unwrap().stock_quantity;
        assert_eq!(stock, 20);
    }

    #[tokio::test]
    async fn test_adjust_stock_never_goes_negative() {
        let db = test_db().await;
        let product = db.products().create(draft("WID-1", 100, 3)).await.unwrap();

        let err = db.products().adjust_stock(product.id, -4).await.unwrap_err();
        match err {
            DbError::InsufficientStock {
                code,
                available,
                requested,
            } => {
                assert_eq!(code, "WID-1");
                assert_eq!(available, 3);
                assert_eq!(requested, 4);
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }

        // Refused take leaves stock untouched
        let stock = db.products().get_by_id(product.id).await.unwrap().unwrap().stock_quantity;
        assert_eq!(stock, 3);

        // Exact take succeeds
        db.products().adjust_stock(product.id, -3).await.unwrap();
        let stock = db.products().get_by_id(product.id).await.unwrap().unwrap().stock_quantity;
        assert_eq!(stock, 0);
    }

    #[tokio::test]
    async fn test_adjust_stock_missing_product() {
        let db = test_db().await;
        let err = db.products().adjust_stock(999, -1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_leaves_stock_alone() {
        let db = test_db().await;
        let mut product = db.products().create(draft("WID-1", 100, 7)).await.unwrap();

        product.name = "Renamed".to_string();
        product.price_cents = 250;
        product.stock_quantity = 9999; // must be ignored
        db.products().update(&product).await.unwrap();

        let reloaded = db.products().get_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(reloaded.name, "Renamed");
        assert_eq!(reloaded.price_cents, 250);
        assert_eq!(reloaded.stock_quantity, 7);
    }

    #[tokio::test]
    async fn test_low_stock() {
        let db = test_db().await;
        db.products().create(draft("A", 100, 0)).await.unwrap();
        db.products().create(draft("B", 100, 4)).await.unwrap();
        db.products().create(draft("C", 100, 50)).await.unwrap();

        let low = db.products().low_stock(5).await.unwrap();
        let codes: Vec<_> = low.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_list_by_category_and_supplier() {
        let db = test_db().await;

        let supplier = db
            .suppliers()
            .create(NewSupplier {
                code: "SUP-1".to_string(),
                name: "Parts Inc".to_string(),
                contact_name: None,
                email: None,
                phone: None,
                address: None,
            })
            .await
            .unwrap();

        let mut a = draft("A", 100, 1);
        a.category = Some("widgets".to_string());
        a.supplier_id = Some(supplier.id);
        db.products().create(a).await.unwrap();

        let mut b = draft("B", 100, 1);
        b.category = Some("gadgets".to_string());
        db.products().create(b).await.unwrap();

        let widgets = db.products().list_by_category("widgets").await.unwrap();
        assert_eq!(widgets.len(), 1);
        assert_eq!(widgets[0].code, "A");

        let from_supplier = db.products().list_by_supplier(supplier.id).await.unwrap();
        assert_eq!(from_supplier.len(), 1);
        assert_eq!(from_supplier[0].code, "A");
    }
}
