//! # Order Repository
//!
//! Database operations for orders and their line items.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── create_order(draft) → order row + N item rows + N stock        │
//! │         takes, all in ONE transaction (any failure → nothing persists) │
//! │                                                                         │
//! │  2. AMEND                                                              │
//! │     └── add_item()    → insert + stock take + total recompute          │
//! │     └── update_item() → signed stock delta (new − old) + recompute     │
//! │     └── remove_item() → delete + stock restore + recompute             │
//! │                                                                         │
//! │  3. DELETE                                                             │
//! │     └── delete_order(id, StockRestoration::Restore | Leave)            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Bookkeeping Rules
//! - Product stock moves opposite to item quantity, through the guarded
//!   delta in the product module; a take that would go negative aborts the
//!   whole transaction.
//! - `orders.total_cents` is recomputed from the current items via
//!   [`meridian_core::order_total`] inside every transaction that can
//!   change it. Callers never supply a total.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::product::apply_stock_delta;
use meridian_core::validation::{
    validate_code, validate_order_items, validate_price_cents, validate_quantity,
};
use meridian_core::{
    order_total, NewOrder, NewOrderItem, Order, OrderItem, OrderUpdate, StockRestoration,
};

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Creates an order together with its items.
    ///
    /// One transaction: the order row is inserted with the total already
    /// computed from the drafts, then each item is inserted and its stock
    /// taken. Generated ids are staged locally and only assembled into the
    /// returned `Order` after the commit, so an id from a rolled-back
    /// insert can never leak out.
    ///
    /// ## Returns
    /// * `Ok(Order)` - Persisted order with items and assigned ids
    /// * `Err(DbError::Validation)` - Empty items, bad quantity/price/code
    /// * `Err(DbError::UniqueViolation)` - Order code already exists
    /// * `Err(DbError::ForeignKeyViolation)` - Unknown customer or product
    /// * `Err(DbError::InsufficientStock)` - Any item exceeds its stock
    pub async fn create_order(&self, draft: NewOrder) -> DbResult<Order> {
        validate_code("order code", &draft.code)?;
        validate_order_items(draft.items.len())?;
        for item in &draft.items {
            validate_quantity(item.quantity)?;
            validate_price_cents(item.unit_price_cents)?;
        }

        let total = order_total(draft.items.iter().map(NewOrderItem::subtotal));

        debug!(
            code = %draft.code,
            items = draft.items.len(),
            total_cents = total.cents(),
            "Creating order"
        );

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO orders (code, customer_id, ordered_at, total_cents, status, payment_method)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&draft.code)
        .bind(draft.customer_id)
        .bind(draft.ordered_at)
        .bind(total.cents())
        .bind(draft.status)
        .bind(draft.payment_method)
        .execute(&mut *tx)
        .await?;

        let order_id = result.last_insert_rowid();

        // Stage items; ids are only handed out after the commit below.
        let mut items = Vec::with_capacity(draft.items.len());
        for item in &draft.items {
            let inserted = sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, unit_price_cents)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(order_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .execute(&mut *tx)
            .await?;

            apply_stock_delta(&mut tx, item.product_id, -item.quantity).await?;

            items.push(OrderItem {
                id: inserted.last_insert_rowid(),
                order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
            });
        }

        tx.commit().await?;

        debug!(id = %order_id, code = %draft.code, "Order created");

        Ok(Order {
            id: order_id,
            code: draft.code,
            customer_id: draft.customer_id,
            ordered_at: draft.ordered_at,
            total_cents: total.cents(),
            status: draft.status,
            payment_method: draft.payment_method,
            items,
        })
    }

    /// Gets an order by id, with its items attached.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, code, customer_id, ordered_at, total_cents, status, payment_method
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match order {
            Some(mut order) => {
                order.items = self.get_items(order.id).await?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    /// Gets an order by its business code, with its items attached.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, code, customer_id, ordered_at, total_cents, status, payment_method
            FROM orders
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        match order {
            Some(mut order) => {
                order.items = self.get_items(order.id).await?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    /// Gets the items of an order, in insertion order.
    pub async fn get_items(&self, order_id: i64) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = ?1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists orders, newest first. Items are not attached.
    pub async fn list(&self) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, code, customer_id, ordered_at, total_cents, status, payment_method
            FROM orders
            ORDER BY ordered_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Lists a customer's orders, newest first. Items are not attached.
    pub async fn list_by_customer(&self, customer_id: i64) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, code, customer_id, ordered_at, total_cents, status, payment_method
            FROM orders
            WHERE customer_id = ?1
            ORDER BY ordered_at DESC, id DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Updates an order's scalar fields (customer, date, status, payment
    /// method) and recomputes its total from the current items in the same
    /// transaction, so a drifted total is repaired on every update.
    ///
    /// Items and stock are not touched; use the item operations for that.
    pub async fn update_order(&self, id: i64, update: OrderUpdate) -> DbResult<Order> {
        debug!(id = %id, "Updating order");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                customer_id = ?2,
                ordered_at = ?3,
                status = ?4,
                payment_method = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(update.customer_id)
        .bind(update.ordered_at)
        .bind(update.status)
        .bind(update.payment_method)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id.to_string()));
        }

        let items = recompute_order_total(&mut tx, id).await?;

        let mut order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, code, customer_id, ordered_at, total_cents, status, payment_method
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        order.items = items;
        Ok(order)
    }

    /// Adds an item to an existing order.
    ///
    /// One transaction: item insert, guarded stock take, parent total
    /// recompute. Any failure leaves order, items, and stock unchanged.
    pub async fn add_item(&self, order_id: i64, draft: NewOrderItem) -> DbResult<OrderItem> {
        validate_quantity(draft.quantity)?;
        validate_price_cents(draft.unit_price_cents)?;

        debug!(order_id = %order_id, product_id = %draft.product_id, quantity = %draft.quantity, "Adding order item");

        let mut tx = self.pool.begin().await?;

        let parent: Option<i64> = sqlx::query_scalar("SELECT id FROM orders WHERE id = ?1")
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?;
        if parent.is_none() {
            return Err(DbError::not_found("Order", order_id.to_string()));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, unit_price_cents)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(order_id)
        .bind(draft.product_id)
        .bind(draft.quantity)
        .bind(draft.unit_price_cents)
        .execute(&mut *tx)
        .await?;

        apply_stock_delta(&mut tx, draft.product_id, -draft.quantity).await?;
        recompute_order_total(&mut tx, order_id).await?;

        tx.commit().await?;

        Ok(OrderItem {
            id: inserted.last_insert_rowid(),
            order_id,
            product_id: draft.product_id,
            quantity: draft.quantity,
            unit_price_cents: draft.unit_price_cents,
        })
    }

    /// Changes an item's quantity and unit price.
    ///
    /// The previous quantity is read inside the transaction (callers never
    /// supply it), and stock moves by the signed difference: growing the
    /// item takes more stock, shrinking it gives stock back.
    pub async fn update_item(
        &self,
        item_id: i64,
        quantity: i64,
        unit_price_cents: i64,
    ) -> DbResult<OrderItem> {
        validate_quantity(quantity)?;
        validate_price_cents(unit_price_cents)?;

        debug!(item_id = %item_id, quantity = %quantity, "Updating order item");

        let mut tx = self.pool.begin().await?;

        let existing = fetch_item(&mut tx, item_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order item", item_id.to_string()))?;

        sqlx::query(
            r#"
            UPDATE order_items SET
                quantity = ?2,
                unit_price_cents = ?3
            WHERE id = ?1
            "#,
        )
        .bind(item_id)
        .bind(quantity)
        .bind(unit_price_cents)
        .execute(&mut *tx)
        .await?;

        // old − new: a larger item means a further (guarded) stock take
        apply_stock_delta(&mut tx, existing.product_id, existing.quantity - quantity).await?;
        recompute_order_total(&mut tx, existing.order_id).await?;

        tx.commit().await?;

        Ok(OrderItem {
            id: item_id,
            order_id: existing.order_id,
            product_id: existing.product_id,
            quantity,
            unit_price_cents,
        })
    }

    /// Removes an item from its order, restoring its quantity to stock and
    /// recomputing the parent total, all in one transaction.
    pub async fn remove_item(&self, item_id: i64) -> DbResult<()> {
        debug!(item_id = %item_id, "Removing order item");

        let mut tx = self.pool.begin().await?;

        let existing = fetch_item(&mut tx, item_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order item", item_id.to_string()))?;

        sqlx::query("DELETE FROM order_items WHERE id = ?1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        apply_stock_delta(&mut tx, existing.product_id, existing.quantity).await?;
        recompute_order_total(&mut tx, existing.order_id).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Deletes an order and its items.
    ///
    /// The caller states what happens to stock: `Restore` returns each
    /// item's quantity to its product (the order never shipped), `Leave`
    /// keeps stock as-is (the goods are gone). One transaction either way;
    /// an order that is still referenced by an invoice fails with
    /// `ForeignKeyViolation` and nothing changes, stock included.
    pub async fn delete_order(&self, id: i64, stock: StockRestoration) -> DbResult<()> {
        debug!(id = %id, policy = ?stock, "Deleting order");

        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM orders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found("Order", id.to_string()));
        }

        if stock == StockRestoration::Restore {
            let items = fetch_items(&mut tx, id).await?;
            for item in &items {
                apply_stock_delta(&mut tx, item.product_id, item.quantity).await?;
            }
        }

        sqlx::query("DELETE FROM order_items WHERE order_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Counts orders (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Fetches one order item on an explicit connection (transaction-friendly).
async fn fetch_item(conn: &mut SqliteConnection, item_id: i64) -> DbResult<Option<OrderItem>> {
    let item = sqlx::query_as::<_, OrderItem>(
        r#"
        SELECT id, order_id, product_id, quantity, unit_price_cents
        FROM order_items
        WHERE id = ?1
        "#,
    )
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(item)
}

/// Fetches an order's items on an explicit connection.
async fn fetch_items(conn: &mut SqliteConnection, order_id: i64) -> DbResult<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
        r#"
        SELECT id, order_id, product_id, quantity, unit_price_cents
        FROM order_items
        WHERE order_id = ?1
        ORDER BY id
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

/// Recomputes and stores an order's total from its current items, returning
/// the items read. Runs on the caller's transaction so the stored total can
/// never be observed out of step with the items.
async fn recompute_order_total(
    conn: &mut SqliteConnection,
    order_id: i64,
) -> DbResult<Vec<OrderItem>> {
    let items = fetch_items(conn, order_id).await?;
    let total = order_total(items.iter().map(OrderItem::subtotal));

    sqlx::query("UPDATE orders SET total_cents = ?2 WHERE id = ?1")
        .bind(order_id)
        .bind(total.cents())
        .execute(&mut *conn)
        .await?;

    Ok(items)
}

// =============================================================================
// Unit Tests
// =============================================================================
