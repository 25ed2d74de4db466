//! # Invoice Repository
//!
//! Database operations for invoices and their payments.
//!
//! ## Status Derivation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How an invoice gets its status                       │
//! │                                                                         │
//! │   add_payment / update_payment / remove_payment / update_invoice        │
//! │                              │                                          │
//! │                              ▼                                          │
//! │                   SUM(payments.amount_cents)                            │
//! │                              │                                          │
//! │                              ▼                                          │
//! │              derive_invoice_status(amount, paid, due, today)            │
//! │                              │                                          │
//! │               ┌──────────────┼──────────────┐                           │
//! │               ▼              ▼              ▼                           │
//! │            issued          paid          overdue                        │
//! │                                                                         │
//! │   cancelled: set ONLY by cancel(), never derived, never left.           │
//! │   Payments still record against a cancelled invoice (the money          │
//! │   arrived); they just don't move its status.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every payment mutation and the derived-status update run in one
//! transaction, so a stored status can never disagree with the stored
//! payments.

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use meridian_core::validation::{validate_payment_amount, validate_price_cents};
use meridian_core::{
    derive_invoice_status, Invoice, InvoiceStatus, InvoiceUpdate, Money, NewInvoice, NewPayment,
    Payment, PaymentMethod,
};

/// Repository for invoice and payment database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Creates an invoice against an order.
    ///
    /// When the draft carries no number one is generated. The initial
    /// status is derived with zero paid: `Issued`, or `Overdue` if the due
    /// date is already in the past.
    ///
    /// ## Returns
    /// * `Ok(Invoice)` - Created invoice with assigned id
    /// * `Err(DbError::UniqueViolation)` - Invoice number already exists
    /// * `Err(DbError::ForeignKeyViolation)` - Unknown order
    pub async fn create_invoice(&self, draft: NewInvoice) -> DbResult<Invoice> {
        validate_price_cents(draft.amount_cents)?;

        let number = draft.number.unwrap_or_else(generate_invoice_number);
        let status = derive_invoice_status(
            Money::from_cents(draft.amount_cents),
            Money::zero(),
            draft.due_on,
            Utc::now().date_naive(),
        );

        debug!(number = %number, order_id = %draft.order_id, status = %status.as_str(), "Creating invoice");

        let result = sqlx::query(
            r#"
            INSERT INTO invoices (number, order_id, issued_on, due_on, amount_cents, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&number)
        .bind(draft.order_id)
        .bind(draft.issued_on)
        .bind(draft.due_on)
        .bind(draft.amount_cents)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(Invoice {
            id: result.last_insert_rowid(),
            number,
            order_id: draft.order_id,
            issued_on: draft.issued_on,
            due_on: draft.due_on,
            amount_cents: draft.amount_cents,
            status,
        })
    }

    /// Gets an invoice by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, number, order_id, issued_on, due_on, amount_cents, status
            FROM invoices
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Gets an invoice by its number.
    pub async fn get_by_number(&self, number: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, number, order_id, issued_on, due_on, amount_cents, status
            FROM invoices
            WHERE number = ?1
            "#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Lists invoices, newest first.
    pub async fn list(&self) -> DbResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, number, order_id, issued_on, due_on, amount_cents, status
            FROM invoices
            ORDER BY issued_on DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }

    /// Lists the invoices raised against one order.
    pub async fn list_by_order(&self, order_id: i64) -> DbResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, number, order_id, issued_on, due_on, amount_cents, status
            FROM invoices
            WHERE order_id = ?1
            ORDER BY issued_on DESC, id DESC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }

    /// Updates an invoice's due date and amount, then re-derives its status
    /// in the same transaction (raising the amount can turn a paid invoice
    /// back into an issued one). A cancelled invoice keeps its fields
    /// updated but stays cancelled.
    pub async fn update_invoice(&self, id: i64, update: InvoiceUpdate) -> DbResult<Invoice> {
        validate_price_cents(update.amount_cents)?;

        debug!(id = %id, "Updating invoice");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                due_on = ?2,
                amount_cents = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(update.due_on)
        .bind(update.amount_cents)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", id.to_string()));
        }

        let mut invoice = fetch_invoice(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id.to_string()))?;
        invoice.status = apply_derived_status(&mut tx, &invoice).await?;

        tx.commit().await?;
        Ok(invoice)
    }

    /// Cancels an invoice. Terminal: no later payment or refresh moves it
    /// out of `Cancelled`.
    pub async fn cancel(&self, id: i64) -> DbResult<Invoice> {
        debug!(id = %id, "Cancelling invoice");

        let result = sqlx::query("UPDATE invoices SET status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(InvoiceStatus::Cancelled)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", id.to_string()));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id.to_string()))
    }

    /// Re-derives an invoice's status from its payments and the current
    /// date, storing any change. This is how an `Issued` invoice becomes
    /// `Overdue` once its due date passes without a payment event.
    pub async fn refresh_status(&self, id: i64) -> DbResult<InvoiceStatus> {
        let mut tx = self.pool.begin().await?;

        let invoice = fetch_invoice(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id.to_string()))?;
        let status = apply_derived_status(&mut tx, &invoice).await?;

        tx.commit().await?;
        Ok(status)
    }

    /// Deletes an invoice.
    ///
    /// Refused with `InvoiceHasPayments` while any payment rows reference
    /// it; remove the payments first if the deletion is really intended.
    pub async fn delete_invoice(&self, id: i64) -> DbResult<()> {
        debug!(id = %id, "Deleting invoice");

        let mut tx = self.pool.begin().await?;

        let payments: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE invoice_id = ?1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if payments > 0 {
            return Err(DbError::InvoiceHasPayments {
                invoice_id: id,
                payments,
            });
        }

        let result = sqlx::query("DELETE FROM invoices WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", id.to_string()));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Records a payment against an invoice and re-derives the invoice
    /// status, in one transaction. When the draft carries no reference one
    /// is generated.
    pub async fn add_payment(&self, invoice_id: i64, draft: NewPayment) -> DbResult<Payment> {
        validate_payment_amount(draft.amount_cents)?;

        let reference = draft.reference.unwrap_or_else(generate_payment_reference);

        debug!(invoice_id = %invoice_id, reference = %reference, amount_cents = draft.amount_cents, "Recording payment");

        let mut tx = self.pool.begin().await?;

        let invoice = fetch_invoice(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", invoice_id.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO payments (reference, invoice_id, amount_cents, paid_on, method)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&reference)
        .bind(invoice_id)
        .bind(draft.amount_cents)
        .bind(draft.paid_on)
        .bind(draft.method)
        .execute(&mut *tx)
        .await?;

        apply_derived_status(&mut tx, &invoice).await?;

        tx.commit().await?;

        Ok(Payment {
            id: result.last_insert_rowid(),
            reference,
            invoice_id,
            amount_cents: draft.amount_cents,
            paid_on: draft.paid_on,
            method: draft.method,
        })
    }

    /// Corrects a payment's amount, date, or method, then re-derives the
    /// parent invoice's status.
    pub async fn update_payment(
        &self,
        payment_id: i64,
        amount_cents: i64,
        paid_on: NaiveDate,
        method: PaymentMethod,
    ) -> DbResult<Payment> {
        validate_payment_amount(amount_cents)?;

        debug!(payment_id = %payment_id, amount_cents, "Updating payment");

        let mut tx = self.pool.begin().await?;

        let existing = fetch_payment(&mut tx, payment_id)
            .await?
            .ok_or_else(|| DbError::not_found("Payment", payment_id.to_string()))?;

        sqlx::query(
            r#"
            UPDATE payments SET
                amount_cents = ?2,
                paid_on = ?3,
                method = ?4
            WHERE id = ?1
            "#,
        )
        .bind(payment_id)
        .bind(amount_cents)
        .bind(paid_on)
        .bind(method)
        .execute(&mut *tx)
        .await?;

        let invoice = fetch_invoice(&mut tx, existing.invoice_id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", existing.invoice_id.to_string()))?;
        apply_derived_status(&mut tx, &invoice).await?;

        tx.commit().await?;

        Ok(Payment {
            id: payment_id,
            reference: existing.reference,
            invoice_id: existing.invoice_id,
            amount_cents,
            paid_on,
            method,
        })
    }

    /// Removes a payment and re-derives the parent invoice's status (a
    /// paid invoice can fall back to issued or overdue).
    pub async fn remove_payment(&self, payment_id: i64) -> DbResult<()> {
        debug!(payment_id = %payment_id, "Removing payment");

        let mut tx = self.pool.begin().await?;

        let existing = fetch_payment(&mut tx, payment_id)
            .await?
            .ok_or_else(|| DbError::not_found("Payment", payment_id.to_string()))?;

        sqlx::query("DELETE FROM payments WHERE id = ?1")
            .bind(payment_id)
            .execute(&mut *tx)
            .await?;

        let invoice = fetch_invoice(&mut tx, existing.invoice_id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", existing.invoice_id.to_string()))?;
        apply_derived_status(&mut tx, &invoice).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Gets an invoice's payments, oldest first.
    pub async fn get_payments(&self, invoice_id: i64) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, reference, invoice_id, amount_cents, paid_on, method
            FROM payments
            WHERE invoice_id = ?1
            ORDER BY paid_on, id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Sums an invoice's payments. Zero when there are none.
    pub async fn total_paid(&self, invoice_id: i64) -> DbResult<Money> {
        let total: Option<i64> =
            sqlx::query_scalar("SELECT SUM(amount_cents) FROM payments WHERE invoice_id = ?1")
                .bind(invoice_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(Money::from_cents(total.unwrap_or(0)))
    }

    /// Counts invoices (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Fetches one invoice on an explicit connection (transaction-friendly).
async fn fetch_invoice(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Invoice>> {
    let invoice = sqlx::query_as::<_, Invoice>(
        r#"
        SELECT id, number, order_id, issued_on, due_on, amount_cents, status
        FROM invoices
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(invoice)
}

/// Fetches one payment on an explicit connection.
async fn fetch_payment(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Payment>> {
    let payment = sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, reference, invoice_id, amount_cents, paid_on, method
        FROM payments
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(payment)
}

/// Sums an invoice's payments on an explicit connection.
async fn sum_payments(conn: &mut SqliteConnection, invoice_id: i64) -> DbResult<Money> {
    let total: Option<i64> =
        sqlx::query_scalar("SELECT SUM(amount_cents) FROM payments WHERE invoice_id = ?1")
            .bind(invoice_id)
            .fetch_one(&mut *conn)
            .await?;

    Ok(Money::from_cents(total.unwrap_or(0)))
}

/// Re-derives and stores an invoice's status from its payments.
///
/// This is the one place the cancelled guard lives: a cancelled invoice is
/// returned as-is and nothing is written. Runs on the caller's transaction.
async fn apply_derived_status(
    conn: &mut SqliteConnection,
    invoice: &Invoice,
) -> DbResult<InvoiceStatus> {
    if invoice.status.is_cancelled() {
        return Ok(InvoiceStatus::Cancelled);
    }

    let paid = sum_payments(conn, invoice.id).await?;
    let status = derive_invoice_status(
        invoice.amount(),
        paid,
        invoice.due_on,
        Utc::now().date_naive(),
    );

    if status != invoice.status {
        debug!(id = %invoice.id, from = %invoice.status.as_str(), to = %status.as_str(), "Invoice status changed");
        sqlx::query("UPDATE invoices SET status = ?2 WHERE id = ?1")
            .bind(invoice.id)
            .bind(status)
            .execute(&mut *conn)
            .await?;
    }

    Ok(status)
}

/// Generates an invoice number in format: INV-YYYYMMDD-NNNN
///
/// ## Example
/// `INV-20250115-0042`
fn generate_invoice_number() -> String {
    let now = Utc::now();

    // For now, use timestamp milliseconds as sequence
    // TODO: In production, this should be a proper daily counter
    let seq = (now.timestamp_millis() % 10000) as u32;

    format!("INV-{}-{:04}", now.format("%Y%m%d"), seq)
}

/// Generates a unique payment reference.
fn generate_payment_reference() -> String {
    format!("PAY-{}", Uuid::new_v4())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::{Duration, NaiveDate};
    use meridian_core::{NewCustomer, NewOrder, NewOrderItem, NewProduct, OrderStatus};

    /// Sets up a database with one order to invoice against.
    async fn seed_order() -> (Database, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let customer = db
            .customers()
            .create(NewCustomer {
                code: "CUST-1".to_string(),
                name: "Acme Corp".to_string(),
                email: None,
                phone: None,
                address: None,
            })
            .await
            .unwrap();

        let product = db
            .products()
            .create(NewProduct {
                code: "PROD-1".to_string(),
                name: "Widget".to_string(),
                description: None,
                price_cents: 1000,
                stock_quantity: 100,
                category: None,
                supplier_id: None,
            })
            .await
            .unwrap();

        let order = db
            .orders()
            .create_order(NewOrder {
                code: "ORD-1".to_string(),
                customer_id: customer.id,
                ordered_at: Utc::now(),
                status: OrderStatus::Pending,
                payment_method: PaymentMethod::Cash,
                items: vec![NewOrderItem {
                    product_id: product.id,
                    quantity: 1,
                    unit_price_cents: 1000,
                }],
            })
            .await
            .unwrap();

        (db, order.id)
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn invoice_draft(order_id: i64, amount_cents: i64, due_on: NaiveDate) -> NewInvoice {
        NewInvoice {
            number: None,
            order_id,
            issued_on: today(),
            due_on,
            amount_cents,
        }
    }

    fn payment(amount_cents: i64, paid_on: NaiveDate) -> NewPayment {
        NewPayment {
            reference: None,
            amount_cents,
            paid_on,
            method: PaymentMethod::Cash,
        }
    }

    #[tokio::test]
    async fn test_create_invoice_initial_status() {
        let (db, order_id) = seed_order().await;

        let mut draft = invoice_draft(order_id, 10000, today() + Duration::days(14));
        draft.number = Some("INV-A".to_string());
        let open = db.invoices().create_invoice(draft).await.unwrap();
        assert_eq!(open.status, InvoiceStatus::Issued);
        assert!(open.id > 0);

        let mut draft = invoice_draft(order_id, 10000, today() - Duration::days(1));
        draft.number = Some("INV-B".to_string());
        let late = db.invoices().create_invoice(draft).await.unwrap();
        assert_eq!(late.status, InvoiceStatus::Overdue);
    }

    #[tokio::test]
    async fn test_create_invoice_generates_number() {
        let (db, order_id) = seed_order().await;

        let invoice = db
            .invoices()
            .create_invoice(invoice_draft(order_id, 5000, today() + Duration::days(7)))
            .await
            .unwrap();

        assert!(invoice.number.starts_with("INV-"));
        let found = db
            .invoices()
            .get_by_number(&invoice.number)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, invoice.id);
    }

    #[tokio::test]
    async fn test_create_invoice_duplicate_number() {
        let (db, order_id) = seed_order().await;

        let mut draft = invoice_draft(order_id, 5000, today() + Duration::days(7));
        draft.number = Some("INV-FIXED".to_string());
        db.invoices().create_invoice(draft.clone()).await.unwrap();

        let err = db.invoices().create_invoice(draft).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_create_invoice_unknown_order() {
        let (db, _) = seed_order().await;

        let err = db
            .invoices()
            .create_invoice(invoice_draft(9999, 5000, today() + Duration::days(7)))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_payments_drive_status() {
        let (db, order_id) = seed_order().await;

        // $100.00, due long past: starts overdue.
        let invoice = db
            .invoices()
            .create_invoice(invoice_draft(order_id, 10000, today() - Duration::days(30)))
            .await
            .unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Overdue);

        // $60.00 paid: still short, still overdue.
        db.invoices()
            .add_payment(invoice.id, payment(6000, today()))
            .await
            .unwrap();
        let current = db.invoices().get_by_id(invoice.id).await.unwrap().unwrap();
        assert_eq!(current.status, InvoiceStatus::Overdue);
        assert_eq!(db.invoices().total_paid(invoice.id).await.unwrap().cents(), 6000);

        // Remaining $40.00: settled in full, overdue no longer.
        db.invoices()
            .add_payment(invoice.id, payment(4000, today()))
            .await
            .unwrap();
        let current = db.invoices().get_by_id(invoice.id).await.unwrap().unwrap();
        assert_eq!(current.status, InvoiceStatus::Paid);
        assert_eq!(db.invoices().total_paid(invoice.id).await.unwrap().cents(), 10000);
    }

    #[tokio::test]
    async fn test_remove_payment_rederives_status() {
        let (db, order_id) = seed_order().await;

        let invoice = db
            .invoices()
            .create_invoice(invoice_draft(order_id, 10000, today() - Duration::days(30)))
            .await
            .unwrap();
        db.invoices()
            .add_payment(invoice.id, payment(6000, today()))
            .await
            .unwrap();
        let settling = db
            .invoices()
            .add_payment(invoice.id, payment(4000, today()))
            .await
            .unwrap();
        assert_eq!(
            db.invoices().get_by_id(invoice.id).await.unwrap().unwrap().status,
            InvoiceStatus::Paid
        );

        db.invoices().remove_payment(settling.id).await.unwrap();

        let current = db.invoices().get_by_id(invoice.id).await.unwrap().unwrap();
        assert_eq!(current.status, InvoiceStatus::Overdue);
        assert_eq!(db.invoices().total_paid(invoice.id).await.unwrap().cents(), 6000);
    }

    #[tokio::test]
    async fn test_update_payment_rederives_status() {
        let (db, order_id) = seed_order().await;

        let invoice = db
            .invoices()
            .create_invoice(invoice_draft(order_id, 10000, today() + Duration::days(7)))
            .await
            .unwrap();
        let partial = db
            .invoices()
            .add_payment(invoice.id, payment(6000, today()))
            .await
            .unwrap();
        assert_eq!(
            db.invoices().get_by_id(invoice.id).await.unwrap().unwrap().status,
            InvoiceStatus::Issued
        );

        // Corrected upward to the full amount.
        let updated = db
            .invoices()
            .update_payment(partial.id, 10000, today(), PaymentMethod::BankTransfer)
            .await
            .unwrap();
        assert_eq!(updated.amount_cents, 10000);
        assert_eq!(updated.method, PaymentMethod::BankTransfer);
        assert_eq!(updated.reference, partial.reference);

        assert_eq!(
            db.invoices().get_by_id(invoice.id).await.unwrap().unwrap().status,
            InvoiceStatus::Paid
        );
    }

    #[tokio::test]
    async fn test_delete_invoice_with_payments_refused() {
        let (db, order_id) = seed_order().await;

        let invoice = db
            .invoices()
            .create_invoice(invoice_draft(order_id, 10000, today() + Duration::days(7)))
            .await
            .unwrap();
        db.invoices()
            .add_payment(invoice.id, payment(2500, today()))
            .await
            .unwrap();

        let err = db.invoices().delete_invoice(invoice.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::InvoiceHasPayments { payments: 1, .. }
        ));

        // Both rows survive the refusal.
        assert!(db.invoices().get_by_id(invoice.id).await.unwrap().is_some());
        assert_eq!(db.invoices().get_payments(invoice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_invoice_without_payments() {
        let (db, order_id) = seed_order().await;

        let invoice = db
            .invoices()
            .create_invoice(invoice_draft(order_id, 10000, today() + Duration::days(7)))
            .await
            .unwrap();

        db.invoices().delete_invoice(invoice.id).await.unwrap();
        assert!(db.invoices().get_by_id(invoice.id).await.unwrap().is_none());

        let err = db.invoices().delete_invoice(invoice.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_cancel_is_terminal() {
        let (db, order_id) = seed_order().await;

        let invoice = db
            .invoices()
            .create_invoice(invoice_draft(order_id, 10000, today() + Duration::days(7)))
            .await
            .unwrap();

        let cancelled = db.invoices().cancel(invoice.id).await.unwrap();
        assert_eq!(cancelled.status, InvoiceStatus::Cancelled);

        // The payment records, but the status does not move.
        db.invoices()
            .add_payment(invoice.id, payment(10000, today()))
            .await
            .unwrap();
        assert_eq!(db.invoices().total_paid(invoice.id).await.unwrap().cents(), 10000);
        assert_eq!(
            db.invoices().get_by_id(invoice.id).await.unwrap().unwrap().status,
            InvoiceStatus::Cancelled
        );

        let refreshed = db.invoices().refresh_status(invoice.id).await.unwrap();
        assert_eq!(refreshed, InvoiceStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_update_invoice_rederives_status() {
        let (db, order_id) = seed_order().await;

        let invoice = db
            .invoices()
            .create_invoice(invoice_draft(order_id, 10000, today() + Duration::days(7)))
            .await
            .unwrap();
        db.invoices()
            .add_payment(invoice.id, payment(10000, today()))
            .await
            .unwrap();
        assert_eq!(
            db.invoices().get_by_id(invoice.id).await.unwrap().unwrap().status,
            InvoiceStatus::Paid
        );

        // Raising the amount reopens the invoice.
        let updated = db
            .invoices()
            .update_invoice(
                invoice.id,
                InvoiceUpdate {
                    due_on: today() + Duration::days(14),
                    amount_cents: 20000,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.amount_cents, 20000);
        assert_eq!(updated.status, InvoiceStatus::Issued);
    }

    #[tokio::test]
    async fn test_refresh_rolls_issued_to_overdue() {
        let (db, order_id) = seed_order().await;

        let invoice = db
            .invoices()
            .create_invoice(invoice_draft(order_id, 10000, today() + Duration::days(7)))
            .await
            .unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Issued);

        // Time passes: push the due date behind us, around the repository.
        sqlx::query("UPDATE invoices SET due_on = ?2 WHERE id = ?1")
            .bind(invoice.id)
            .bind(today() - Duration::days(1))
            .execute(db.pool())
            .await
            .unwrap();

        let status = db.invoices().refresh_status(invoice.id).await.unwrap();
        assert_eq!(status, InvoiceStatus::Overdue);
        assert_eq!(
            db.invoices().get_by_id(invoice.id).await.unwrap().unwrap().status,
            InvoiceStatus::Overdue
        );
    }

    #[tokio::test]
    async fn test_get_payments_oldest_first() {
        let (db, order_id) = seed_order().await;

        let invoice = db
            .invoices()
            .create_invoice(invoice_draft(order_id, 10000, today() + Duration::days(30)))
            .await
            .unwrap();

        db.invoices()
            .add_payment(invoice.id, payment(3000, today()))
            .await
            .unwrap();
        db.invoices()
            .add_payment(invoice.id, payment(1000, today() - Duration::days(5)))
            .await
            .unwrap();

        let payments = db.invoices().get_payments(invoice.id).await.unwrap();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0].amount_cents, 1000);
        assert_eq!(payments[1].amount_cents, 3000);
        assert!(payments.iter().all(|p| p.reference.starts_with("PAY-")));
    }

    #[tokio::test]
    async fn test_total_paid_zero_without_payments() {
        let (db, order_id) = seed_order().await;

        let invoice = db
            .invoices()
            .create_invoice(invoice_draft(order_id, 10000, today() + Duration::days(7)))
            .await
            .unwrap();

        assert_eq!(db.invoices().total_paid(invoice.id).await.unwrap().cents(), 0);
    }

    #[tokio::test]
    async fn test_payment_amount_must_be_positive() {
        let (db, order_id) = seed_order().await;

        let invoice = db
            .invoices()
            .create_invoice(invoice_draft(order_id, 10000, today() + Duration::days(7)))
            .await
            .unwrap();

        let err = db
            .invoices()
            .add_payment(invoice.id, payment(0, today()))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));

        let missing = db
            .invoices()
            .add_payment(9999, payment(1000, today()))
            .await
            .unwrap_err();
        assert!(matches!(missing, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_by_order() {
        let (db, order_id) = seed_order().await;

        let mut first = invoice_draft(order_id, 5000, today() + Duration::days(7));
        first.number = Some("INV-A".to_string());
        db.invoices().create_invoice(first).await.unwrap();

        let mut second = invoice_draft(order_id, 3000, today() + Duration::days(14));
        second.number = Some("INV-B".to_string());
        db.invoices().create_invoice(second).await.unwrap();

        let for_order = db.invoices().list_by_order(order_id).await.unwrap();
        assert_eq!(for_order.len(), 2);

        let all = db.invoices().list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(db.invoices().count().await.unwrap(), 2);
    }
}
