//! # Derived Values
//!
//! The single source of truth for the two values this system derives from
//! other rows: an order's total and an invoice's settlement status.
//!
//! ## Why One Function Each?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Order.total_cents and Invoice.status are DENORMALIZED: they live in   │
//! │  a column but are fully determined by other rows.                       │
//! │                                                                         │
//! │  Every mutation path that can change the inputs calls the ONE           │
//! │  function here and writes its result back in the same transaction:      │
//! │                                                                         │
//! │    create order ─┐                        add payment ─┐                │
//! │    add item     ─┼─► order_total()        update pay  ─┼─► derive_     │
//! │    update item  ─┤                        remove pay  ─┤   invoice_    │
//! │    remove item  ─┘                        refresh     ─┘   status()    │
//! │                                                                         │
//! │  Duplicate re-implementations at call sites are how derived columns     │
//! │  drift; there are none.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::money::Money;
use crate::types::InvoiceStatus;

// =============================================================================
// Order Total
// =============================================================================

/// Sums line-item subtotals into an order total.
///
/// Takes any iterator of subtotals so the same function serves both drafts
/// (`NewOrderItem::subtotal`) and persisted items (`OrderItem::subtotal`).
///
/// ## Example
/// ```rust
/// use meridian_core::money::Money;
/// use meridian_core::derived::order_total;
///
/// // 3 × $10.00 + 1 × $25.00 = $55.00
/// let subtotals = [Money::from_cents(3000), Money::from_cents(2500)];
/// assert_eq!(order_total(subtotals), Money::from_cents(5500));
/// ```
pub fn order_total<I>(subtotals: I) -> Money
where
    I: IntoIterator<Item = Money>,
{
    subtotals
        .into_iter()
        .fold(Money::zero(), |total, subtotal| total + subtotal)
}

// =============================================================================
// Invoice Status
// =============================================================================

/// Derives an invoice's settlement status from the payment sum, the due
/// date, and the current date.
///
/// ## Transition Rule (evaluated in this order)
/// ```text
/// 1. total_paid >= amount          → Paid
/// 2. else if today > due_on        → Overdue
/// 3. else                          → Issued
/// ```
///
/// `Cancelled` is never returned: it is a terminal status set only by the
/// explicit cancel operation, and callers must not invoke this derivation
/// for a cancelled invoice.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use meridian_core::money::Money;
/// use meridian_core::derived::derive_invoice_status;
/// use meridian_core::types::InvoiceStatus;
///
/// let due = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
/// let today = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
///
/// let status = derive_invoice_status(
///     Money::from_cents(10_000), // $100.00 billed
///     Money::from_cents(6_000),  // $60.00 received
///     due,
///     today,
/// );
/// assert_eq!(status, InvoiceStatus::Overdue);
/// ```
pub fn derive_invoice_status(
    amount: Money,
    total_paid: Money,
    due_on: NaiveDate,
    today: NaiveDate,
) -> InvoiceStatus {
    if total_paid >= amount {
        InvoiceStatus::Paid
    } else if today > due_on {
        InvoiceStatus::Overdue
    } else {
        InvoiceStatus::Issued
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
