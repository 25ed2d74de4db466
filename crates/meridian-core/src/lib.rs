//! # meridian-core: Pure Business Logic for Meridian
//!
//! This crate is the **heart** of Meridian, a business-management backend
//! covering customers, suppliers, products, orders, invoices, payments, and
//! users. It contains all business rules as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Meridian Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Consumers (UI, services)                       │   │
//! │  │     order forms ──► invoice views ──► inventory screens        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                meridian-db (Database Layer)                     │   │
//! │  │        SQLite pool, migrations, one repository per entity       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ meridian-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  derived  │  │ validation│  │   │
//! │  │   │  Order    │  │   Money   │  │ order     │  │   rules   │  │   │
//! │  │   │  Invoice  │  │  (cents)  │  │ total,    │  │  checks   │  │   │
//! │  │   │  Payment  │  │           │  │ statuses  │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Customer, Product, Order, Invoice, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`derived`] - The single source of truth for order totals and
//!   invoice status
//! - [`error`] - Validation error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **One Derivation Path**: Order totals and invoice statuses are computed
//!    by exactly one function each, called from every mutation site
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use meridian_core::money::Money;
//! use meridian_core::derived::derive_invoice_status;
//! use meridian_core::types::InvoiceStatus;
//!
//! let amount = Money::from_cents(10_000); // $100.00
//! let paid = Money::from_cents(6_000);    // $60.00 received so far
//! let due = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
//! let today = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
//!
//! // Under-paid and past due
//! assert_eq!(
//!     derive_invoice_status(amount, paid, due, today),
//!     InvoiceStatus::Overdue
//! );
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod derived;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use meridian_core::Money` instead of
// `use meridian_core::money::Money`

pub use derived::{derive_invoice_status, order_total};
pub use error::ValidationError;
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed on a single order.
///
/// ## Business Reason
/// Prevents runaway orders and keeps the order-creation transaction bounded.
pub const MAX_ORDER_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
