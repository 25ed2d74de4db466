//! # Domain Types
//!
//! Core domain types used throughout Meridian.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐              │
//! │  │   Customer   │───►│    Order     │◄───│  OrderItem   │              │
//! │  │  id, code    │    │  id, code    │    │  quantity    │              │
//! │  │  name, email │    │  total_cents │    │  unit_price  │              │
//! │  └──────────────┘    │  status      │    │  (captured)  │              │
//! │                      └──────┬───────┘    └──────┬───────┘              │
//! │  ┌──────────────┐           │                   │                      │
//! │  │   Supplier   │           ▼                   ▼                      │
//! │  │  id, code    │    ┌──────────────┐    ┌──────────────┐              │
//! │  └──────┬───────┘    │   Invoice    │◄───│   Payment    │              │
//! │         │            │  amount, due │    │  amount      │              │
//! │         ▼            │  status      │    │  paid_on     │              │
//! │  ┌──────────────┐    └──────────────┘    └──────────────┘              │
//! │  │   Product    │                                                      │
//! │  │  price_cents │     Invoice.status is DERIVED from the sum of        │
//! │  │  stock qty   │     its payments vs its amount (see `derived`)       │
//! │  └──────────────┘                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: i64 surrogate key assigned by the database on insert
//! - Business code: (customer code, product code, invoice number, ...) -
//!   human-readable, unique, potentially shown on documents

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Customer
// =============================================================================

/// A customer who places orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    /// Surrogate key assigned by the database.
    pub id: i64,

    /// Business code shown on documents (e.g. "CUST-0042").
    pub code: String,

    /// Display name.
    pub name: String,

    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,

    /// When the customer record was created.
    pub registered_at: DateTime<Utc>,
}

/// Input for creating a customer. The id and registration timestamp are
/// assigned by the data layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomer {
    pub code: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

// =============================================================================
// Supplier
// =============================================================================

/// A supplier who provides products.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Input for creating a supplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSupplier {
    pub code: String,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

// =============================================================================
// Product
// =============================================================================

/// A product that can appear on orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Surrogate key assigned by the database.
    pub id: i64,

    /// Business code - unique product identifier (e.g. "PRD-1001").
    pub code: String,

    /// Display name.
    pub name: String,

    /// Optional long description.
    pub description: Option<String>,

    /// Current list price in cents. Order items capture their own copy of
    /// this at order time; later price changes never affect placed orders.
    pub price_cents: i64,

    /// Available inventory. Mutated only through the stock-delta path in
    /// the data layer; never negative.
    pub stock_quantity: i64,

    /// Optional grouping category.
    pub category: Option<String>,

    /// Supplier this product is purchased from.
    pub supplier_id: Option<i64>,
}

impl Product {
    /// Returns the current list price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether `quantity` units could be taken from stock.
    pub fn has_stock(&self, quantity: i64) -> bool {
        self.stock_quantity >= quantity
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub category: Option<String>,
    pub supplier_id: Option<i64>,
}

// =============================================================================
// Order Status
// =============================================================================

/// The fulfillment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order placed, not yet being worked.
    Pending,
    /// Order picked up by fulfillment.
    Processing,
    /// Order handed to the carrier.
    Shipped,
    /// Order received by the customer.
    Delivered,
    /// Order cancelled.
    Cancelled,
}

impl OrderStatus {
    /// Stable lowercase name, matching the persisted representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How an order or payment is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash.
    Cash,
    /// Card payment.
    Card,
    /// Direct bank transfer.
    BankTransfer,
    /// Paper check.
    Check,
}

impl PaymentMethod {
    /// Stable snake_case name, matching the persisted representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Check => "check",
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// =============================================================================
// Order
// =============================================================================

/// A customer order with its line items.
///
/// `total_cents` is denormalized: it always equals the sum of the item
/// subtotals and is recomputed by the data layer on every mutation that can
/// change it (never trusted from the caller).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,

    /// Business code shown on documents (e.g. "ORD-2025-0042").
    pub code: String,

    pub customer_id: i64,
    pub ordered_at: DateTime<Utc>,

    /// Sum of item subtotals at the moment of the last save.
    pub total_cents: i64,

    pub status: OrderStatus,
    pub payment_method: PaymentMethod,

    /// Line items. Populated on single-order lookups and on creation;
    /// list queries leave this empty and items are fetched separately.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Returns the stored total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item on an order.
///
/// The unit price is captured from the product at order time and is
/// independent of the product's current price from then on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,

    /// Units ordered; always positive.
    pub quantity: i64,

    /// Price per unit in cents, frozen at order time.
    pub unit_price_cents: i64,
}

impl OrderItem {
    /// Returns the captured unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Subtotal = quantity × unit price. Computed at read time, never stored.
    #[inline]
    pub fn subtotal(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

/// Input for creating an order together with its items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub code: String,
    pub customer_id: i64,
    pub ordered_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub items: Vec<NewOrderItem>,
}

/// Input for one line item of a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// Scalar order fields a caller may change after creation.
///
/// The total is deliberately absent: it is always recomputed from the
/// current items and cannot be supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub customer_id: i64,
    pub ordered_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
}

impl NewOrderItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Subtotal = quantity × unit price, same rule as a persisted item.
    #[inline]
    pub fn subtotal(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Stock Restoration Policy
// =============================================================================

/// What to do with product stock when a whole order is deleted.
///
/// Deleting a single item always restores its quantity to stock. Whole-order
/// deletion is ambiguous - the order may have been fulfilled (stock already
/// gone for good) or cancelled before fulfillment (stock should return) -
/// so callers must state the policy explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockRestoration {
    /// Return each deleted item's quantity to its product's stock.
    Restore,
    /// Leave stock untouched.
    Leave,
}

// =============================================================================
// Invoice Status
// =============================================================================

/// The settlement status of an invoice.
///
/// Every status except `Cancelled` is derived from the payment sum and the
/// due date by `derived::derive_invoice_status`. `Cancelled` is terminal:
/// it is set only by the explicit cancel operation and the derivation never
/// runs against a cancelled invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Awaiting payment, not yet past due.
    Issued,
    /// Payments cover the invoice amount in full.
    Paid,
    /// Not fully paid and past the due date.
    Overdue,
    /// Cancelled by an administrator; terminal.
    Cancelled,
}

impl InvoiceStatus {
    /// Stable lowercase name, matching the persisted representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Issued => "issued",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// True for the terminal, never-derived status.
    #[inline]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, InvoiceStatus::Cancelled)
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Issued
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// An invoice raised against an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: i64,

    /// Unique invoice number (e.g. "INV-20250115-0042").
    pub number: String,

    pub order_id: i64,
    pub issued_on: NaiveDate,
    pub due_on: NaiveDate,

    /// Amount billed, in cents.
    pub amount_cents: i64,

    /// Derived settlement status (see `InvoiceStatus`).
    pub status: InvoiceStatus,
}

impl Invoice {
    /// Returns the billed amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Input for creating an invoice. When `number` is None the data layer
/// generates one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoice {
    pub number: Option<String>,
    pub order_id: i64,
    pub issued_on: NaiveDate,
    pub due_on: NaiveDate,
    pub amount_cents: i64,
}

/// Scalar invoice fields a caller may change after creation.
///
/// Status is deliberately absent: it is derived from payments and the due
/// date (except Cancelled, which only the cancel operation sets).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceUpdate {
    pub due_on: NaiveDate,
    pub amount_cents: i64,
}

// =============================================================================
// Payment
// =============================================================================

/// A payment received against an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: i64,

    /// Unique payment reference (receipt code).
    pub reference: String,

    pub invoice_id: i64,
    pub amount_cents: i64,
    pub paid_on: NaiveDate,
    pub method: PaymentMethod,
}

impl Payment {
    /// Returns the payment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Input for recording a payment. When `reference` is None the data layer
/// generates one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub reference: Option<String>,
    pub amount_cents: i64,
    pub paid_on: NaiveDate,
    pub method: PaymentMethod,
}

// =============================================================================
// User
// =============================================================================

/// An application user's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Manager,
    Staff,
}

impl UserRole {
    /// Stable lowercase name, matching the persisted representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::Staff => "staff",
        }
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Staff
    }
}

/// An application user account.
///
/// The password is stored only as an argon2 PHC string (the salt is embedded
/// in the string); it is never serialized outward.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub username: String,

    /// Argon2 PHC string. Skipped on serialization so it can never leak
    /// through an API response.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub full_name: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a user. The plain password is hashed by the data
/// layer and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: UserRole,
}

// =============================================================================
// Unit Tests
// =============================================================================
