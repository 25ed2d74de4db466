//! # Repository Module
//!
//! Database repository implementations for Meridian.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Caller                                                                 │
//! │       │                                                                 │
//! │       │  db.orders().create_order(draft)                               │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── create_order(&self, draft)                                        │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── add_item(&self, order_id, draft)                                  │
//! │  └── delete_order(&self, id, stock_policy)                             │
//! │       │                                                                 │
//! │       │  SQL (one transaction per multi-row write)                     │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • Easy to test against an in-memory database                          │
//! │  • SQL is isolated in one place                                        │
//! │  • Bookkeeping rules (stock, totals, statuses) can't be bypassed       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`customer::CustomerRepository`] - Customer CRUD
//! - [`supplier::SupplierRepository`] - Supplier CRUD
//! - [`product::ProductRepository`] - Product CRUD and stock adjustments
//! - [`order::OrderRepository`] - Orders, order items, stock bookkeeping
//! - [`invoice::InvoiceRepository`] - Invoices, payments, status derivation
//! - [`user::UserRepository`] - User accounts and authentication

pub mod customer;
pub mod invoice;
pub mod order;
pub mod product;
pub mod supplier;
pub mod user;
