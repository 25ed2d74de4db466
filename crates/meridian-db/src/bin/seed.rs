//! # Seed Data Generator
//!
//! Populates a development database with a small, connected business
//! graph: suppliers, products, customers, one worked order, and an
//! invoice with a partial payment against it.
//!
//! ## Usage
//! ```bash
//! # Seed the default development database
//! cargo run -p meridian-db --bin seed
//!
//! # Specify database path
//! cargo run -p meridian-db --bin seed -- --db ./data/meridian.db
//! ```
//!
//! The seed is skipped when the database already holds data, so it is
//! safe to run on every start of a development session. It also creates
//! the default admin account when no users exist.

use std::env;

use chrono::{Duration, Utc};
use tracing_subscriber::EnvFilter;

use meridian_core::{
    NewCustomer, NewInvoice, NewOrder, NewOrderItem, NewPayment, NewProduct, NewSupplier,
    OrderStatus, PaymentMethod,
};
use meridian_db::{Database, DbConfig};

/// Suppliers, each with the products they provide:
/// (code, name, [(product code, product name, category, price cents, stock)])
const SUPPLIERS: &[(&str, &str, &[(&str, &str, &str, i64, i64)])] = &[
    (
        "SUP-NW",
        "Northwind Supply Co",
        &[
            ("HW-0001", "Cordless Drill 18V", "Hardware", 8999, 24),
            ("HW-0002", "Socket Wrench Set", "Hardware", 4550, 40),
            ("HW-0003", "Work Gloves Pair", "Hardware", 1299, 120),
        ],
    ),
    (
        "SUP-PT",
        "Pacific Traders",
        &[
            ("OF-0001", "A4 Paper Ream", "Office", 699, 300),
            ("OF-0002", "Laser Toner Cartridge", "Office", 5400, 35),
            ("OF-0003", "Desk Organizer", "Office", 2150, 18),
        ],
    ),
];

/// Customers: (code, name, email)
const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("CUST-0001", "Acme Construction Ltd", "purchasing@acme-construction.example"),
    ("CUST-0002", "Harbor Light Offices", "admin@harborlight.example"),
    ("CUST-0003", "Stonebridge Workshop", "orders@stonebridge.example"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./meridian_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Meridian Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./meridian_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    init_tracing();

    println!("🌱 Meridian Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing data
    let existing = db.products().count().await? + db.customers().count().await?;
    if existing > 0 {
        println!("⚠ Database already has data ({} rows)", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Seeding suppliers and products...");

    let mut product_ids = Vec::new();
    for (code, name, products) in SUPPLIERS {
        let supplier = db
            .suppliers()
            .create(NewSupplier {
                code: (*code).to_string(),
                name: (*name).to_string(),
                contact_name: None,
                email: None,
                phone: None,
                address: None,
            })
            .await?;

        for (product_code, product_name, category, price_cents, stock) in *products {
            let product = db
                .products()
                .create(NewProduct {
                    code: (*product_code).to_string(),
                    name: (*product_name).to_string(),
                    description: None,
                    price_cents: *price_cents,
                    stock_quantity: *stock,
                    category: Some((*category).to_string()),
                    supplier_id: Some(supplier.id),
                })
                .await?;
            product_ids.push(product.id);
        }
    }
    println!("  {} suppliers, {} products", SUPPLIERS.len(), product_ids.len());

    println!("Seeding customers...");
    let mut customer_ids = Vec::new();
    for (code, name, email) in CUSTOMERS {
        let customer = db
            .customers()
            .create(NewCustomer {
                code: (*code).to_string(),
                name: (*name).to_string(),
                email: Some((*email).to_string()),
                phone: None,
                address: None,
            })
            .await?;
        customer_ids.push(customer.id);
    }
    println!("  {} customers", customer_ids.len());

    // One worked order: drill + gloves for the construction company.
    println!("Seeding a worked order...");
    let order = db
        .orders()
        .create_order(NewOrder {
            code: "ORD-0001".to_string(),
            customer_id: customer_ids[0],
            ordered_at: Utc::now() - Duration::days(10),
            status: OrderStatus::Shipped,
            payment_method: PaymentMethod::BankTransfer,
            items: vec![
                NewOrderItem {
                    product_id: product_ids[0],
                    quantity: 2,
                    unit_price_cents: 8999,
                },
                NewOrderItem {
                    product_id: product_ids[2],
                    quantity: 10,
                    unit_price_cents: 1299,
                },
            ],
        })
        .await?;
    println!("  {} ({})", order.code, order.total());

    // Invoice the order, half of it already paid.
    let invoice = db
        .invoices()
        .create_invoice(NewInvoice {
            number: None,
            order_id: order.id,
            issued_on: Utc::now().date_naive() - Duration::days(9),
            due_on: Utc::now().date_naive() + Duration::days(21),
            amount_cents: order.total_cents,
        })
        .await?;
    db.invoices()
        .add_payment(
            invoice.id,
            NewPayment {
                reference: None,
                amount_cents: order.total_cents / 2,
                paid_on: Utc::now().date_naive() - Duration::days(3),
                method: PaymentMethod::BankTransfer,
            },
        )
        .await?;
    println!("  {} invoiced, half paid", invoice.number);

    // First-run admin account
    if db.users().ensure_default_admin().await? {
        println!("  Default admin account created (change its password)");
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=meridian_db=trace` - Show trace for the data layer only
/// - Default: INFO level, sqlx statement noise suppressed
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,meridian_db=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
