//! # Demo Cart Seeder
//!
//! Fills the guest cart with a handful of demo products for development.
//!
//! ## Usage
//! ```bash
//! # Seed the cart in the configured (or platform default) database
//! cargo run -p tote-store --bin seed-cart
//!
//! # Specify database path
//! cargo run -p tote-store --bin seed-cart -- --db ./data/tote.db
//!
//! # Seed, then run the simulated account sync
//! cargo run -p tote-store --bin seed-cart -- --sync demo-session
//! ```
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages
//! - Default: `info,tote=debug,sqlx=warn`

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tote_core::{Money, Product, SessionToken};
use tote_db::Database;
use tote_store::{CartStore, StoreConfig};
use tracing_subscriber::EnvFilter;

/// Demo products: (id, name, price in cents, quantity)
const DEMO_PRODUCTS: &[(&str, &str, i64, i64)] = &[
    ("SKU-COFFEE-250", "Ground Coffee 250g", 1099, 2),
    ("SKU-MUG-WHT", "Ceramic Mug (White)", 850, 1),
    ("SKU-FILTER-100", "Paper Filters x100", 399, 3),
    ("SKU-GRINDER", "Hand Grinder", 3450, 1),
];

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tote=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_help() {
    println!("Tote Demo Cart Seeder");
    println!();
    println!("Usage: seed-cart [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -d, --db <PATH>       Database file path (default: from config)");
    println!("  -c, --config <PATH>   Config file path (default: platform config dir)");
    println!("  -s, --sync <TOKEN>    Sync the seeded cart with this session token");
    println!("  -h, --help            Show this help message");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut sync_token: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--sync" | "-s" => {
                if i + 1 < args.len() {
                    sync_token = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    init_tracing();

    let mut config = StoreConfig::load_or_default(config_path);
    if db_path.is_some() {
        config.storage.database_path = db_path;
    }

    let db_config = config.db_config()?;
    if let Some(parent) = db_config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    println!("Tote Demo Cart Seeder");
    println!("=====================");
    println!("Database:  {}", db_config.database_path.display());
    println!("Namespace: {}", config.storage.namespace);
    println!("Sync mode: {}", config.sync.mode);
    println!();

    let db = Database::new(db_config).await?;
    println!("✓ Connected to database");

    let store = CartStore::from_config(Arc::new(db.kv()), &config);
    store.initialize().await;

    for (id, name, cents, quantity) in DEMO_PRODUCTS {
        let product = Product::new(*id, *name, Money::from_cents(*cents));
        let cart = store.add_item(&product, *quantity).await?;
        println!(
            "  + {} x{:<3} {:>10}   cart: {} items, {}",
            name,
            quantity,
            Money::from_cents(*cents),
            cart.item_count(),
            cart.total()
        );
    }

    let cart = store.get_cart().await?;
    println!();
    println!(
        "✓ Cart holds {} lines, {} items, total {}",
        cart.line_count(),
        cart.item_count(),
        cart.total()
    );

    if let Some(raw) = sync_token {
        let token = SessionToken::new(raw)?;
        println!();
        println!("Syncing with user account...");
        let outcome = store.sync_with_retry(&token, config.retry_policy()).await?;
        println!("✓ Synced {} items", outcome.synced_items);
    }

    db.close().await;
    Ok(())
}
