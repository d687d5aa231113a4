//! # Seed Data Bootstrapper
//!
//! Prepares a database file for development: runs the legacy catalog
//! migration for an account, then first-run seeding.
//!
//! ## Usage
//! ```bash
//! # Bootstrap ./pharmadesk_dev.db for the default account
//! cargo run -p pharmadesk-db --bin seed
//!
//! # Specify database path and account
//! cargo run -p pharmadesk-db --bin seed -- --db ./data/pharmadesk.db --account acct-7
//! ```
//!
//! Running it again is harmless: both procedures are guarded by flags and
//! the second run writes nothing.

use std::env;

use pharmadesk_core::migration::bootstrap;
use pharmadesk_core::{Namespace, SystemClock, UuidIds, DEFAULT_ACCOUNT_ID};
use pharmadesk_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./pharmadesk_dev.db");
    let mut account = String::from(DEFAULT_ACCOUNT_ID);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--account" | "-a" => {
                if i + 1 < args.len() {
                    account = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Pharmadesk Seed Bootstrapper");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: ./pharmadesk_dev.db)");
                println!("  -a, --account <ID>   Account namespace (default: {DEFAULT_ACCOUNT_ID})");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => {
                eprintln!("Ignoring unknown argument: {other}");
            }
        }
        i += 1;
    }

    println!("🌱 Pharmadesk Seed Bootstrapper");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Account:  {}", account);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let mut store = db.load_store().await?;
    println!("✓ Loaded {} entries", store.len());

    let report = bootstrap(&mut store, &Namespace::new(account), &UuidIds, &SystemClock)?;
    let written = db.flush(&mut store).await?;

    println!();
    println!("{}", serde_json::to_string_pretty(&report)?);
    println!();
    println!("✓ Wrote {} entries", written);
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
