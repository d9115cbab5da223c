//! # Cart Inspector
//!
//! Lists, shows and purges persisted carts in a local store database.
//!
//! ## Usage
//! ```bash
//! # List every persisted cart with its owner, age and freshness
//! cargo run -p animart-db --bin cart-inspect -- list
//!
//! # Print one envelope
//! cargo run -p animart-db --bin cart-inspect -- show cart_guest
//!
//! # Delete carts outside the freshness window (default 24h)
//! cargo run -p animart-db --bin cart-inspect -- purge --hours 12
//!
//! # Specify database path
//! cargo run -p animart-db --bin cart-inspect -- --db ./data/animart.db list
//! ```

use chrono::Utc;
use std::env;
use tracing_subscriber::EnvFilter;

use animart_core::persistence::{
    FreshnessWindow, PersistedCart, CART_KEY_PREFIX, DEFAULT_FRESHNESS_HOURS,
    MAX_FRESHNESS_HOURS,
};
use animart_db::{Database, DbConfig};

enum Command {
    List,
    Show(String),
    Purge,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./animart.db");
    let mut hours = DEFAULT_FRESHNESS_HOURS;
    let mut command = Command::List;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--hours" => {
                if i + 1 < args.len() {
                    match parse_hours(&args[i + 1]) {
                        Ok(h) => hours = h,
                        Err(e) => {
                            eprintln!("{}", e);
                            std::process::exit(2);
                        }
                    }
                    i += 1;
                }
            }
            "list" => command = Command::List,
            "purge" => command = Command::Purge,
            "show" => {
                if i + 1 < args.len() {
                    command = Command::Show(args[i + 1].clone());
                    i += 1;
                } else {
                    eprintln!("show needs a key, e.g. `show cart_guest`");
                    return Ok(());
                }
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_help();
                return Ok(());
            }
        }
        i += 1;
    }

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let storage = db.local_storage();
    let window = FreshnessWindow::from_hours(hours);
    let now = Utc::now();

    match command {
        Command::List => {
            let entries = storage.entries_with_prefix(CART_KEY_PREFIX).await?;
            if entries.is_empty() {
                println!("No persisted carts in {}", db_path);
            }
            for entry in entries {
                match PersistedCart::from_json(&entry.value) {
                    Ok(saved) => {
                        let status = if window.is_fresh(&saved, now) {
                            "fresh"
                        } else {
                            "stale"
                        };
                        let quantity: u64 =
                            saved.cart.iter().map(|item| u64::from(item.quantity)).sum();
                        println!(
                            "{:<24} user={:<16} lines={:<3} qty={:<4} age={}m {}",
                            entry.key,
                            saved.user_id.as_deref().unwrap_or("-"),
                            saved.cart.len(),
                            quantity,
                            saved.age_ms(now) / 60_000,
                            status
                        );
                    }
                    Err(e) => println!("{:<24} corrupt ({})", entry.key, e),
                }
            }
        }
        Command::Show(key) => match storage.get_item(&key).await? {
            Some(raw) => println!("{}", raw),
            None => println!("{} not found", key),
        },
        Command::Purge => {
            let mut removed = 0;
            for entry in storage.entries_with_prefix(CART_KEY_PREFIX).await? {
                let keep = PersistedCart::from_json(&entry.value)
                    .map(|saved| window.is_fresh(&saved, now))
                    .unwrap_or(false);
                if !keep && storage.remove_item(&entry.key).await? {
                    removed += 1;
                }
            }
            println!("Removed {} stale or corrupt cart(s)", removed);
        }
    }

    db.close().await;
    Ok(())
}

/// Parses `--hours`. A window below one hour would purge every cart.
fn parse_hours(raw: &str) -> Result<i64, String> {
    let hours: i64 = raw
        .parse()
        .map_err(|_| format!("--hours expects a whole number, got: {}", raw))?;

    if !(1..=MAX_FRESHNESS_HOURS).contains(&hours) {
        return Err(format!(
            "--hours must be between 1 and {}, got: {}",
            MAX_FRESHNESS_HOURS, hours
        ));
    }

    Ok(hours)
}

fn print_help() {
    println!("Animart Cart Inspector");
    println!();
    println!("Usage: cart-inspect [OPTIONS] <list | show <KEY> | purge>");
    println!();
    println!("Options:");
    println!("  -d, --db <PATH>    Database file path (default: ./animart.db)");
    println!("      --hours <N>    Freshness window in hours (default: 24)");
    println!("  -h, --help         Show this help message");
}
