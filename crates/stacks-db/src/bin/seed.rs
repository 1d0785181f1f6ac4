//! # Seed Data Generator
//!
//! Populates a database with catalog entries and copies for development.
//!
//! ## Usage
//! ```bash
//! # Catalogue every demo title with 3 copies each (default)
//! cargo run -p stacks-db --bin seed
//!
//! # Custom number of copies per title
//! cargo run -p stacks-db --bin seed -- --copies 5
//!
//! # Specify database path
//! cargo run -p stacks-db --bin seed -- --db ./data/stacks.db
//! ```
//!
//! Set `RUST_LOG=stacks_db=debug` to see every insert.

use std::env;

use stacks_core::CatalogEntry;
use stacks_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

/// (isbn, title, author, year)
const TITLES: &[(&str, &str, &str, i64)] = &[
    ("9780262033848", "Introduction to Algorithms", "Cormen, Leiserson, Rivest, Stein", 2009),
    ("9780201633610", "Design Patterns", "Gamma, Helm, Johnson, Vlissides", 1994),
    ("9780131103627", "The C Programming Language", "Kernighan, Ritchie", 1988),
    ("9781593278281", "The Rust Programming Language", "Klabnik, Nichols", 2018),
    ("9780596007126", "Head First Design Patterns", "Freeman, Robson", 2004),
    ("9780132350884", "Clean Code", "Robert C. Martin", 2008),
    ("9780321573513", "Algorithms", "Sedgewick, Wayne", 2011),
    ("9781449373320", "Designing Data-Intensive Applications", "Martin Kleppmann", 2017),
    ("9780134685991", "Effective Java", "Joshua Bloch", 2018),
    ("9780262510875", "Structure and Interpretation of Computer Programs", "Abelson, Sussman", 1996),
];

/// Shelf locations copies are spread across.
const LOCATIONS: &[&str] = &["Main Hall A", "Main Hall B", "Science Wing", "Reserve Desk"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();

    let mut copies_per_title: usize = 3;
    let mut db_path = String::from("./stacks_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--copies" | "-c" => {
                if i + 1 < args.len() {
                    copies_per_title = args[i + 1].parse().unwrap_or(3);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stacks Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --copies <N>   Copies per title (default: 3)");
                println!("  -d, --db <PATH>    Database file path (default: ./stacks_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Stacks Seed Data Generator");
    println!("==========================");
    println!("Database: {}", db_path);
    println!("Copies per title: {}", copies_per_title);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.catalog().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} titles", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut registered = 0;

    for (idx, (isbn, title, author, year)) in TITLES.iter().enumerate() {
        let entry = CatalogEntry {
            isbn: isbn.to_string(),
            title: title.to_string(),
            author: author.to_string(),
            publisher: None,
            published_year: Some(*year),
        };

        if let Err(e) = db.catalog().insert(&entry).await {
            eprintln!("Failed to insert {}: {}", isbn, e);
            continue;
        }

        for n in 0..copies_per_title {
            let location = LOCATIONS[(idx + n) % LOCATIONS.len()];
            db.copies().register(isbn, location).await?;
            registered += 1;
        }
    }

    println!();
    println!(
        "✓ Catalogued {} titles with {} copies in {:?}",
        TITLES.len(),
        registered,
        start.elapsed()
    );

    let (isbn, title, _, _) = TITLES[0];
    let counts = db.copies().counts_by_isbn(isbn).await?;
    println!(
        "  {}: total={} available={} reserved={}",
        title, counts.total, counts.available, counts.reserved
    );

    db.close().await;
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
