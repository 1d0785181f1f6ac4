//! # Stacks Admin
//!
//! Operator commands against a circulation database.
//!
//! ## Usage
//! ```bash
//! # Flip every loan past its due date to OVERDUE
//! cargo run -p stacks-engine --bin stacks-admin -- sweep
//!
//! # Copy counters (shelf, holds, loans, withdrawals) for one or more titles
//! cargo run -p stacks-engine --bin stacks-admin -- counts 9780262033848 9780201633610
//!
//! # Reservation queue for a title, as JSON
//! cargo run -p stacks-engine --bin stacks-admin -- queue 9780262033848 --json
//!
//! # Release an unclaimed hold
//! cargo run -p stacks-engine --bin stacks-admin -- release <COPY_ID>
//! ```
//!
//! Configuration is read from `--config <PATH>` or the default location;
//! `STACKS_*` environment variables override it.

use std::env;
use std::path::PathBuf;

use stacks_core::{CopyStatus, ReturnOutcome};
use stacks_engine::{CirculationCoordinator, EngineConfig};
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!("Stacks Admin");
    println!();
    println!("Usage: stacks-admin [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("Commands:");
    println!("  sweep              Mark overdue loans");
    println!("  counts <ISBN>...   Show copy counters");
    println!("  queue <ISBN>       Show the reservation queue");
    println!("  release <COPY_ID>  Release an unclaimed hold");
    println!();
    println!("Options:");
    println!("  --config <PATH>    Config file (default: platform config dir)");
    println!("  --json             Print results as JSON");
    println!("  -h, --help         Show this help message");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();

    let mut config_path: Option<PathBuf> = None;
    let mut json = false;
    let mut positional: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--json" => json = true,
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let Some((command, rest)) = positional.split_first() else {
        print_help();
        return Ok(());
    };

    let config = EngineConfig::load(config_path)?;
    println!("Database: {}", config.database_path().display());
    let engine = CirculationCoordinator::from_config(&config).await?;

    match command.as_str() {
        "sweep" => {
            let marked = engine.mark_overdue().await?;
            println!("Marked {} loan(s) overdue as of {}", marked, engine.today());
        }
        "counts" => {
            if rest.is_empty() {
                eprintln!("counts: at least one ISBN is required");
                std::process::exit(2);
            }
            let db = engine.database();
            for isbn in rest {
                let summary = engine.get_catalog_entry(isbn).await?;
                let on_loan = db.borrows().count_open_for_isbn(isbn).await?;
                let damaged = db.copies().count_with_status(isbn, CopyStatus::Damaged).await?;
                let lost = db.copies().count_with_status(isbn, CopyStatus::Lost).await?;
                if json {
                    let report = serde_json::json!({
                        "summary": summary,
                        "on_loan": on_loan,
                        "damaged": damaged,
                        "lost": lost,
                    });
                    println!("{}", serde_json::to_string(&report)?);
                } else {
                    println!(
                        "{}  {:<40}  total {:>3}  available {:>3}  reserved {:>3}  on loan {:>3}  \
                         damaged {:>3}  lost {:>3}  queued {:>3}",
                        summary.entry.isbn,
                        summary.entry.title,
                        summary.counts.total,
                        summary.counts.available,
                        summary.counts.reserved,
                        on_loan,
                        damaged,
                        lost,
                        summary.queue_length
                    );
                }
            }
        }
        "queue" => {
            let Some(isbn) = rest.first() else {
                eprintln!("queue: an ISBN is required");
                std::process::exit(2);
            };
            let queue = engine.list_queue(isbn).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&queue)?);
            } else if queue.is_empty() {
                println!("No one is waiting for {}", isbn);
            } else {
                for reservation in &queue {
                    println!(
                        "{:>3}. {}  (reserved {}, id {})",
                        reservation.queue_position,
                        reservation.user_id,
                        reservation.reserve_date,
                        reservation.reservation_id
                    );
                }
            }
        }
        "release" => {
            let Some(copy_id) = rest.first() else {
                eprintln!("release: a copy id is required");
                std::process::exit(2);
            };
            match engine.release_hold(copy_id).await? {
                ReturnOutcome::HeldForReservation {
                    reservation_id,
                    user_id,
                    ..
                } => println!("Copy {} now held for {} ({})", copy_id, user_id, reservation_id),
                ReturnOutcome::Restocked { counts } => println!(
                    "Copy {} back on the shelf ({} available)",
                    copy_id, counts.available
                ),
            }
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_help();
            std::process::exit(2);
        }
    }

    engine.database().close().await;
    Ok(())
}
