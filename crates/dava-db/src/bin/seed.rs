//! # Seed Data Generator
//!
//! Populates the database with a development formulary: medicines across
//! all four drug schedules, each with a couple of batches at staggered
//! expiry dates (so FIFO allocation and expiry alerts have something to
//! chew on).
//!
//! ## Usage
//! ```bash
//! cargo run -p dava-db --bin seed
//!
//! # Specify database path
//! cargo run -p dava-db --bin seed -- --db ./data/pharmacy.db
//! ```

use chrono::{Duration, Utc};
use std::env;
use uuid::Uuid;

use dava_core::{Batch, Medicine, Schedule};
use dava_db::{Database, DbConfig};

/// Development formulary: (name, generic, manufacturer, schedule, MRP paise,
/// reorder level).
const FORMULARY: &[(&str, &str, &str, Schedule, i64, i64)] = &[
    ("Paracetamol 500mg", "Acetaminophen", "Cipla", Schedule::Otc, 2000, 50),
    ("Cetirizine 10mg", "Cetirizine HCl", "Dr. Reddy's", Schedule::Otc, 3500, 30),
    ("ORS Powder", "Oral Rehydration Salts", "FDC", Schedule::Otc, 1800, 40),
    ("Amoxicillin 500mg", "Amoxicillin", "Cipla", Schedule::H, 9500, 25),
    ("Azithromycin 500mg", "Azithromycin", "Sun Pharma", Schedule::H, 11500, 20),
    ("Metformin 500mg", "Metformin HCl", "USV", Schedule::H, 4200, 40),
    ("Amlodipine 5mg", "Amlodipine Besylate", "Lupin", Schedule::H, 3800, 30),
    ("Tramadol 50mg", "Tramadol HCl", "Sun Pharma", Schedule::H1, 8900, 15),
    ("Cefixime 200mg", "Cefixime", "Lupin", Schedule::H1, 12500, 15),
    ("Alprazolam 0.5mg", "Alprazolam", "Torrent", Schedule::X, 6500, 10),
    ("Zolpidem 10mg", "Zolpidem Tartrate", "Mankind", Schedule::X, 9800, 10),
];

/// Batch layout per medicine: (expiry offset in days, quantity).
/// One lot expiring soon, one comfortably out.
const BATCH_PLAN: &[(i64, i64)] = &[(60, 40), (365, 120)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./dava_dev.db");

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
                println!("Dava POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./dava_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Dava POS Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("Connected, migrations applied");

    let existing = db.medicines().count().await?;
    if existing > 0 {
        println!("Database already has {existing} medicines; skipping seed.");
        println!("Delete the database file to regenerate.");
        return Ok(());
    }

    let now = Utc::now();
    let today = now.date_naive();
    let mut medicines = 0usize;
    let mut batches = 0usize;

    for (name, generic, manufacturer, schedule, mrp_paise, reorder_level) in FORMULARY {
        let medicine = Medicine {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            generic_name: generic.to_string(),
            manufacturer: manufacturer.to_string(),
            schedule: *schedule,
            hsn_code: "30049099".to_string(),
            unit_price_paise: *mrp_paise,
            reorder_level: *reorder_level,
            description: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        db.medicines().insert(&medicine).await?;
        medicines += 1;

        for (batch_idx, (expiry_days, quantity)) in BATCH_PLAN.iter().enumerate() {
            let batch = Batch {
                id: Uuid::new_v4().to_string(),
                medicine_id: medicine.id.clone(),
                batch_number: format!("{}-{:02}", &medicine.id[..8].to_uppercase(), batch_idx + 1),
                manufacture_date: today - Duration::days(180),
                expiry_date: today + Duration::days(*expiry_days),
                quantity: *quantity,
                mrp_paise: *mrp_paise,
                cost_price_paise: (*mrp_paise * 70) / 100,
                is_active: true,
                created_at: now,
                updated_at: now,
            };

            db.batches().insert(&batch).await?;
            batches += 1;
        }
    }

    println!();
    println!("Seeded {medicines} medicines with {batches} batches");
    println!("Seed complete!");

    Ok(())
}
