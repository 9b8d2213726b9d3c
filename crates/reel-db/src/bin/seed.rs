//! # Seed Data Generator
//!
//! Populates the database with a development catalog.
//!
//! ## Usage
//! ```bash
//! # Two copies per title and format (default)
//! cargo run -p reel-db --bin seed
//!
//! # More copies
//! cargo run -p reel-db --bin seed -- --copies 5
//!
//! # Specify database path
//! cargo run -p reel-db --bin seed -- --db ./data/reel.db
//! ```
//!
//! ## Generated Catalog
//! - Four formats: VHS, DVD, Blu-Ray, HD-DVD
//! - A set of well-known titles across genres
//! - N copies of every title in each format it was released on,
//!   barcoded `{FMT}-{TITLE}-{NN}`, with purchase dates a week apart
//!
//! Rental policy comes from the usual `REEL_*` environment variables.

use std::env;
use std::path::PathBuf;

use chrono::{Duration, Utc};
use serde_json::json;
use tracing::{info, warn};

use reel_core::MediaCopy;
use reel_db::repository::catalog::new_title;
use reel_db::{init_tracing, Database, StoreConfig};

/// (name, daily price in cents)
const FORMATS: &[(&str, i64)] = &[("VHS", 100), ("DVD", 200), ("Blu-Ray", 300), ("HD-DVD", 250)];

/// (name, genre, director, year, minutes, rating)
const TITLES: &[(&str, &str, &str, i64, i64, f64)] = &[
    ("Alien", "Horror", "Ridley Scott", 1979, 117, 8.5),
    ("Blade Runner", "Sci-Fi", "Ridley Scott", 1982, 117, 8.1),
    ("Heat", "Crime", "Michael Mann", 1995, 170, 8.3),
    ("The Thing", "Horror", "John Carpenter", 1982, 109, 8.2),
    ("Stalker", "Drama", "Andrei Tarkovsky", 1979, 162, 8.0),
    ("Solaris", "Sci-Fi", "Andrei Tarkovsky", 1972, 167, 7.9),
    ("Groundhog Day", "Comedy", "Harold Ramis", 1993, 101, 8.0),
    ("The Big Lebowski", "Comedy", "Joel Coen", 1998, 117, 8.1),
    ("Fargo", "Crime", "Joel Coen", 1996, 98, 8.1),
    ("Spirited Away", "Animation", "Hayao Miyazaki", 2001, 125, 8.6),
    ("Princess Mononoke", "Animation", "Hayao Miyazaki", 1997, 134, 8.3),
    ("The Matrix", "Sci-Fi", "Lana Wachowski", 1999, 136, 8.7),
    ("Jaws", "Thriller", "Steven Spielberg", 1975, 124, 8.1),
    ("Die Hard", "Action", "John McTiernan", 1988, 132, 8.2),
    ("Casablanca", "Drama", "Michael Curtiz", 1942, 102, 8.5),
    ("Seven Samurai", "Action", "Akira Kurosawa", 1954, 207, 8.6),
];

/// Command line options.
#[derive(Debug, PartialEq)]
struct SeedArgs {
    copies_per_format: usize,
    db_path: Option<PathBuf>,
    help: bool,
}

fn parse_args(args: &[String]) -> Result<SeedArgs, String> {
    let mut parsed = SeedArgs {
        copies_per_format: 2,
        db_path: None,
        help: false,
    };

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--copies" | "-c" => {
                let value = iter.next().ok_or("--copies needs a value")?;
                parsed.copies_per_format = value
                    .parse()
                    .map_err(|_| format!("--copies expects a whole number, got {value:?}"))?;
            }
            "--db" | "-d" => {
                let value = iter.next().ok_or("--db needs a path")?;
                parsed.db_path = Some(PathBuf::from(value));
            }
            "--help" | "-h" => parsed.help = true,
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
    }

    Ok(parsed)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let args = parse_args(&args)?;
    if args.help {
        println!("Reel Rental Seed Data Generator");
        println!();
        println!("Usage: seed [OPTIONS]");
        println!();
        println!("Options:");
        println!("  -c, --copies <N>   Copies per title and format (default: 2)");
        println!("  -d, --db <PATH>    Database file path (default: $REEL_DB_PATH or ./reel.db)");
        println!("  -h, --help         Show this help message");
        return Ok(());
    }

    let config = StoreConfig::from_env()?;
    let copies_per_format = args.copies_per_format;
    let db_path = args.db_path.unwrap_or_else(|| config.database_path.clone());

    info!(path = %db_path.display(), copies_per_format, "Seeding catalog");

    let db_config = StoreConfig {
        database_path: db_path.clone(),
        ..config.clone()
    }
    .db_config();
    let db = Database::new(db_config).await?.with_policy(config.policy);

    let existing = db.catalog().count_titles().await?;
    if existing > 0 {
        warn!(existing, "Database already has titles, skipping seed");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let now = Utc::now();

    let mut formats = Vec::with_capacity(FORMATS.len());
    for (name, price) in FORMATS {
        formats.push(db.catalog().insert_format(name, *price).await?);
    }

    let mut copies = 0usize;
    for (title_idx, (name, genre, director, year, minutes, rating)) in TITLES.iter().enumerate() {
        let mut title = new_title(name, genre, director, *year);
        title.duration_minutes = Some(*minutes);
        title.rating = Some(*rating);
        title.description = Some(format!("{name} ({year}), directed by {director}."));
        db.catalog().insert_title(&title).await?;

        for format in &formats {
            // VHS stops in 2006; HD-DVD only for every fourth title
            let released = match format.name.as_str() {
                "VHS" => *year < 2006,
                "HD-DVD" => title_idx % 4 == 0,
                _ => true,
            };
            if !released {
                continue;
            }

            let code: String = format.name.chars().filter(char::is_ascii_alphanumeric).collect();
            for n in 1..=copies_per_format {
                let barcode = format!("{}-{:03}-{:02}", code.to_uppercase(), title_idx + 1, n);
                // later titles in the list arrived more recently
                let bought = now - Duration::days(((TITLES.len() - title_idx) * 7 + n) as i64);
                let copy = MediaCopy::new(&title.id, &format.id, Some(&barcode), "Good")
                    .acquired(bought, Some(format.daily_price_cents * 10));
                db.catalog().add_copy(&copy).await?;
                copies += 1;
            }
        }
    }

    let elapsed = start.elapsed();
    let discrepancies = db.inventory().audit().await?;
    let genres = db.catalog().genres().await?;
    let stats = db.catalog().stats().await?;

    let summary = json!({
        "database": db_path.display().to_string(),
        "formats": formats.len(),
        "titles": TITLES.len(),
        "copies": copies,
        "available_copies": stats.available_copies,
        "genres": genres,
        "audit_discrepancies": discrepancies.len(),
        "elapsed_ms": elapsed.as_millis() as u64,
    });

    info!("Seed complete");
    println!("{}", serde_json::to_string_pretty(&summary)?);

    db.close().await;
    Ok(())
}
