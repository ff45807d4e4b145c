mod cli;
mod config;
mod crawler;
mod database;
mod error;
mod extractor;
mod fetcher;
mod geocoder;
mod listing;
mod output;
mod progress;
mod salary;

use chrono::Local;
use cli::{parse_args, Args};
use colored::*;
use config::{Config, OutputTarget};
use crawler::Crawler;
use database::Database;
use error::Result;
use fetcher::Fetcher;
use geocoder::{Enricher, GoogleGeocoder};
use output::{write_report, Report};
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = parse_args();
    init_tracing(args.verbose);

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.category().message().red());
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins; otherwise `-v` raises this crate's level while HTTP
/// internals stay at warn.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("jobscrape={},reqwest=warn,hyper=warn", level))
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(args: &Args) -> Result<()> {
    let config = Config::from_args(args)?;

    println!("jobscrape v0.1.0");
    println!("==========================");
    println!("What: {}", config.what);
    println!("Where: {}", config.location);
    println!("Site: {}", config.base_url);
    println!("Geocoding: {}", config.geocoder.is_some());
    match &config.output {
        OutputTarget::Json { dir } => println!("Output: JSON in {}", dir.display()),
        OutputTarget::Sqlite { path } => println!("Output: SQLite at {}", path.display()),
    }
    println!();

    let started = Local::now();
    let timer = Instant::now();

    let fetcher = Fetcher::new(config.request_timeout, config.retry)?;
    let mut listings = Crawler::new(&fetcher, &config).run().await?;

    if listings.is_empty() {
        println!(
            "{}",
            "No jobs found. Try searching for a more general 'what' or a more specific 'where'."
                .yellow()
        );
        return Ok(());
    }
    println!("{}", format!("Scraped {} vacancies", listings.len()).green());

    if let Some(settings) = &config.geocoder {
        let geocoder = GoogleGeocoder::new(fetcher.client().clone(), settings.clone(), config.retry);
        let stats = Enricher::new(&geocoder, settings.delay)
            .enrich(&mut listings, &config.location)
            .await?;
        println!(
            "{}",
            format!(
                "Geocoded: {} by company, {} by location, {} by region, {} unresolved",
                stats.by_company, stats.by_location, stats.by_region, stats.unresolved
            )
            .green()
        );
    }

    let count = listings.len();
    match &config.output {
        OutputTarget::Json { dir } => {
            let report = Report::new(&config.what, &config.location, started, listings);
            let path = write_report(&report, dir, started)?;
            println!(
                "{}",
                format!("Success! {} vacancies written to {}", count, path.display()).green()
            );
        }
        OutputTarget::Sqlite { path } => {
            let mut db = Database::new(path)?;
            let table = db.create_listing_table(&config.what, &config.location)?;
            db.insert_listings(&table, &listings)?;
            println!(
                "{}",
                format!(
                    "Success! Table {} created with {} vacancies in {}",
                    table,
                    db.count_rows(&table)?,
                    path.display()
                )
                .green()
            );
        }
    }

    println!("Time elapsed: {:.2}s", timer.elapsed().as_secs_f64());
    Ok(())
}
