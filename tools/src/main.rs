//! datagen: headless dataset generator for StockRadar churn analysis.
//!
//! Usage:
//!   datagen
//!   datagen --db data/processed/stockradar.db --out data/raw
//!   datagen --json
//!
//! Generation itself is fixed by SimConfig::default(); the flags only
//! choose where the output goes and how the summary is printed.
//! The CSV files are written before the database is rebuilt, so a failed
//! export leaves the previous run's tables in place.

use anyhow::{Context, Result};
use std::{env, fs, path::Path};
use stockradar_core::{
    config::SimConfig,
    dataset::RunSummary,
    engine::SimEngine,
    export::CsvExporter,
    store::{SimStore, Table},
};

const DEFAULT_DB: &str = "data/processed/stockradar.db";
const DEFAULT_OUT: &str = "data/raw";

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = parse_arg(&args, "--db").unwrap_or(DEFAULT_DB);
    let out = parse_arg(&args, "--out").unwrap_or(DEFAULT_OUT);
    let json = args.iter().any(|a| a == "--json");

    let config = SimConfig::default();
    let cliff = config.churn.cliff;
    let merchant_count = config.merchant_count;
    if !json {
        println!("StockRadar: dataset generator");
        println!("  seed:       {}", config.seed);
        println!("  merchants:  {merchant_count}");
        println!("  installs:   {}..={}", config.install_start, config.install_end);
        println!("  db:         {db}");
        println!("  out:        {out}");
        println!();
    }

    let engine = SimEngine::new(config).context("invalid configuration")?;
    let dataset = engine.run();

    if let Some(parent) = Path::new(db).parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut store = SimStore::open(db).with_context(|| format!("opening {db}"))?;
    store
        .publish(&dataset, &CsvExporter::new(out))
        .with_context(|| format!("writing dataset to {out} and {db}"))?;

    log::info!("dataset written to {db} and {out}");

    let summary = dataset.summary(cliff);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&store, &summary)?;
        println!();
        println!("Success! Generated data for {merchant_count} merchants.");
    }
    Ok(())
}

fn print_summary(store: &SimStore, summary: &RunSummary) -> Result<()> {
    println!("=== ROW COUNTS ===");
    for table in Table::ALL {
        println!("  {:<28} {}", table.name(), store.row_count(table)?);
    }

    for table in Table::ALL.into_iter().filter(Table::has_event_type) {
        println!();
        println!("=== TOP EVENT TYPES: {} ===", table.name());
        for (event_type, n) in store.event_type_counts(table)?.into_iter().take(10) {
            println!("  {event_type:<28} {n}");
        }
    }

    println!();
    println!("=== CHURN ===");
    println!("  pro merchants:      {}", summary.pro_merchants);
    println!("  churned:            {}", summary.churned_merchants);
    println!("  churn rate:         {:.1}%", summary.churn_rate * 100.0);
    println!("  cliff share:        {:.1}%", summary.cliff_share * 100.0);
    println!("  rows after cancel:  {}", store.rows_after_cancel()?);

    println!();
    println!("=== SIGNALS BY LABEL (pro only) ===");
    println!("  {:<10} {:>8} {:>12} {:>12}", "label", "n", "fail_rate", "roi_ratio");
    for (label, stats) in [("churned", &summary.churned), ("retained", &summary.retained)] {
        println!(
            "  {:<10} {:>8} {:>12.4} {:>12.2}",
            label, stats.merchants, stats.mean_fail_rate, stats.mean_roi_ratio
        );
    }
    Ok(())
}

fn parse_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
