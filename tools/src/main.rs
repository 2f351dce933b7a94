//! custseg-runner: headless batch runner for the segmentation engine.
//!
//! Usage:
//!   custseg-runner --input transactions.json
//!   custseg-runner --input transactions.json --config engine.json --seed 7 --output out.json
//!
//! The input file holds a JSON array of row objects keyed by column name.

use anyhow::{Context, Result};
use custseg_core::{
    config::EngineConfig,
    engine::{SegmentationEngine, SegmentationOutput},
    transaction::RawRecord,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let input = find_arg(&args, "--input")
        .context("missing required --input <file>")?;
    let config_path = find_arg(&args, "--config");
    let output = find_arg(&args, "--output");

    let mut config = match config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    config.seed = parse_arg(&args, "--seed", config.seed);

    println!("custseg-runner");
    println!("  input:   {input}");
    println!("  config:  {}", config_path.unwrap_or("(defaults)"));
    println!("  seed:    {}", config.seed);
    println!("  started: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!();

    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Cannot read {input}"))?;
    let records: Vec<RawRecord> = serde_json::from_str(&content)
        .with_context(|| format!("{input} is not a JSON array of row objects"))?;
    log::info!("runner: loaded {} rows from {input}", records.len());

    let engine = SegmentationEngine::new(config)?;
    let result = engine.run(&records)?;

    print_summary(&result);

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(path, json).with_context(|| format!("Cannot write {path}"))?;
        println!();
        println!("Full output written to {path}");
    }

    Ok(())
}

fn print_summary(out: &SegmentationOutput) {
    let o = &out.overview;
    println!("=== DATASET ===");
    println!("  transactions:   {}", o.total_transactions);
    println!("  customers:      {}", o.unique_customers);
    if let (Some(first), Some(last)) = (o.first_date, o.last_date) {
        println!(
            "  date range:     {} to {}",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        );
    }
    println!("  total revenue:  {:.2}", o.total_revenue);
    println!("  snapshot date:  {}", out.snapshot_date.format("%Y-%m-%d"));

    println!();
    println!("=== RFM SEGMENTS ===");
    for s in &out.segment_summary {
        println!(
            "  {:<20} {:>5} | R {:>6.1} | F {:>6.1} | M {:>10.2} | revenue {:>12.2}",
            s.segment.as_str(),
            s.stats.count,
            s.stats.avg_recency,
            s.stats.avg_frequency,
            s.stats.avg_monetary,
            s.stats.total_revenue
        );
    }

    println!();
    println!("=== CLTV ===");
    let c = &out.cltv_analysis;
    println!("  trimmed at:     {:.2} ({} customers kept)", c.trim_threshold, c.trimmed_count);
    println!("  total CLTV:     {:.2}", c.total_cltv);
    println!("  mean CLTV:      {:.2}", c.mean_cltv);
    println!("  median CLTV:    {:.2}", c.median_cltv);
    println!("  top 20% share:  {:.1}%", c.top_20_share);
    for (tier, count) in &c.tier_counts {
        println!("  {:<14}  {count}", tier.as_str());
    }

    println!();
    println!("=== ELBOW ===");
    for p in &out.elbow {
        println!("  k={:<2} inertia={:.4}", p.k, p.inertia);
    }

    println!();
    println!("=== CLUSTERS (k={}) ===", out.profiles.len());
    for s in &out.cluster_summary {
        println!(
            "  {} {:<20} {:>5} | R {:>6.1} | F {:>6.1} | M {:>10.2} | revenue {:>12.2}",
            s.cluster_id,
            s.cluster_name.as_str(),
            s.stats.count,
            s.stats.avg_recency,
            s.stats.avg_frequency,
            s.stats.avg_monetary,
            s.stats.total_revenue
        );
    }

    println!();
    println!("=== REVENUE BY CLUSTER ===");
    for (id, revenue) in &out.cluster_revenue {
        println!("  {id} {revenue:>12.2}");
    }

    if !out.warnings.is_empty() {
        println!();
        println!("=== WARNINGS ===");
        for w in &out.warnings {
            println!(
                "  {} binning collapsed: {} of {} buckets",
                w.metric, w.effective_bins, w.requested_bins
            );
        }
    }
}

fn find_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
