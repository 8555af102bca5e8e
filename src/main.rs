//! Module-Scout main entry point
//!
//! This is the command-line interface for the Module-Scout documentation
//! outliner.

use anyhow::{bail, Context};
use clap::Parser;
use module_scout::config::{load_config_with_hash, Config};
use module_scout::url::normalize_all;
use module_scout::{Pipeline, RunOptions, RunReport};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Module-Scout: documentation site outliner
///
/// Module-Scout crawls a documentation site from one or more seed URLs,
/// extracts the readable content of each page, and infers a
/// module/submodule outline, printed as JSON.
#[derive(Parser, Debug)]
#[command(name = "module-scout")]
#[command(version)]
#[command(about = "A documentation site outliner", long_about = None)]
struct Cli {
    /// Seed URLs (scheme optional, https assumed)
    #[arg(value_name = "URLS", required = true)]
    urls: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum link hops from each seed
    #[arg(long, value_name = "N")]
    depth: Option<u32>,

    /// Maximum pages fetched per seed
    #[arg(long, value_name = "N")]
    pages: Option<u32>,

    /// Character budget for each page's extracted text
    #[arg(long, value_name = "N")]
    chars: Option<usize>,

    /// Write the JSON result to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print the crawl log and chosen strategy to stderr
    #[arg(long)]
    show_log: bool,

    /// Validate config and seeds, show what would be crawled, and exit
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    let mut options = RunOptions::from_config(&config);
    if let Some(depth) = cli.depth {
        options.max_depth = depth;
    }
    if let Some(pages) = cli.pages {
        options.max_pages = pages;
    }
    if let Some(chars) = cli.chars {
        options.chars_per_page = chars;
    }

    if cli.dry_run {
        return handle_dry_run(&config, &cli.urls, &options);
    }

    let pipeline = Pipeline::new(config);
    let report = pipeline.run(&cli.urls, options).await?;

    if cli.show_log {
        print_log(&report);
    }

    let json = serde_json::to_string_pretty(&render(&report)?)?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", json))
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!("Result written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so stdout carries only the JSON result.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("module_scout=info,warn"),
            1 => EnvFilter::new("module_scout=debug,info"),
            2 => EnvFilter::new("module_scout=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// One seed: the module array. Several seeds: an object keyed by seed URL.
fn render(report: &RunReport) -> anyhow::Result<Value> {
    if let [only] = report.seeds.as_slice() {
        return Ok(only.extraction.to_value()?);
    }

    let mut by_seed = Map::new();
    for seed in &report.seeds {
        by_seed.insert(seed.seed.to_string(), seed.extraction.to_value()?);
    }
    Ok(Value::Object(by_seed))
}

fn print_log(report: &RunReport) {
    for rejected in &report.invalid {
        eprintln!("invalid seed {}", rejected);
    }

    for seed in &report.seeds {
        eprintln!("== {} ==", seed.seed);
        eprintln!(
            "pages fetched: {} ({} without content)",
            seed.pages_fetched, seed.pages_without_content
        );
        for entry in &seed.crawl_log {
            eprintln!(
                "  [{:?}] depth {} {}: {}{}",
                entry.state,
                entry.depth,
                entry.url,
                entry.reason,
                if entry.retries > 0 {
                    format!(" ({} retries)", entry.retries)
                } else {
                    String::new()
                }
            );
        }
        match seed.extraction.strategy_used {
            Some(kind) => eprintln!("strategy: {}", kind),
            None => eprintln!("strategy: none"),
        }
        for warning in &seed.extraction.warnings {
            eprintln!("  warning: {}", warning);
        }
    }
    eprintln!("run fingerprint: {}", report.fingerprint);
}

/// Handles the --dry-run mode: validates config and seeds
fn handle_dry_run(config: &Config, urls: &[String], options: &RunOptions) -> anyhow::Result<()> {
    println!("=== Module-Scout Dry Run ===\n");

    println!("Limits:");
    println!("  Max depth: {}", options.max_depth);
    println!("  Max pages per seed: {}", options.max_pages);
    println!("  Chars per page: {}", options.chars_per_page);
    println!("  Workers: {}", config.crawler.workers);
    println!(
        "  Per-page timeout: {}s",
        config.crawler.per_page_timeout_seconds
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nStrategies:");
    for (name, remote) in [("openai", &config.inference.openai), ("groq", &config.inference.groq)] {
        let status = if remote.credentials().is_some() {
            "configured"
        } else {
            "no credential, will be skipped"
        };
        println!("  - {} via {} ({})", name, remote.base_url, status);
    }
    println!("  - local (always available)");

    let (seeds, invalid) = normalize_all(urls);
    println!("\nSeeds ({}):", seeds.len());
    for seed in &seeds {
        println!("  - {}", seed);
    }
    if !invalid.is_empty() {
        println!("\nRejected ({}):", invalid.len());
        for rejected in &invalid {
            println!("  - {}", rejected);
        }
    }

    if seeds.is_empty() {
        bail!("no valid seed URLs");
    }
    println!("\n✓ Would crawl {} seeds", seeds.len());
    Ok(())
}
