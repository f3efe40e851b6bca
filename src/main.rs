//! Sponsor-Scout main entry point
//!
//! This is the command-line interface for the Sponsor-Scout lead pipeline.

use anyhow::Context;
use clap::{Parser, Subcommand};
use sponsor_scout::config::{load_config, validate, validate_server, Config};
use sponsor_scout::output::print_run_summary;
use sponsor_scout::pipeline::RetryPolicy;
use sponsor_scout::server::{self, AppState};
use sponsor_scout::Orchestrator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Sponsor-Scout: conference sponsorship lead finder
///
/// Sponsor-Scout searches the web for companies in the configured segments,
/// classifies them as HR or Northeast B2B leads, researches contacts and
/// sponsorship motivation, and writes the reviewed leads to a CSV file.
#[derive(Parser, Debug)]
#[command(name = "sponsor-scout")]
#[command(version = "1.0.0")]
#[command(about = "Finds and researches conference sponsorship leads", long_about = None)]
struct Cli {
    /// Path to TOML campaign file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only run the named segment (repeatable)
    #[arg(short, long, value_name = "NAME")]
    segment: Vec<String>,

    /// Extract from this single page instead of searching
    #[arg(long, value_name = "URL")]
    test_url: Option<String>,

    /// CSV output path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Validate config and show the run plan without calling any service
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP trigger instead of running once
    Serve {
        /// Listen address, e.g. 0.0.0.0:8080
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env file is fine; the process environment still applies
    let dotenv_path = dotenvy::dotenv().ok();

    let mut config = load_config(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration from environment".to_string(),
    })?;

    setup_logging(cli.verbose, cli.quiet, &config.logging.level);
    if let Some(path) = dotenv_path {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    apply_cli_overrides(&mut config, &cli)?;
    validate(&config).context("Invalid configuration")?;
    tracing::info!("Configuration loaded successfully");

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    match cli.command {
        Some(Command::Serve { bind }) => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            validate_server(&config).context("Invalid server configuration")?;
            handle_serve(config).await
        }
        None => handle_run(config).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// CLI flags win; without them the configured LOG_LEVEL picks the crate level.
fn setup_logging(verbose: u8, quiet: bool, configured_level: &str) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new(format!(
                "sponsor_scout={},warn",
                crate_level(configured_level)
            )),
            1 => EnvFilter::new("sponsor_scout=debug,info"),
            2 => EnvFilter::new("sponsor_scout=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Maps LOG_LEVEL values onto tracing levels
fn crate_level(level: &str) -> &'static str {
    match level.trim().to_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "WARN" | "WARNING" => "warn",
        "ERROR" | "CRITICAL" => "error",
        _ => "info",
    }
}

fn apply_cli_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if let Some(url) = &cli.test_url {
        config.pipeline.test_url = Some(url.clone());
    }

    if let Some(output) = &cli.output {
        config.output.path = output.display().to_string();
    }

    config
        .retain_segments(&cli.segment)
        .context("Invalid --segment selection")?;
    Ok(())
}

/// Handles the --dry-run mode: validates config and shows the run plan
fn handle_dry_run(config: &Config) {
    println!("=== Sponsor-Scout Dry Run ===\n");

    println!("Reasoning Provider:");
    println!("  Provider: {}", config.provider.name);
    match config.provider.resolved_model() {
        Ok(model) => println!("  Model: {}", model),
        Err(e) => println!("  Model: unresolved ({})", e),
    }
    println!("  Temperature: {}", config.provider.temperature);
    println!(
        "  Request timeout: {}s",
        config.provider.request_timeout_secs
    );

    println!("\nPipeline:");
    println!("  Max source pages: {}", config.search.max_urls);
    println!("  Results per query: {}", config.search.results_per_query);
    println!("  Max candidates: {}", config.pipeline.max_candidates);
    println!(
        "  Scrape timeout: {}s",
        config.pipeline.scrape_timeout_secs
    );

    let retry = RetryPolicy::from_settings(&config.retry, config.provider.request_timeout());
    println!("\nRetry Policy:");
    println!("  Max attempts: {}", retry.max_attempts());
    for attempt in 1..retry.max_attempts() {
        println!(
            "  Delay before retry {}: {:?}",
            attempt,
            retry.delay_before_retry(attempt)
        );
    }

    println!("\nOutput:");
    println!("  CSV: {}", config.output.path);

    println!("\nHTTP Trigger (serve):");
    println!("  Bind: {}", config.server.bind);
    println!(
        "  Shared key: {}",
        if config.server.api_key.is_some() { "set" } else { "missing" }
    );

    if let Some(url) = &config.pipeline.test_url {
        println!("\nSingle-URL mode:");
        println!("  Source: {}", url);
    } else {
        println!("\nSegments ({}):", config.segments.len());
        for segment in &config.segments {
            println!(
                "  - {} ({}, {} queries)",
                segment.name,
                segment.category,
                segment.queries.len()
            );
            for query in &segment.queries {
                println!("    * {}", query);
            }
        }
    }

    println!("\nExcluded Domains ({}):", config.filter.exclude_domains.len());
    for pattern in &config.filter.exclude_domains {
        println!("  - {}", pattern);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles a full pipeline run
async fn handle_run(config: Config) -> anyhow::Result<()> {
    let config = Arc::new(config);
    tracing::info!(
        "Segments: {}, candidate cap: {}, output: {}",
        config.segments.len(),
        config.pipeline.max_candidates,
        config.output.path
    );

    let mut orchestrator =
        Orchestrator::from_config(config.clone()).context("Failed to set up pipeline services")?;

    let report = orchestrator.run().await.context("Run failed")?;
    tracing::info!(
        "Run completed: {} lead(s), {} skip(s), {} failure(s)",
        report.leads.len(),
        report.skips.len(),
        report.failures.len()
    );

    print_run_summary(&report, &config.output.path);
    Ok(())
}

/// Serves the HTTP trigger until shutdown
async fn handle_serve(config: Config) -> anyhow::Result<()> {
    let bind = config.server.bind.clone();
    let state = AppState::from_config(Arc::new(config)).context("Failed to set up server")?;

    server::serve(Arc::new(state), &bind)
        .await
        .with_context(|| format!("Server on {} failed", bind))
}
