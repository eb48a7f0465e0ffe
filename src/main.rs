//! Latency API - per-region telemetry aggregation service
//!
//! Loads a static latency/uptime snapshot once at startup and serves
//! per-region statistics (mean, p95, threshold breaches) over HTTP.
//!
//! Exit codes:
//!   0 - Clean shutdown (or successful --dry-run / --init-config)
//!   1 - Startup error (config, dataset, bind failure)

mod analysis;
mod cli;
mod config;
mod dataset;
mod models;
mod server;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use dataset::Dataset;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("Latency API v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Startup failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .latency-api.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize the listen address, dataset path, and CORS policy.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` takes precedence over `-v`/`-q` when set.
fn init_logging(args: &Args) {
    let level = args.log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load config and dataset, then serve (or print the dataset summary for --dry-run).
async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    if config.general.verbose {
        debug!("Effective config: {:?}", config);
    }

    let dataset = Dataset::load(&config.data.path).context("Telemetry dataset is required")?;
    if dataset.is_empty() {
        warn!("Dataset {} contains no samples", config.data.path.display());
    }

    if args.dry_run {
        handle_dry_run(&config, &dataset);
        return Ok(());
    }

    server::serve(&config, dataset).await
}

/// Handle --dry-run: print what would be served and exit.
fn handle_dry_run(config: &Config, dataset: &Dataset) {
    println!("\n🔍 Dry run: dataset {}\n", config.data.path.display());

    let regions = dataset.regions();
    if regions.is_empty() {
        println!("   No samples found.");
    } else {
        println!("   {} samples across {} regions:\n", dataset.len(), regions.len());
        for (region, count) in &regions {
            println!("     📍 {} ({} samples)", region, count);
        }
    }

    println!(
        "\n   Would listen on {}:{} with {:?} CORS",
        config.server.host, config.server.port, config.cors.mode
    );
    println!("\n✅ Dry run complete. Server not started.");
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
