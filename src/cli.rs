//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::CorsMode;
use clap::Parser;
use std::path::PathBuf;

/// Latency API - per-region latency and uptime aggregation over HTTP
///
/// Loads a static telemetry snapshot at startup and serves mean, p95 and
/// threshold breach counts per region on POST /api/latency.
///
/// Examples:
///   latency-api
///   latency-api --data ./q-vercel-latency.json --port 8080
///   latency-api --cors credentialed --allow-origin https://app.example.com
///   latency-api --dry-run
///   latency-api --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .latency-api.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Telemetry dataset (JSON array of {region, latency_ms, uptime_pct})
    #[arg(short, long, value_name = "FILE", env = "LATENCY_API_DATA")]
    pub data: Option<PathBuf>,

    /// Address to bind
    #[arg(long, value_name = "ADDR", env = "LATENCY_API_HOST")]
    pub host: Option<String>,

    /// Port to bind
    #[arg(short, long, value_name = "PORT", env = "LATENCY_API_PORT")]
    pub port: Option<u16>,

    /// CORS policy
    #[arg(long, value_name = "MODE")]
    pub cors: Option<CorsMode>,

    /// Origins allowed in credentialed CORS mode (comma-separated)
    ///
    /// Example: --allow-origin https://a.example.com,https://b.example.com
    #[arg(long, value_name = "ORIGINS", value_delimiter = ',')]
    pub allow_origin: Option<Vec<String>>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Load the configuration and dataset, print a region summary, and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .latency-api.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.port == Some(0) {
            return Err("Port must be between 1 and 65535".to_string());
        }

        if let Some(ref data) = self.data {
            if data.is_dir() {
                return Err(format!("Dataset path is a directory: {}", data.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            config: None,
            data: None,
            host: None,
            port: None,
            cors: None,
            allow_origin: None,
            verbose: false,
            quiet: false,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "latency-api",
            "--port",
            "8080",
            "--cors",
            "credentialed",
            "--allow-origin",
            "https://a.example.com,https://b.example.com",
        ])
        .unwrap();

        assert_eq!(args.port, Some(8080));
        assert_eq!(args.cors, Some(CorsMode::Credentialed));
        assert_eq!(
            args.allow_origin,
            Some(vec![
                "https://a.example.com".to_string(),
                "https://b.example.com".to_string()
            ])
        );
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_port() {
        let mut args = make_args();
        args.port = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
